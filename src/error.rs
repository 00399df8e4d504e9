//! Error types used by supplies, senders and keepers.
//!
//! Failures inside the core never cross component boundaries as panics or
//! `Result`s. They are converted into a supply cutoff whose [`Reason`](crate::Reason)
//! carries an [`EventError`]:
//!
//! - a panic inside a register function → [`EventError::RegisterPanicked`];
//! - a panic inside a receiver, recurrent handler or chain pass → [`EventError::ReceiverPanicked`];
//! - a keeper with nothing to replay and no fallback → [`EventError::NoEvents`];
//! - a rejected pending value during async resolution → [`EventError::Rejected`];
//! - anything the caller cuts off with on purpose → [`EventError::Failure`].
//!
//! Like the reasons themselves, errors are cheap to clone: every dependent supply
//! observes its own copy.

use std::any::Any;

use thiserror::Error;

/// # Errors a supply can be cut off with.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// A keeper has no cached event and no fallback to compute one.
    #[error("no events to send")]
    NoEvents,

    /// A register function panicked while registering a receiver.
    #[error("register function panicked: {info}")]
    RegisterPanicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// A receiver panicked while handling an event.
    #[error("receiver panicked: {info}")]
    ReceiverPanicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// A pending value failed to resolve.
    #[error("pending value rejected: {error}")]
    Rejected {
        /// The underlying rejection message.
        error: String,
    },

    /// Cut off by the caller with a custom failure.
    #[error("failed: {error}")]
    Failure {
        /// The failure message.
        error: String,
    },
}

impl EventError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventide::EventError;
    ///
    /// assert_eq!(EventError::NoEvents.as_label(), "no_events");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::NoEvents => "no_events",
            EventError::RegisterPanicked { .. } => "register_panicked",
            EventError::ReceiverPanicked { .. } => "receiver_panicked",
            EventError::Rejected { .. } => "rejected",
            EventError::Failure { .. } => "failure",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EventError::NoEvents => "no events to send".to_string(),
            EventError::RegisterPanicked { info } => format!("register panic: {info}"),
            EventError::ReceiverPanicked { info } => format!("receiver panic: {info}"),
            EventError::Rejected { error } => format!("rejected: {error}"),
            EventError::Failure { error } => format!("error: {error}"),
        }
    }

    /// Creates a rejection error from anything printable.
    pub fn rejected(error: impl ToString) -> Self {
        EventError::Rejected {
            error: error.to_string(),
        }
    }

    pub(crate) fn register_panicked(payload: Box<dyn Any + Send>) -> Self {
        EventError::RegisterPanicked {
            info: panic_info(payload),
        }
    }

    pub(crate) fn receiver_panicked(payload: Box<dyn Any + Send>) -> Self {
        EventError::ReceiverPanicked {
            info: panic_info(payload),
        }
    }
}

/// Renders a panic payload the way the default hook does.
fn panic_info(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(EventError::NoEvents.as_label(), "no_events");
        assert_eq!(
            EventError::Failure { error: "x".into() }.as_label(),
            "failure"
        );
        assert_eq!(EventError::rejected("nope").as_label(), "rejected");
    }

    #[test]
    fn test_panic_payloads_are_rendered() {
        let err = EventError::receiver_panicked(Box::new("boom"));
        assert_eq!(err.as_message(), "receiver panic: boom");

        let err = EventError::register_panicked(Box::new(String::from("bang")));
        assert_eq!(err.to_string(), "register function panicked: bang");

        let err = EventError::receiver_panicked(Box::new(42_u8));
        assert_eq!(
            err,
            EventError::ReceiverPanicked {
                info: "unknown panic payload".into()
            }
        );
    }
}
