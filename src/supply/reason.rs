//! # Cutoff reasons.
//!
//! A [`Reason`] is what every `when_off` callback observes once a supply is cut off.
//! [`Reason::Done`] conventionally means "completed normally"; [`Reason::Failed`]
//! carries the [`EventError`] that terminated the supply.

use std::fmt;

use crate::error::EventError;

/// Why a supply was cut off.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Reason {
    /// Completed normally.
    #[default]
    Done,
    /// Terminated abnormally.
    Failed(EventError),
}

impl Reason {
    /// Shorthand for a custom [`EventError::Failure`].
    ///
    /// # Example
    /// ```
    /// use eventide::{EventError, Reason};
    ///
    /// let reason = Reason::failed("disconnected");
    /// assert_eq!(reason.error(), Some(&EventError::Failure { error: "disconnected".into() }));
    /// ```
    pub fn failed(error: impl ToString) -> Self {
        Reason::Failed(EventError::Failure {
            error: error.to_string(),
        })
    }

    /// True for a normal completion.
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Reason::Done)
    }

    /// The failure, if any.
    #[inline]
    pub fn error(&self) -> Option<&EventError> {
        match self {
            Reason::Done => None,
            Reason::Failed(err) => Some(err),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Reason::Done => "done",
            Reason::Failed(err) => err.as_label(),
        }
    }
}

impl From<EventError> for Reason {
    fn from(err: EventError) -> Self {
        Reason::Failed(err)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Done => f.write_str("done"),
            Reason::Failed(err) => write!(f, "{err}"),
        }
    }
}
