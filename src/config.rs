//! # Notifier configuration.
//!
//! Provides [`Config`], the settings an [`EventNotifier`](crate::EventNotifier) is
//! created with.
//!
//! ## Sentinel values
//! - `recurrent_capacity = 0` → unlimited recurrent queue

/// Configuration of an event notifier.
///
/// ## Field semantics
/// - `recurrent_capacity`: maximum number of recurrent events queued during one
///   dispatch cycle (`0` = unlimited). Events sent while the queue is full are
///   dropped with a warning.
///
/// ## Notes
/// Prefer the helper accessors over checking the `0` sentinel directly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Capacity of the recurrent event queue.
    ///
    /// A receiver that keeps re-sending from inside its own `receive` would otherwise
    /// spin the dispatch loop forever; a bound turns that into dropped events.
    pub recurrent_capacity: usize,
}

impl Config {
    /// Returns the recurrent queue bound as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` queued recurrent events
    #[inline]
    pub fn recurrent_limit(&self) -> Option<usize> {
        if self.recurrent_capacity == 0 {
            None
        } else {
            Some(self.recurrent_capacity)
        }
    }
}
