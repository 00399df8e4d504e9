//! # Sharing: one upstream subscription for many receivers.
//!
//! [`OnEvent::share`] and [`AfterEvent::share`] wrap a source so that however many
//! receivers register downstream, the source sees at most one registration at a time.
//!
//! ## Rules
//! - The first downstream receiver triggers the upstream registration.
//! - Events the upstream sends while that first registration call runs are recorded
//!   and replayed, in order, to receivers joining later.
//! - The first event sent after that window discards the recording.
//! - When the last downstream receiver is cut off, the upstream subscription is cut
//!   off too and the next receiver starts over.
//! - When the upstream cuts the subscription off, every downstream receiver is cut
//!   off with the same reason.

mod dispatcher;

use crate::senders::{AfterEvent, EventSender, OnEvent};

use dispatcher::Dispatcher;

impl<E: Clone + 'static> OnEvent<E> {
    /// A sender sharing a single registration with this one among all its receivers.
    ///
    /// ## Example
    /// ```rust
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use eventide::{EventNotifier, EventSender};
    ///
    /// let notifier = EventNotifier::<u32>::new();
    /// let shared = notifier.on_event().share();
    ///
    /// let total = Rc::new(Cell::new(0));
    /// for _ in 0..3 {
    ///     let total = Rc::clone(&total);
    ///     shared.on(move |n: u32| total.set(total.get() + n));
    /// }
    /// assert_eq!(notifier.size(), 1);
    ///
    /// notifier.send(1);
    /// assert_eq!(total.get(), 3);
    /// ```
    pub fn share(&self) -> OnEvent<E> {
        let dispatcher = Dispatcher::new(self.clone());
        OnEvent::by(move |receiver| dispatcher.register(receiver))
    }
}

impl<E: Clone + 'static> AfterEvent<E> {
    /// A keeper sharing a single registration with this one among all its receivers.
    pub fn share(&self) -> AfterEvent<E> {
        let dispatcher = Dispatcher::new(self.on_event());
        AfterEvent::by(move |receiver| dispatcher.register(receiver))
    }
}
