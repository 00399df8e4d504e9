//! # Normalized event receivers.
//!
//! Registration calls accept anything implementing [`IntoEventReceiver`]: either a
//! ready [`EventReceiver`] (own supply + context-aware `receive`), or a bare closure
//! `Fn(E)` which gets a fresh [`Supply`].
//!
//! ## Rules
//! - A receiver owns exactly one supply.
//! - Once the supply is off, `receive` is a no-op for good, even when a `when_off`
//!   callback re-enters it synchronously.
//! - Panics inside `receive` are caught by the caller (see [`guard`]) and turned into
//!   a cutoff of the receiver's supply; sibling receivers keep receiving.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::EventError;
use crate::receivers::EventContext;
use crate::supply::{Reason, Supply};

type ReceiveFn<E> = Rc<dyn Fn(&mut EventContext<'_, E>, E)>;

/// Event receiver with its own supply.
pub struct EventReceiver<E> {
    supply: Supply,
    receive: ReceiveFn<E>,
}

impl<E> Clone for EventReceiver<E> {
    fn clone(&self) -> Self {
        Self {
            supply: self.supply.clone(),
            receive: Rc::clone(&self.receive),
        }
    }
}

impl<E: 'static> EventReceiver<E> {
    /// Creates a receiver bound to the given supply.
    ///
    /// ## Example
    /// ```rust
    /// use eventide::{EventNotifier, EventReceiver, Supply};
    ///
    /// let notifier = EventNotifier::<u32>::new();
    /// let supply = Supply::new();
    /// notifier.on(EventReceiver::new(supply.clone(), |_ctx, n: u32| println!("got {n}")));
    ///
    /// notifier.send(1);
    /// supply.done(); // no more deliveries
    /// notifier.send(2);
    /// ```
    pub fn new(supply: Supply, receive: impl Fn(&mut EventContext<'_, E>, E) + 'static) -> Self {
        Self {
            supply,
            receive: Rc::new(receive),
        }
    }

    /// Creates a receiver from a plain function, with a fresh supply.
    pub fn from_fn(receive: impl Fn(E) + 'static) -> Self {
        Self::new(Supply::new(), move |_, event| receive(event))
    }

    /// The supply this receiver is bound to.
    #[inline]
    pub fn supply(&self) -> &Supply {
        &self.supply
    }

    /// Delivers an event, unless the supply is off.
    pub fn receive(&self, context: &mut EventContext<'_, E>, event: E) {
        if self.supply.is_off() {
            return;
        }
        (self.receive)(context, event);
    }

    /// Delivers an event from outside any dispatch.
    ///
    /// The entry point for register functions wrapping their own event origin. A
    /// panic inside `receive` cuts this receiver off; recurrent redirects requested
    /// during the call are ignored.
    ///
    /// ## Example
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use eventide::{EventReceiver, OnEvent};
    ///
    /// let ticks = OnEvent::by(|receiver: EventReceiver<u32>| {
    ///     for tick in 0..3 {
    ///         receiver.send(tick);
    ///     }
    ///     receiver.supply().done();
    /// });
    ///
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    /// let sink = Rc::clone(&seen);
    /// let supply = ticks.on(move |n: u32| sink.borrow_mut().push(n));
    /// assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    /// assert!(supply.is_off());
    /// ```
    pub fn send(&self, event: E) {
        if self.supply.is_off() {
            return;
        }
        EventContext::detached(|ctx| self.deliver(ctx, event));
    }

    /// Delivers an event, converting a panic into a cutoff of this receiver.
    pub(crate) fn deliver(&self, context: &mut EventContext<'_, E>, event: E) {
        guard(&self.supply, || self.receive(context, event));
    }
}

/// Conversion into an [`EventReceiver`].
///
/// Implemented for receivers themselves and for closures `Fn(E)`.
pub trait IntoEventReceiver<E> {
    /// Performs the conversion.
    fn into_event_receiver(self) -> EventReceiver<E>;
}

impl<E> IntoEventReceiver<E> for EventReceiver<E> {
    #[inline]
    fn into_event_receiver(self) -> EventReceiver<E> {
        self
    }
}

impl<E: 'static, F> IntoEventReceiver<E> for F
where
    F: Fn(E) + 'static,
{
    fn into_event_receiver(self) -> EventReceiver<E> {
        EventReceiver::from_fn(self)
    }
}

/// Runs `f`, cutting `supply` off if it panics.
pub(crate) fn guard(supply: &Supply, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let err = EventError::receiver_panicked(payload);
        tracing::warn!(label = err.as_label(), error = %err, "receiver panicked; cutting off its supply");
        supply.off(Reason::Failed(err));
    }
}

/// Runs a register function, cutting `supply` off if it panics.
pub(crate) fn guard_register(supply: &Supply, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let err = EventError::register_panicked(payload);
        tracing::warn!(label = err.as_label(), error = %err, "register function panicked; cutting off receiver");
        supply.off(Reason::Failed(err));
    }
}
