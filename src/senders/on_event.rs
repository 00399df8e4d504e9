//! # `OnEvent`: event sender.
//!
//! [`OnEvent`] wraps a register function: registering a receiver normalizes it,
//! hands it to the register function and returns the receiver's supply. Events are
//! delivered from the moment of registration onward.
//!
//! ## Rules
//! - A receiver whose supply is already off is never passed to the register function.
//! - A panic inside the register function cuts the receiver off
//!   ([`EventError::RegisterPanicked`]); it never reaches the caller.
//! - Processors (`OnEvent<E> -> OnEvent<F>` or `-> AfterEvent<F>`) compose with
//!   [`OnEvent::pipe`].

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use tokio::sync::oneshot;

use crate::error::EventError;
use crate::receivers::{guard_register, EventReceiver, IntoEventReceiver};
use crate::senders::EventSender;
use crate::supply::{Reason, Supply};

type RegisterFn<E> = Rc<dyn Fn(EventReceiver<E>)>;

/// Event sender.
///
/// Cheap to clone: clones share the register function.
///
/// ## Example
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use eventide::{EventNotifier, EventSender};
///
/// let notifier = EventNotifier::<u32>::new();
/// let on_event = notifier.on_event();
///
/// let total = Rc::new(Cell::new(0));
/// let sum = Rc::clone(&total);
/// on_event.on(move |n: u32| sum.set(sum.get() + n));
///
/// notifier.send(2);
/// notifier.send(3);
/// assert_eq!(total.get(), 5);
/// ```
pub struct OnEvent<E> {
    register: RegisterFn<E>,
}

impl<E> Clone for OnEvent<E> {
    fn clone(&self) -> Self {
        Self {
            register: Rc::clone(&self.register),
        }
    }
}

impl<E: Clone + 'static> OnEvent<E> {
    /// Creates a sender from a register function.
    ///
    /// The register function receives normalized receivers. It may keep them and call
    /// `receive` later, and should stop doing so once their supply is off.
    pub fn by(register: impl Fn(EventReceiver<E>) + 'static) -> Self {
        Self {
            register: Rc::new(register),
        }
    }

    /// A sender that cuts every receiver off right away.
    pub fn never() -> Self {
        Self::by(|receiver| {
            receiver.supply().done();
        })
    }

    /// Registers a receiver and returns its supply.
    pub fn on(&self, receiver: impl IntoEventReceiver<E>) -> Supply {
        let receiver = receiver.into_event_receiver();
        let supply = receiver.supply().clone();
        if !supply.is_off() {
            guard_register(&supply, || (self.register)(receiver));
        }
        supply
    }

    /// Applies a processor to this sender.
    pub fn pipe<R>(&self, processor: impl FnOnce(OnEvent<E>) -> R) -> R {
        processor(self.clone())
    }

    /// A sender delivering only the first event to each receiver, then cutting it off
    /// with [`Reason::Done`].
    pub fn once(&self) -> OnEvent<E> {
        let source = self.clone();
        OnEvent::by(move |receiver: EventReceiver<E>| {
            let target = receiver.clone();
            source.on(EventReceiver::new(
                receiver.supply().clone(),
                move |ctx, event| {
                    target.receive(ctx, event);
                    target.supply().done();
                },
            ));
        })
    }

    /// Resolves with the next event.
    ///
    /// Fails with the cutoff error if the sender cuts the receiver off first, or with
    /// [`EventError::NoEvents`] if it completes without sending anything.
    pub fn next_event(&self) -> impl Future<Output = Result<E, EventError>> + 'static {
        let (tx, rx) = oneshot::channel::<Result<E, Reason>>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let supply = Supply::new();
        let on_off = Rc::clone(&tx);
        supply.when_off(move |reason| {
            let tx = on_off.borrow_mut().take();
            if let Some(tx) = tx {
                let _ = tx.send(Err(reason.clone()));
            }
        });

        self.once()
            .on(EventReceiver::new(supply, move |_, event: E| {
                let tx = tx.borrow_mut().take();
                if let Some(tx) = tx {
                    let _ = tx.send(Ok(event));
                }
            }));

        async move {
            match rx.await {
                Ok(Ok(event)) => Ok(event),
                Ok(Err(Reason::Failed(err))) => Err(err),
                Ok(Err(Reason::Done)) | Err(_) => Err(EventError::NoEvents),
            }
        }
    }
}

impl<E: Clone + 'static> EventSender<E> for OnEvent<E> {
    fn on_event(&self) -> OnEvent<E> {
        self.clone()
    }
}

impl<E> fmt::Debug for OnEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnEvent").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventNotifier;

    #[test]
    fn test_register_panic_cuts_receiver() {
        let on_event = OnEvent::<u32>::by(|_| panic!("cannot register"));
        let supply = on_event.on(|_: u32| {});
        assert_eq!(
            supply.reason(),
            Some(Reason::Failed(EventError::RegisterPanicked {
                info: "cannot register".into()
            }))
        );
    }

    #[test]
    fn test_cut_off_receiver_is_not_registered() {
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let on_event = OnEvent::<u32>::by(move |_| *counter.borrow_mut() += 1);

        let supply = Supply::never();
        on_event.on(EventReceiver::new(supply, |_, _: u32| {}));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_never_cuts_off_immediately() {
        let supply = OnEvent::<u32>::never().on(|_: u32| {});
        assert_eq!(supply.reason(), Some(Reason::Done));
    }

    #[test]
    fn test_once_delivers_first_event_only() {
        let notifier = EventNotifier::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let supply = notifier
            .on_event()
            .once()
            .on(move |n: u32| sink.borrow_mut().push(n));
        notifier.send(1);
        notifier.send(2);

        assert_eq!(*seen.borrow(), vec![1]);
        assert!(supply.is_off());
        assert_eq!(notifier.size(), 0);
    }

    #[test]
    fn test_pipe_applies_processor() {
        let notifier = EventNotifier::<u32>::new();
        let once = notifier.on_event().pipe(|on| on.once());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        once.on(move |n: u32| sink.borrow_mut().push(n));
        notifier.send(7);
        notifier.send(8);
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_next_event_resolves() {
        let notifier = EventNotifier::<u32>::new();
        let next = notifier.on_event().next_event();
        notifier.send(42);
        notifier.send(43);
        assert_eq!(next.await, Ok(42));
        assert_eq!(notifier.size(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_next_event_fails_on_cutoff() {
        let notifier = EventNotifier::<u32>::new();
        let next = notifier.on_event().next_event();
        notifier.supply().off(Reason::failed("closed"));
        assert_eq!(
            next.await,
            Err(EventError::Failure {
                error: "closed".into()
            })
        );

        let next = OnEvent::<u32>::never().next_event();
        assert_eq!(next.await, Err(EventError::NoEvents));
    }
}
