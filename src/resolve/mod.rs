//! # Async resolution of senders of pending values.
//!
//! A sender of [`Resolvable`] values carries either ready values or futures of them.
//! Two resolvers turn it into a sender of plain values:
//!
//! - [`OnEvent::resolve`] sends every value as soon as it is available;
//! - [`OnEvent::resolve_in_order`] keeps arrival order, sending values that became
//!   available out of order together, as one batch.
//!
//! ```text
//!   arrival:     "1"        pending(2)          "3"          2 resolves
//!   in order:   ["1"]           ·                ·           ["2", "3"]
//!   any order:   "1"            ·               "3"            "2"
//! ```
//!
//! ## Rules
//! - Ready values are sent synchronously, during the upstream delivery.
//! - Pending values are driven with [`tokio::task::spawn_local`]: the sender must be
//!   used from inside a [`tokio::task::LocalSet`].
//! - A rejected value cuts the receiver off with the rejection error; it is never sent.
//! - When the upstream cuts the receiver off, the cutoff is held back until every
//!   pending value has settled.
//! - Cutting the receiver off abandons the values still pending.

mod tracker;

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;

use crate::error::EventError;
use crate::events::EventNotifier;
use crate::receivers::EventReceiver;
use crate::senders::OnEvent;

use tracker::{resolve_each, Reorder};

/// A value, or a future of one.
///
/// Pending futures are shared, so clones handed to different receivers settle together.
#[derive(Clone)]
pub enum Resolvable<E> {
    /// Available right away.
    Ready(E),
    /// Available once the future completes.
    Pending(Shared<LocalBoxFuture<'static, Result<E, EventError>>>),
}

impl<E: Clone + 'static> Resolvable<E> {
    /// Wraps a future.
    pub fn pending(future: impl Future<Output = Result<E, EventError>> + 'static) -> Self {
        Resolvable::Pending(future.boxed_local().shared())
    }
}

impl<E> From<E> for Resolvable<E> {
    fn from(value: E) -> Self {
        Resolvable::Ready(value)
    }
}

impl<E: fmt::Debug> fmt::Debug for Resolvable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Resolvable::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl<E: Clone + 'static> OnEvent<Resolvable<E>> {
    /// A sender of the resolved values, in the order they become available.
    pub fn resolve(&self) -> OnEvent<E> {
        let source = self.clone();
        OnEvent::by(move |receiver: EventReceiver<E>| {
            let notifier = EventNotifier::new();
            let supply = notifier.on(receiver);
            resolve_each(&source, &supply, Rc::new(move |_: usize, value: E| notifier.send(value)));
        })
    }

    /// A sender of the resolved values in arrival order.
    ///
    /// Every delivery is the longest run of values that are available and not yet
    /// sent; a value that resolves early waits for its predecessors.
    pub fn resolve_in_order(&self) -> OnEvent<Vec<E>> {
        let source = self.clone();
        OnEvent::by(move |receiver: EventReceiver<Vec<E>>| {
            let notifier = EventNotifier::new();
            let supply = notifier.on(receiver);
            let reorder = RefCell::new(Reorder::default());
            resolve_each(
                &source,
                &supply,
                Rc::new(move |index: usize, value: E| {
                    let batch = reorder.borrow_mut().push(index, value);
                    if !batch.is_empty() {
                        notifier.send(batch);
                    }
                }),
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::{mpsc, oneshot};
    use tokio::task::LocalSet;

    use super::*;
    use crate::senders::EventSender;
    use crate::supply::Reason;

    fn deferred<T: 'static>() -> (oneshot::Sender<T>, Resolvable<T>)
    where
        T: Clone,
    {
        let (tx, rx) = oneshot::channel();
        let pending = Resolvable::pending(async move { rx.await.map_err(|e| EventError::rejected(e)) });
        (tx, pending)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_in_order_batches_late_values() {
        LocalSet::new()
            .run_until(async {
                let notifier = EventNotifier::<Resolvable<String>>::new();
                let (batches_tx, mut batches) = mpsc::unbounded_channel();
                notifier
                    .on_event()
                    .resolve_in_order()
                    .on(move |batch: Vec<String>| {
                        let _ = batches_tx.send(batch);
                    });

                let (second, pending) = deferred();
                notifier.send("1".to_string().into());
                notifier.send(pending);
                notifier.send("3".to_string().into());

                assert_eq!(batches.recv().await, Some(vec!["1".to_string()]));
                assert!(batches.try_recv().is_err());

                second.send("2".to_string()).unwrap();
                assert_eq!(
                    batches.recv().await,
                    Some(vec!["2".to_string(), "3".to_string()])
                );
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_any_order_sends_when_available() {
        LocalSet::new()
            .run_until(async {
                let notifier = EventNotifier::<Resolvable<u32>>::new();
                let (values_tx, mut values) = mpsc::unbounded_channel();
                notifier.on_event().resolve().on(move |n: u32| {
                    let _ = values_tx.send(n);
                });

                let (first, pending) = deferred();
                notifier.send(pending);
                notifier.send(Resolvable::Ready(2));
                assert_eq!(values.recv().await, Some(2));

                first.send(1).unwrap();
                assert_eq!(values.recv().await, Some(1));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_rejection_cuts_off() {
        LocalSet::new()
            .run_until(async {
                let notifier = EventNotifier::<Resolvable<u32>>::new();
                let supply = notifier.on_event().resolve_in_order().on(|_: Vec<u32>| {});

                let (tx, pending) = deferred::<u32>();
                notifier.send(pending);
                drop(tx);

                let err = supply.when_done().await.unwrap_err();
                assert_eq!(err.as_label(), "rejected");
                assert_eq!(notifier.size(), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_upstream_cutoff_waits_for_pending() {
        LocalSet::new()
            .run_until(async {
                let notifier = EventNotifier::<Resolvable<u32>>::new();
                let (values_tx, mut values) = mpsc::unbounded_channel();
                let supply = notifier.on_event().resolve().on(move |n: u32| {
                    let _ = values_tx.send(n);
                });

                let (tx, pending) = deferred();
                notifier.send(pending);
                notifier.supply().off(Reason::failed("closed"));
                assert!(!supply.is_off());

                tx.send(7).unwrap();
                assert_eq!(values.recv().await, Some(7));
                assert_eq!(supply.reason(), Some(Reason::failed("closed")));
            })
            .await;
    }

    #[test]
    fn test_failed_spawn_still_cuts_off_downstream() {
        // No LocalSet: spawning the pending value panics inside the upstream receiver.
        let notifier = EventNotifier::<Resolvable<u32>>::new();
        let supply = notifier.on_event().resolve().on(|_: u32| {});

        let (_tx, pending) = deferred();
        notifier.send(pending);

        assert_eq!(notifier.size(), 0);
        assert_eq!(supply.reason().map(|r| r.as_label()), Some("receiver_panicked"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_downstream_cutoff_abandons_pending() {
        LocalSet::new()
            .run_until(async {
                let notifier = EventNotifier::<Resolvable<u32>>::new();
                let supply = notifier.on_event().resolve().on(|_: u32| {});

                let (tx, pending) = deferred();
                notifier.send(pending);
                supply.done();
                assert_eq!(notifier.size(), 0);

                tokio::task::yield_now().await;
                assert!(tx.is_closed());
            })
            .await;
    }
}
