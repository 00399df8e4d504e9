//! Resolution bookkeeping shared by the ordered and unordered resolvers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures::future::{self, Either};
use futures::pin_mut;

use crate::receivers::EventReceiver;
use crate::resolve::Resolvable;
use crate::senders::OnEvent;
use crate::supply::{Reason, Supply};

/// Callback receiving `(arrival index, value)` pairs in completion order.
pub(crate) type Resolved<E> = Rc<dyn Fn(usize, E)>;

struct Progress {
    received: Cell<usize>,
    in_process: Cell<usize>,
    /// Upstream cutoff waiting for outstanding values.
    upstream_off: RefCell<Option<Reason>>,
}

impl Progress {
    /// Cuts `downstream` off if the upstream is gone and nothing is outstanding.
    fn settle(&self, downstream: &Supply) {
        if self.in_process.get() > 0 {
            return;
        }
        let reason = self.upstream_off.borrow_mut().take();
        if let Some(reason) = reason {
            downstream.off(reason);
        }
    }
}

/// Registers with `source` on behalf of `downstream`.
///
/// Ready values are reported synchronously. Pending ones are spawned on the current
/// `LocalSet`; a rejection cuts `downstream` off with its error. An upstream cutoff
/// reaches `downstream` only once every pending value has settled.
pub(crate) fn resolve_each<E: Clone + 'static>(
    source: &OnEvent<Resolvable<E>>,
    downstream: &Supply,
    resolved: Resolved<E>,
) {
    let progress = Rc::new(Progress {
        received: Cell::new(0),
        in_process: Cell::new(0),
        upstream_off: RefCell::new(None),
    });
    let cancelled = downstream.to_cancellation_token();

    let upstream = Supply::new();
    upstream.needs(downstream);
    {
        let progress = Rc::clone(&progress);
        let downstream = downstream.clone();
        upstream.when_off(move |reason| {
            progress.upstream_off.replace(Some(reason.clone()));
            progress.settle(&downstream);
        });
    }

    let downstream = downstream.clone();
    source.on(EventReceiver::new(upstream, move |_, item: Resolvable<E>| {
        let index = progress.received.get() + 1;
        progress.received.set(index);

        let pending = match item {
            Resolvable::Ready(value) => return resolved(index, value),
            Resolvable::Pending(pending) => pending,
        };

        let task = Rc::clone(&progress);
        let resolved = Rc::clone(&resolved);
        let downstream = downstream.clone();
        let cancelled = cancelled.clone();
        let resolving = async move {
            let progress = task;
            let outcome = {
                let cancel = cancelled.cancelled();
                pin_mut!(cancel);
                match future::select(pending, cancel).await {
                    Either::Left((result, _)) => Some(result),
                    Either::Right(_) => None,
                }
            };
            progress.in_process.set(progress.in_process.get() - 1);

            match outcome {
                Some(Ok(value)) => resolved(index, value),
                Some(Err(err)) => {
                    tracing::warn!(index, label = err.as_label(), error = %err, "pending value rejected; cutting off");
                    downstream.off(Reason::Failed(err));
                }
                None => {
                    tracing::trace!(index, "pending value abandoned after cutoff");
                }
            }
            progress.settle(&downstream);
        };
        // Counted only once spawned: a failed spawn must not hold the downstream open.
        tokio::task::spawn_local(resolving);
        progress.in_process.set(progress.in_process.get() + 1);
    }));
}

/// Reorders `(index, value)` pairs into contiguous batches.
#[derive(Debug)]
pub(crate) struct Reorder<E> {
    sent: usize,
    received: VecDeque<Option<E>>,
}

impl<E> Default for Reorder<E> {
    fn default() -> Self {
        Self {
            sent: 0,
            received: VecDeque::new(),
        }
    }
}

impl<E> Reorder<E> {
    /// Stores the value with 1-based arrival `index` and returns the values now
    /// ready to go out, in arrival order.
    pub(crate) fn push(&mut self, index: usize, value: E) -> Vec<E> {
        let offset = index - self.sent - 1;
        if self.received.len() <= offset {
            self.received.resize_with(offset + 1, || None);
        }
        self.received[offset] = Some(value);

        let mut batch = Vec::new();
        while let Some(Some(_)) = self.received.front() {
            if let Some(Some(value)) = self.received.pop_front() {
                batch.push(value);
            }
        }
        self.sent += batch.len();
        batch
    }
}
