//! Shared upstream subscription with replay of the first registration window.
//!
//! ## State machine
//! ```text
//!   Init ──first receiver──► First ──first registration returns──► Next
//!    ▲                        │ record every event                 │ first live event
//!    │                        │ into `initial`                     │ clears `initial`
//!    └──── receiver count hits 0, or upstream cut off ◄────────────┘
//! ```
//!
//! Each pass through `Init` starts a new generation with a fresh notifier and a fresh
//! upstream supply. Callbacks from an older generation are ignored.

use std::cell::RefCell;
use std::rc::Rc;

use crate::events::EventNotifier;
use crate::receivers::EventReceiver;
use crate::senders::OnEvent;
use crate::supply::{Reason, Supply};

/// Sharing state.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ShareState<E> {
    /// No upstream subscription.
    Init,
    /// Upstream registration in progress; every event is recorded.
    First { initial: Vec<E> },
    /// Upstream active; `initial` is replayed to late receivers until the next event.
    Next { initial: Vec<E> },
}

struct Inner<E> {
    state: ShareState<E>,
    notifier: EventNotifier<E>,
    upstream: Option<Supply>,
    generation: u64,
}

pub(crate) struct Dispatcher<E> {
    source: OnEvent<E>,
    inner: RefCell<Inner<E>>,
}

impl<E: Clone + 'static> Dispatcher<E> {
    pub(crate) fn new(source: OnEvent<E>) -> Rc<Self> {
        Rc::new(Self {
            source,
            inner: RefCell::new(Inner {
                state: ShareState::Init,
                notifier: EventNotifier::new(),
                upstream: None,
                generation: 0,
            }),
        })
    }

    /// Registers a downstream receiver.
    pub(crate) fn register(self: &Rc<Self>, receiver: EventReceiver<E>) {
        let supply = receiver.supply().clone();
        let (generation, notifier, replay) = {
            let inner = self.inner.borrow();
            let replay = match &inner.state {
                ShareState::Init => None,
                ShareState::First { initial } | ShareState::Next { initial } => {
                    Some(initial.clone())
                }
            };
            (inner.generation, inner.notifier.clone(), replay)
        };

        match replay {
            Some(initial) => {
                notifier.on_replaying(receiver, initial);
                self.watch(&supply, generation);
            }
            None => self.subscribe(receiver),
        }
    }

    fn subscribe(self: &Rc<Self>, receiver: EventReceiver<E>) {
        let supply = receiver.supply().clone();
        let notifier = EventNotifier::new();
        let upstream = Supply::new();
        let generation = {
            let mut inner = self.inner.borrow_mut();
            inner.state = ShareState::First {
                initial: Vec::new(),
            };
            inner.notifier = notifier.clone();
            inner.upstream = Some(upstream.clone());
            inner.generation
        };

        notifier.on(receiver);
        self.watch(&supply, generation);
        if supply.is_off() {
            return;
        }

        let this = Rc::clone(self);
        upstream.when_off(move |reason| this.upstream_off(generation, reason));

        tracing::debug!(generation, "shared sender subscribing upstream");
        let this = Rc::clone(self);
        self.source.on(EventReceiver::new(upstream, move |_, event: E| {
            this.forward(generation, event);
        }));

        let mut inner = self.inner.borrow_mut();
        if inner.generation == generation {
            if let ShareState::First { initial } = &mut inner.state {
                let initial = std::mem::take(initial);
                inner.state = ShareState::Next { initial };
            }
        }
    }

    fn forward(&self, generation: u64, event: E) {
        let notifier = {
            let mut inner = self.inner.borrow_mut();
            if inner.generation != generation {
                return;
            }
            match &mut inner.state {
                ShareState::Init => return,
                ShareState::First { initial } => initial.push(event.clone()),
                ShareState::Next { initial } => initial.clear(),
            }
            inner.notifier.clone()
        };
        notifier.send(event);
    }

    /// Resets once the last receiver of `generation` is cut off.
    fn watch(self: &Rc<Self>, supply: &Supply, generation: u64) {
        let this = Rc::clone(self);
        supply.when_off(move |_| {
            let upstream = {
                let mut inner = this.inner.borrow_mut();
                if inner.generation != generation || inner.notifier.size() > 0 {
                    return;
                }
                reset(&mut inner)
            };
            tracing::debug!(generation, "last shared receiver gone; cutting upstream off");
            if let Some(upstream) = upstream {
                upstream.done();
            }
        });
    }

    fn upstream_off(&self, generation: u64, reason: &Reason) {
        let notifier = {
            let mut inner = self.inner.borrow_mut();
            if inner.generation != generation {
                return;
            }
            reset(&mut inner);
            inner.notifier.clone()
        };
        notifier.supply().off(reason.clone());
    }

    #[cfg(test)]
    pub(crate) fn is_init(&self) -> bool {
        matches!(self.inner.borrow().state, ShareState::Init)
    }
}

/// Moves to the next generation. Returns the old upstream supply.
///
/// The old notifier stays in place until the next subscription replaces it, so its
/// remaining receivers can still be cut off through it.
fn reset<E>(inner: &mut Inner<E>) -> Option<Supply> {
    inner.state = ShareState::Init;
    inner.generation += 1;
    inner.upstream.take()
}
