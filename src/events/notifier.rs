//! # Event notifier: synchronous fan-out with a recurrence trampoline.
//!
//! [`EventNotifier`] keeps an ordered set of receivers and delivers every sent event
//! to each of them, in registration order.
//!
//! ## Recurrence
//! ```text
//! send(E1) ──► Idle? ──yes──► Busy ──► pass(E1): R(E1), R3(E1)
//!                │                        │ R calls send(E1!) ──► queue [E1!]
//!                no                       │ R calls ctx.on_recurrent(R2)
//!                ▼                        ▼
//!          queue.push(E)         pop E1! ──► pass(E1!): R2(E1!), R3(E1!)
//!                                         │
//!                                queue empty ──► Idle
//! ```
//!
//! ## Rules
//! - A `send` issued while a dispatch cycle is running is queued, not nested: the
//!   call stack never grows with chains of synchronously triggered events.
//! - Queued events are delivered breadth-first, each to every receiver, after the
//!   current pass completes.
//! - Within a cycle, a receiver that called [`EventContext::on_recurrent`] has its
//!   recurrent events delivered to that handler instead of `receive`.
//! - A panicking receiver is cut off; its siblings keep receiving.
//! - Receivers leave the set as soon as their supply is cut off. Cutting the
//!   notifier's own supply cuts every receiver off with the same reason.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::config::Config;
use crate::receivers::{guard, EventContext, EventReceiver, IntoEventReceiver, RecurrentFn};
use crate::supply::Supply;

/// Registered receiver with its per-cycle recurrent handler.
struct Slot<E> {
    id: u64,
    receiver: EventReceiver<E>,
    recurrent: RefCell<Option<RecurrentFn<E>>>,
}

/// Dispatch state machine.
enum Dispatch<E> {
    /// No delivery in progress; `send` dispatches right away.
    Idle,
    /// A cycle is running; `send` queues.
    Busy { queue: VecDeque<E> },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pass {
    Initial,
    Recurrent,
}

struct State<E> {
    slots: Vec<Rc<Slot<E>>>,
    next_id: u64,
    dispatch: Dispatch<E>,
}

struct Shared<E> {
    supply: Supply,
    config: Config,
    state: RefCell<State<E>>,
}

/// Sends events to registered receivers.
///
/// Cheap to clone: clones share the receiver set.
///
/// ## Example
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use eventide::EventNotifier;
///
/// let notifier = EventNotifier::<&'static str>::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let sink = Rc::clone(&seen);
/// let supply = notifier.on(move |e: &'static str| sink.borrow_mut().push(e));
///
/// notifier.send("a");
/// supply.done();
/// notifier.send("b");
///
/// assert_eq!(*seen.borrow(), vec!["a"]);
/// assert_eq!(notifier.size(), 0);
/// ```
pub struct EventNotifier<E> {
    shared: Rc<Shared<E>>,
}

impl<E> Clone for EventNotifier<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<E: Clone + 'static> Default for EventNotifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + 'static> EventNotifier<E> {
    /// Creates a notifier with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a notifier with the given configuration.
    pub fn with_config(config: Config) -> Self {
        let shared = Rc::new(Shared {
            supply: Supply::new(),
            config,
            state: RefCell::new(State {
                slots: Vec::new(),
                next_id: 0,
                dispatch: Dispatch::Idle,
            }),
        });

        let weak = Rc::downgrade(&shared);
        shared.supply.when_off(move |reason| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let slots = std::mem::take(&mut shared.state.borrow_mut().slots);
            tracing::debug!(receivers = slots.len(), reason = %reason, "notifier cut off");
            for slot in slots {
                slot.receiver.supply().off(reason.clone());
            }
        });

        Self { shared }
    }

    /// The notifier's own supply.
    ///
    /// Cutting it off cuts off every registered receiver, and every receiver
    /// registered afterwards.
    #[inline]
    pub fn supply(&self) -> &Supply {
        &self.shared.supply
    }

    /// Number of registered receivers.
    pub fn size(&self) -> usize {
        self.shared.state.borrow().slots.len()
    }

    /// Registers a receiver and returns its supply.
    pub fn on(&self, receiver: impl IntoEventReceiver<E>) -> Supply {
        let receiver = receiver.into_event_receiver();
        let supply = receiver.supply().clone();
        self.add(receiver);
        supply
    }

    /// Sends an event to every registered receiver.
    ///
    /// Queued when called while another event is being delivered.
    pub fn send(&self, event: E) {
        {
            let mut state = self.shared.state.borrow_mut();
            if let Dispatch::Busy { queue } = &mut state.dispatch {
                if let Some(cap) = self.shared.config.recurrent_limit() {
                    if queue.len() >= cap {
                        tracing::warn!(capacity = cap, "recurrent event queue full; event dropped");
                        return;
                    }
                }
                queue.push_back(event);
                return;
            }
            state.dispatch = Dispatch::Busy {
                queue: VecDeque::new(),
            };
        }
        self.cycle(|| self.dispatch(event, Pass::Initial));
    }

    /// Registers a receiver and delivers `events` to it alone, as if they were sent
    /// to it right now.
    ///
    /// Events sent while the replay runs are queued and delivered afterwards to all
    /// receivers, this one included (through its recurrent handler, if any).
    pub(crate) fn on_replaying(&self, receiver: EventReceiver<E>, events: Vec<E>) -> Supply {
        let supply = receiver.supply().clone();
        let Some(slot) = self.add(receiver) else {
            return supply;
        };
        if events.is_empty() {
            return supply;
        }

        let start = {
            let mut state = self.shared.state.borrow_mut();
            match state.dispatch {
                Dispatch::Busy { .. } => false,
                Dispatch::Idle => {
                    state.dispatch = Dispatch::Busy {
                        queue: VecDeque::new(),
                    };
                    true
                }
            }
        };
        let replay = || {
            for event in events {
                Self::deliver(&slot, event, None);
            }
        };
        if start {
            self.cycle(replay);
        } else {
            replay();
        }
        supply
    }

    fn add(&self, receiver: EventReceiver<E>) -> Option<Rc<Slot<E>>> {
        let supply = receiver.supply().clone();
        if let Some(reason) = self.shared.supply.reason() {
            supply.off(reason);
            return None;
        }
        if supply.is_off() {
            return None;
        }

        let slot = {
            let mut state = self.shared.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            let slot = Rc::new(Slot {
                id,
                receiver,
                recurrent: RefCell::new(None),
            });
            state.slots.push(Rc::clone(&slot));
            slot
        };

        let weak = Rc::downgrade(&self.shared);
        let id = slot.id;
        supply.when_off(move |_| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let removed = {
                let mut state = shared.state.borrow_mut();
                state
                    .slots
                    .iter()
                    .position(|s| s.id == id)
                    .map(|idx| state.slots.remove(idx))
            };
            drop(removed);
        });

        Some(slot)
    }

    /// Runs `first`, then drains the recurrent queue. Expects the state to be `Busy`.
    fn cycle(&self, first: impl FnOnce()) {
        let _idle = CycleGuard {
            shared: &self.shared,
        };
        first();
        loop {
            let next = match &mut self.shared.state.borrow_mut().dispatch {
                Dispatch::Busy { queue } => queue.pop_front(),
                Dispatch::Idle => None,
            };
            match next {
                Some(event) => self.dispatch(event, Pass::Recurrent),
                None => break,
            }
        }
    }

    fn dispatch(&self, event: E, pass: Pass) {
        let slots = self.shared.state.borrow().slots.clone();
        for slot in &slots {
            let handler = match pass {
                Pass::Initial => None,
                Pass::Recurrent => slot.recurrent.borrow().clone(),
            };
            Self::deliver(slot, event.clone(), handler);
        }
    }

    fn deliver(slot: &Slot<E>, event: E, recurrent: Option<RecurrentFn<E>>) {
        match recurrent {
            Some(handler) => {
                let supply = slot.receiver.supply();
                if !supply.is_off() {
                    guard(supply, || handler(event));
                }
            }
            None => {
                let mut set = |handler: RecurrentFn<E>| {
                    *slot.recurrent.borrow_mut() = Some(handler);
                };
                let mut context = EventContext::new(&mut set);
                slot.receiver.deliver(&mut context, event);
            }
        }
    }
}

/// Returns the notifier to `Idle` and forgets recurrent handlers when a cycle ends.
struct CycleGuard<'a, E> {
    shared: &'a Shared<E>,
}

impl<E> Drop for CycleGuard<'_, E> {
    fn drop(&mut self) {
        let slots = {
            let mut state = self.shared.state.borrow_mut();
            state.dispatch = Dispatch::Idle;
            state.slots.clone()
        };
        for slot in slots {
            slot.recurrent.borrow_mut().take();
        }
    }
}

impl<E> fmt::Debug for EventNotifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("size", &self.shared.state.borrow().slots.len())
            .field("supply", &self.shared.supply)
            .finish()
    }
}
