//! # `AfterEvent`: event keeper.
//!
//! A keeper is a sender that remembers its most recent event and replays it,
//! synchronously, to every newly registered receiver.
//!
//! ## Registration
//! ```text
//! on(receiver)
//!   ├─► receivers += 1
//!   ├─► register(rcv)               events sent now only update `last`
//!   ├─► receiver cut off? ──► return
//!   ├─► initial = last ?? fallback() ?? cut off with NoEvents
//!   ├─► replay initial through a one-receiver trampoline
//!   │      recurrent events sent meanwhile are queued and reach the receiver
//!   │      (or its `on_recurrent` handler) right after the initial one
//!   └─► live: rcv forwards every later event with the upstream context
//!
//! receiver cut off ──► receivers -= 1 ──► 0? forget `last`
//! ```
//!
//! Forgetting `last` when nobody observes the keeper means the next registration
//! starts from scratch: the register function runs again and may again fall back.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use crate::error::EventError;
use crate::events::EventNotifier;
use crate::receivers::{guard_register, EventReceiver, IntoEventReceiver};
use crate::senders::{EventKeeper, EventSender, OnEvent};
use crate::supply::{Reason, Supply};

type RegisterFn<E> = Rc<dyn Fn(EventReceiver<E>)>;
type FallbackFn<E> = Rc<dyn Fn() -> E>;

/// Cached state shared by all registrations of one keeper.
struct Memory<E> {
    last: RefCell<Option<E>>,
    receivers: Cell<usize>,
}

/// Where upstream events go during one registration.
enum Phase<E> {
    /// The register function is running.
    Registering,
    /// The initial event is being delivered.
    Initial(EventNotifier<E>),
    /// Forward straight to the receiver.
    Live,
}

/// Event keeper.
///
/// Cheap to clone: clones share the cached event.
///
/// ## Example
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use eventide::{AfterEvent, EventNotifier};
///
/// let notifier = EventNotifier::<&'static str>::new();
/// let keeper = AfterEvent::sent_or(&notifier, || "initial");
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
/// keeper.on(move |s: &'static str| sink.borrow_mut().push(s));
/// notifier.send("next");
///
/// assert_eq!(*seen.borrow(), vec!["initial", "next"]);
/// ```
pub struct AfterEvent<E> {
    register: RegisterFn<E>,
}

impl<E> Clone for AfterEvent<E> {
    fn clone(&self) -> Self {
        Self {
            register: Rc::clone(&self.register),
        }
    }
}

impl<E: Clone + 'static> AfterEvent<E> {
    /// Creates a keeper from a register function, without a fallback.
    ///
    /// Registration fails with [`EventError::NoEvents`] unless the register function
    /// sends an event synchronously.
    pub fn by(register: impl Fn(EventReceiver<E>) + 'static) -> Self {
        Self::build(Rc::new(register), None)
    }

    /// Creates a keeper from a register function and a fallback computing the
    /// initial event when none has been sent yet.
    pub fn by_or(
        register: impl Fn(EventReceiver<E>) + 'static,
        fallback: impl Fn() -> E + 'static,
    ) -> Self {
        Self::build(Rc::new(register), Some(Rc::new(fallback)))
    }

    /// A keeper over any sender, without a fallback.
    pub fn sent(sender: &impl EventSender<E>) -> Self {
        let on_event = sender.on_event();
        Self::by(move |receiver| {
            on_event.on(receiver);
        })
    }

    /// A keeper over any sender, with a fallback.
    pub fn sent_or(sender: &impl EventSender<E>, fallback: impl Fn() -> E + 'static) -> Self {
        let on_event = sender.on_event();
        Self::by_or(
            move |receiver| {
                on_event.on(receiver);
            },
            fallback,
        )
    }

    /// A keeper that always replays `value` and never sends anything else.
    pub fn of(value: E) -> Self {
        Self::by_or(|_| {}, move || value.clone())
    }

    /// A keeper that cuts every receiver off right away.
    pub fn never() -> Self {
        Self {
            register: Rc::new(|receiver: EventReceiver<E>| {
                receiver.supply().done();
            }),
        }
    }

    fn build(register: RegisterFn<E>, fallback: Option<FallbackFn<E>>) -> Self {
        let memory = Rc::new(Memory {
            last: RefCell::new(None),
            receivers: Cell::new(0),
        });
        Self {
            register: Rc::new(move |receiver| {
                keep(&register, fallback.as_ref(), &memory, receiver);
            }),
        }
    }

    /// Registers a receiver and returns its supply.
    ///
    /// The receiver gets the current event before this call returns.
    pub fn on(&self, receiver: impl IntoEventReceiver<E>) -> Supply {
        let receiver = receiver.into_event_receiver();
        let supply = receiver.supply().clone();
        if !supply.is_off() {
            guard_register(&supply, || (self.register)(receiver));
        }
        supply
    }

    /// Applies a processor to this keeper.
    pub fn pipe<R>(&self, processor: impl FnOnce(AfterEvent<E>) -> R) -> R {
        processor(self.clone())
    }

    /// Resolves with the current event.
    pub fn next_event(&self) -> impl Future<Output = Result<E, EventError>> + 'static {
        self.on_event().next_event()
    }
}

fn keep<E: Clone + 'static>(
    register: &RegisterFn<E>,
    fallback: Option<&FallbackFn<E>>,
    memory: &Rc<Memory<E>>,
    receiver: EventReceiver<E>,
) {
    let supply = receiver.supply().clone();
    let phase = Rc::new(RefCell::new(Phase::Registering));

    let upstream = {
        let memory = Rc::clone(memory);
        let phase = Rc::clone(&phase);
        let target = receiver.clone();
        EventReceiver::new(supply.clone(), move |ctx, event: E| {
            memory.last.replace(Some(event.clone()));
            let trampoline = match &*phase.borrow() {
                Phase::Registering => return,
                Phase::Initial(trampoline) => Some(trampoline.clone()),
                Phase::Live => None,
            };
            match trampoline {
                Some(trampoline) => trampoline.send(event),
                None => target.receive(ctx, event),
            }
        })
    };

    // Counted up front: a cutoff during registration must also forget `last`.
    memory.receivers.set(memory.receivers.get() + 1);
    let forget = Rc::clone(memory);
    supply.when_off(move |_| {
        let left = forget.receivers.get().saturating_sub(1);
        forget.receivers.set(left);
        if left == 0 {
            forget.last.take();
        }
    });

    guard_register(&supply, || register(upstream));
    if supply.is_off() {
        return;
    }

    let cached = memory.last.borrow().clone();
    let mut initial = cached;
    if initial.is_none() {
        if let Some(fallback) = fallback {
            guard_register(&supply, || initial = Some(fallback()));
        }
    }
    let Some(initial) = initial else {
        if !supply.is_off() {
            tracing::debug!("keeper has no event to replay and no fallback");
            supply.off(Reason::Failed(EventError::NoEvents));
        }
        return;
    };

    let trampoline = EventNotifier::new();
    *phase.borrow_mut() = Phase::Initial(trampoline.clone());
    trampoline.on_replaying(receiver, vec![initial]);
    *phase.borrow_mut() = Phase::Live;
}

impl<E: Clone + 'static> EventSender<E> for AfterEvent<E> {
    fn on_event(&self) -> OnEvent<E> {
        let register = Rc::clone(&self.register);
        OnEvent::by(move |receiver| register(receiver))
    }
}

impl<E: Clone + 'static> EventKeeper<E> for AfterEvent<E> {
    fn after_event(&self) -> AfterEvent<E> {
        self.clone()
    }
}

impl<E> fmt::Debug for AfterEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterEvent").finish_non_exhaustive()
    }
}
