//! # Pass chains: multi-stage event transformation.
//!
//! A [`Chain`] is a typed list of passes. Each pass takes the output of the previous
//! one and returns a [`Flow`]:
//!
//! ```text
//!  event ──► pass 0 ──Next(v)──► pass 1 ──Next(v)──► ... ──► receiver
//!              │                   │
//!              │ Skip              │ Dig(source)
//!              ▼                   ▼
//!       stop here for this    every event of `source` continues at pass 2
//!       event                 until the next event reaches pass 1
//! ```
//!
//! ## Rules
//! - Each stage holds the supply of the latest event that reached it. A newer event
//!   cuts the older supply off first, then builds its own on top of the previous
//!   stage's supply. Nested subscriptions of superseded events end there.
//! - `Skip` cuts the stage supply off: nothing that event started downstream survives.
//! - Recurrent handlers registered by the final receiver are mapped back through the
//!   passes, so recurrent upstream events reach them transformed.
//! - A panicking pass cuts the receiver off.
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use eventide::{Chain, EventNotifier, EventSender, Flow};
//!
//! let notifier = EventNotifier::<u32>::new();
//! let evens = notifier.on_event().thru(
//!     Chain::new()
//!         .pass(|n: u32| if n % 2 == 0 { Flow::Next(n) } else { Flow::Skip })
//!         .pass(|n: u32| Flow::Next(format!("#{n}"))),
//! );
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! evens.on(move |s: String| sink.borrow_mut().push(s));
//!
//! for n in 1..=4 {
//!     notifier.send(n);
//! }
//! assert_eq!(*seen.borrow(), vec!["#2", "#4"]);
//! ```

mod stage;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::receivers::{EventContext, EventReceiver};
use crate::senders::{AfterEvent, EventSender, EventSource, OnEvent};
use crate::supply::Supply;

use stage::{Parent, Sink, Stage, Tail};

/// Outcome of a single pass.
pub enum Flow<T> {
    /// Continue with this value.
    Next(T),
    /// Stop processing the current event.
    Skip,
    /// Continue with every event of this source, until the next event reaches
    /// the same pass.
    Dig(EventSource<T>),
}

impl<T> fmt::Debug for Flow<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Next(value) => f.debug_tuple("Next").field(value).finish(),
            Flow::Skip => f.write_str("Skip"),
            Flow::Dig(source) => f
                .debug_tuple("Dig")
                .field(&if source.is_keeper() { "keeper" } else { "sender" })
                .finish(),
        }
    }
}

type Build<I, O> = Rc<dyn Fn(&Supply, Parent, Tail<O>) -> Sink<I>>;

/// Typed sequence of passes from `I` to `O`.
pub struct Chain<I, O> {
    build: Build<I, O>,
}

impl<I, O> Clone for Chain<I, O> {
    fn clone(&self) -> Self {
        Self {
            build: Rc::clone(&self.build),
        }
    }
}

impl<I: Clone + 'static> Chain<I, I> {
    /// An empty chain passing events through unchanged.
    pub fn new() -> Self {
        Self {
            build: Rc::new(|_: &Supply, parent: Parent, tail: Tail<I>| tail(parent)),
        }
    }
}

impl<I: Clone + 'static> Default for Chain<I, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Clone + 'static, O: Clone + 'static> Chain<I, O> {
    /// Appends a pass.
    pub fn pass<P: Clone + 'static>(self, pass: impl Fn(O) -> Flow<P> + 'static) -> Chain<I, P> {
        let previous = self.build;
        let pass: Rc<dyn Fn(O) -> Flow<P>> = Rc::new(pass);
        Chain {
            build: Rc::new(move |root: &Supply, parent: Parent, tail: Tail<P>| {
                let pass = Rc::clone(&pass);
                let stage_root = root.clone();
                previous(
                    root,
                    parent,
                    Box::new(move |last: Parent| {
                        let current = Rc::new(RefCell::new(None));
                        let next = tail(Parent::Stage(Rc::clone(&current)));
                        Stage {
                            pass,
                            current,
                            parent: last,
                            root: stage_root,
                        }
                        .into_sink(next)
                    }),
                )
            }),
        }
    }

    /// Appends a pass converting every value.
    pub fn map<P: Clone + 'static>(self, map: impl Fn(O) -> P + 'static) -> Chain<I, P> {
        self.pass(move |value| Flow::Next(map(value)))
    }

    /// Appends a pass dropping values that do not match `predicate`.
    pub fn filter(self, predicate: impl Fn(&O) -> bool + 'static) -> Chain<I, O> {
        self.pass(move |value| {
            if predicate(&value) {
                Flow::Next(value)
            } else {
                Flow::Skip
            }
        })
    }

    /// Appends a pass switching to a nested source per value.
    pub fn dig<P: Clone + 'static>(
        self,
        extract: impl Fn(O) -> EventSource<P> + 'static,
    ) -> Chain<I, P> {
        self.pass(move |value| Flow::Dig(extract(value)))
    }

    /// Builds the sink feeding this chain, ending at `receiver`.
    fn sink(&self, receiver: &EventReceiver<O>) -> Sink<I> {
        let root = receiver.supply().clone();
        let target = receiver.clone();
        let terminal: Tail<O> = Box::new(move |_| {
            Rc::new(move |ctx: &mut EventContext<'_, O>, value: O| target.receive(ctx, value))
        });
        (self.build)(&root, Parent::Root(root.clone()), terminal)
    }
}

impl<I, O> fmt::Debug for Chain<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").finish_non_exhaustive()
    }
}

impl<E: Clone + 'static> OnEvent<E> {
    /// A sender delivering the events of this one transformed by `chain`.
    pub fn thru<O: Clone + 'static>(&self, chain: Chain<E, O>) -> OnEvent<O> {
        let source = self.clone();
        OnEvent::by(move |receiver: EventReceiver<O>| {
            let sink = chain.sink(&receiver);
            source.on(EventReceiver::new(
                receiver.supply().clone(),
                move |ctx: &mut EventContext<'_, E>, event: E| sink(ctx, event),
            ));
        })
    }
}

impl<E: Clone + 'static> AfterEvent<E> {
    /// A keeper over the events of this one transformed by `chain`.
    ///
    /// Registration fails with [`EventError::NoEvents`](crate::EventError::NoEvents)
    /// when the chain skips the current event.
    pub fn thru<O: Clone + 'static>(&self, chain: Chain<E, O>) -> AfterEvent<O> {
        AfterEvent::sent(&self.on_event().thru(chain))
    }

    /// Like [`AfterEvent::thru`], with a fallback for when the chain yields nothing
    /// on registration.
    pub fn thru_or<O: Clone + 'static>(
        &self,
        chain: Chain<E, O>,
        fallback: impl Fn() -> O + 'static,
    ) -> AfterEvent<O> {
        AfterEvent::sent_or(&self.on_event().thru(chain), fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventError;
    use crate::events::EventNotifier;
    use crate::supply::Reason;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder<T: fmt::Display + 'static>(log: &Log) -> impl Fn(T) + 'static {
        let log = Rc::clone(log);
        move |value: T| log.borrow_mut().push(value.to_string())
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let notifier = EventNotifier::<u32>::new();
        let log: Log = Rc::default();
        notifier.on_event().thru(Chain::new()).on(recorder::<u32>(&log));
        notifier.send(1);
        assert_eq!(*log.borrow(), vec!["1"]);
    }

    #[test]
    fn test_passes_run_in_order() {
        let notifier = EventNotifier::<u32>::new();
        let log: Log = Rc::default();
        let chain = Chain::new()
            .map(|n: u32| n + 1)
            .filter(|n| n % 2 == 0)
            .map(|n| format!("<{n}>"));
        notifier.on_event().thru(chain).on(recorder::<String>(&log));

        for n in 0..5 {
            notifier.send(n);
        }
        assert_eq!(*log.borrow(), vec!["<2>", "<4>"]);
    }

    #[test]
    fn test_dig_switches_to_latest_nested_source() {
        let outer = EventNotifier::<usize>::new();
        let inner = [EventNotifier::<String>::new(), EventNotifier::<String>::new()];
        let log: Log = Rc::default();

        let sources = inner.clone();
        let chain = Chain::new().dig(move |idx: usize| sources[idx].on_event().into());
        outer.on_event().thru(chain).on(recorder::<String>(&log));

        outer.send(0);
        inner[0].send("a0".into());
        outer.send(1);
        inner[0].send("b0".into());
        inner[1].send("b1".into());

        assert_eq!(*log.borrow(), vec!["a0", "b1"]);
        assert_eq!(inner[0].size(), 0);
        assert_eq!(inner[1].size(), 1);
    }

    #[test]
    fn test_skip_cuts_previous_nested_subscription() {
        let outer = EventNotifier::<Option<u32>>::new();
        let inner = EventNotifier::<u32>::new();
        let log: Log = Rc::default();

        let nested = inner.clone();
        let chain = Chain::new().pass(move |wanted: Option<u32>| match wanted {
            Some(_) => Flow::Dig(nested.on_event().into()),
            None => Flow::Skip,
        });
        outer.on_event().thru(chain).on(recorder::<u32>(&log));

        outer.send(Some(1));
        inner.send(10);
        outer.send(None);
        inner.send(20);

        assert_eq!(*log.borrow(), vec!["10"]);
        assert_eq!(inner.size(), 0);
    }

    #[test]
    fn test_dig_keeper_delivers_immediately() {
        let outer = EventNotifier::<u32>::new();
        let log: Log = Rc::default();
        let chain = Chain::new()
            .dig(|n: u32| AfterEvent::of(n * 100).into())
            .map(|n: u32| n + 1);
        outer.on_event().thru(chain).on(recorder::<u32>(&log));

        outer.send(1);
        outer.send(2);
        assert_eq!(*log.borrow(), vec!["101", "201"]);
    }

    #[test]
    fn test_recurrent_events_are_mapped() {
        let notifier = EventNotifier::<u32>::new();
        let log: Log = Rc::default();

        let (n, l) = (notifier.clone(), Rc::clone(&log));
        notifier
            .on_event()
            .thru(Chain::new().map(|v: u32| v * 10))
            .on(EventReceiver::new(Supply::new(), move |ctx, v: u32| {
                l.borrow_mut().push(format!("receive:{v}"));
                if v == 10 {
                    let l2 = Rc::clone(&l);
                    ctx.on_recurrent(move |v: u32| l2.borrow_mut().push(format!("recurrent:{v}")));
                    n.send(2);
                }
            }));

        notifier.send(1);
        assert_eq!(*log.borrow(), vec!["receive:10", "recurrent:20"]);
    }

    #[test]
    fn test_panicking_pass_cuts_receiver() {
        let notifier = EventNotifier::<u32>::new();
        let chain = Chain::new().pass(|n: u32| -> Flow<u32> {
            if n > 1 {
                panic!("pass failed");
            }
            Flow::Next(n)
        });
        let supply = notifier.on_event().thru(chain).on(|_: u32| {});

        notifier.send(1);
        assert!(!supply.is_off());
        notifier.send(2);
        assert_eq!(
            supply.reason(),
            Some(Reason::Failed(EventError::ReceiverPanicked {
                info: "pass failed".into()
            }))
        );
        assert_eq!(notifier.size(), 0);
    }

    #[test]
    fn test_receiver_cutoff_ends_nested_subscriptions() {
        let outer = EventNotifier::<u32>::new();
        let inner = EventNotifier::<u32>::new();
        let nested = inner.clone();
        let supply = outer
            .on_event()
            .thru(Chain::new().dig(move |_: u32| nested.on_event().into()))
            .on(|_: u32| {});

        outer.send(0);
        assert_eq!(inner.size(), 1);
        supply.done();
        assert_eq!(inner.size(), 0);
        assert_eq!(outer.size(), 0);
    }

    #[test]
    fn test_keeper_thru() {
        let notifier = EventNotifier::<u32>::new();
        let keeper = AfterEvent::sent_or(&notifier, || 1);
        let log: Log = Rc::default();

        let evens = keeper.thru(Chain::new().filter(|n: &u32| n % 2 == 0));
        let supply = evens.on(recorder::<u32>(&log));
        assert_eq!(supply.reason(), Some(Reason::Failed(EventError::NoEvents)));

        let doubled = keeper.thru_or(Chain::new().filter(|n: &u32| n % 2 == 0), || 0);
        doubled.on(recorder::<u32>(&log));
        notifier.send(4);
        assert_eq!(*log.borrow(), vec!["0", "4"]);
    }

    #[test]
    fn test_flow_debug_names_source_kind() {
        let keeper = Flow::<u32>::Dig(AfterEvent::of(1_u32).into());
        let sender = Flow::<u32>::Dig(EventNotifier::<u32>::new().on_event().into());

        assert_eq!(format!("{keeper:?}"), r#"Dig("keeper")"#);
        assert_eq!(format!("{sender:?}"), r#"Dig("sender")"#);
        assert_eq!(format!("{:?}", Flow::Next(3_u32)), "Next(3)");
        assert_eq!(format!("{:?}", Flow::<u32>::Skip), "Skip");
    }
}
