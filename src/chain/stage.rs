//! One stage of a pass chain.
//!
//! Every stage owns the supply of the event currently passing through it. A new
//! event reaching the stage cuts the previous supply off before replacing it, which
//! tears down whatever the previous event left running downstream (nested
//! subscriptions, later stages).

use std::cell::RefCell;
use std::rc::Rc;

use crate::chain::Flow;
use crate::receivers::{guard, EventContext, EventReceiver, RecurrentFn};
use crate::supply::Supply;

/// Delivery function of a stage (or of the final receiver).
pub(crate) type Sink<T> = Rc<dyn Fn(&mut EventContext<'_, T>, T)>;

/// Continuation building the rest of a chain once the parent of its first stage is known.
pub(crate) type Tail<T> = Box<dyn FnOnce(Parent) -> Sink<T>>;

/// Supply slot of a stage.
pub(crate) type Current = Rc<RefCell<Option<Supply>>>;

/// What a stage's supply depends on.
#[derive(Clone)]
pub(crate) enum Parent {
    /// First stage: the receiver's supply.
    Root(Supply),
    /// Later stages: whatever supply the previous stage holds right now.
    Stage(Current),
}

impl Parent {
    fn current(&self, root: &Supply) -> Supply {
        match self {
            Parent::Root(supply) => supply.clone(),
            Parent::Stage(current) => current.borrow().clone().unwrap_or_else(|| root.clone()),
        }
    }
}

pub(crate) struct Stage<In, Out> {
    pub(crate) pass: Rc<dyn Fn(In) -> Flow<Out>>,
    pub(crate) current: Current,
    pub(crate) parent: Parent,
    pub(crate) root: Supply,
}

impl<In: 'static, Out: Clone + 'static> Stage<In, Out> {
    /// Wraps the stage into the sink of its input.
    pub(crate) fn into_sink(self, next: Sink<Out>) -> Sink<In> {
        let stage = Rc::new(self);
        Rc::new(move |ctx: &mut EventContext<'_, In>, value: In| stage.run(ctx, value, &next))
    }

    fn run(self: &Rc<Self>, ctx: &mut EventContext<'_, In>, value: In, next: &Sink<Out>) {
        let supply = Supply::new();
        let previous = self.current.replace(Some(supply.clone()));
        if let Some(previous) = previous {
            previous.done();
        }
        supply.needs(&self.parent.current(&self.root));
        if supply.is_off() {
            return;
        }

        match (self.pass)(value) {
            Flow::Next(out) => {
                let stage = Rc::clone(self);
                ctx.adapt(
                    move |handler: RecurrentFn<Out>| -> RecurrentFn<In> {
                        let stage = Rc::clone(&stage);
                        let sink: Sink<Out> =
                            Rc::new(move |_: &mut EventContext<'_, Out>, out: Out| handler(out));
                        Rc::new(move |value: In| {
                            EventContext::detached(|ctx| stage.run(ctx, value, &sink))
                        })
                    },
                    |ctx| next(ctx, out),
                );
            }
            Flow::Skip => {
                supply.done();
            }
            Flow::Dig(source) => {
                let next = Rc::clone(next);
                let root = self.root.clone();
                source.on(EventReceiver::new(
                    supply,
                    move |ctx: &mut EventContext<'_, Out>, out: Out| {
                        guard(&root, || next(ctx, out));
                    },
                ));
            }
        }
    }
}
