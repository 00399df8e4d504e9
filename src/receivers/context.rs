//! # Delivery context handed to receivers.
//!
//! An [`EventContext`] only lives for the duration of a single `receive` call.
//! Its sole capability is [`EventContext::on_recurrent`]: choosing who handles
//! the events this receiver (or anyone else) sends recursively while the current
//! delivery is still running.

use std::rc::Rc;

/// Handler for recurrent events.
pub type RecurrentFn<E> = Rc<dyn Fn(E)>;

/// Context of a single event delivery.
pub struct EventContext<'a, E> {
    set_recurrent: &'a mut dyn FnMut(RecurrentFn<E>),
}

impl<'a, E: 'static> EventContext<'a, E> {
    pub(crate) fn new(set_recurrent: &'a mut dyn FnMut(RecurrentFn<E>)) -> Self {
        Self { set_recurrent }
    }

    /// Redirects this receiver's share of the recurrent events to `receiver`.
    ///
    /// Recurrent events are the ones sent synchronously while the current event is
    /// being delivered. They are queued and delivered after the current pass; without
    /// a redirect they go to the regular `receive`.
    pub fn on_recurrent(&mut self, receiver: impl Fn(E) + 'static) {
        (self.set_recurrent)(Rc::new(receiver));
    }

    /// Runs `f` with a context that ignores recurrent redirects.
    pub(crate) fn detached<R>(f: impl FnOnce(&mut EventContext<'_, E>) -> R) -> R {
        let mut ignore = |_: RecurrentFn<E>| {};
        f(&mut EventContext::new(&mut ignore))
    }

    /// Runs `f` with a context for another event type.
    ///
    /// Recurrent handlers registered on the new context are converted by `lift`
    /// and registered on this one.
    pub(crate) fn adapt<F: 'static, R>(
        &mut self,
        mut lift: impl FnMut(RecurrentFn<F>) -> RecurrentFn<E>,
        f: impl FnOnce(&mut EventContext<'_, F>) -> R,
    ) -> R {
        let mut set = |handler: RecurrentFn<F>| (self.set_recurrent)(lift(handler));
        f(&mut EventContext::new(&mut set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_adapt_lifts_recurrent_handler() {
        let registered: RefCell<Option<RecurrentFn<i32>>> = RefCell::new(None);
        let mut set = |h: RecurrentFn<i32>| *registered.borrow_mut() = Some(h);
        let mut ctx = EventContext::new(&mut set);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctx.adapt(
            |h: RecurrentFn<String>| Rc::new(move |n: i32| h(n.to_string())),
            |inner| inner.on_recurrent(move |s: String| sink.borrow_mut().push(s)),
        );

        let handler = registered.borrow_mut().take();
        if let Some(handler) = handler {
            handler(7);
        }
        assert_eq!(*seen.borrow(), vec!["7".to_string()]);
    }
}
