use std::cell::{Cell, RefCell};
use std::rc::Rc;

use eventide::{
    AfterEvent, EventError, EventNotifier, EventReceiver, EventSender, OnEvent, Reason, Resolvable,
    Supply,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::LocalSet;

type Log = Rc<RefCell<Vec<String>>>;

fn push(log: &Log, entry: String) {
    log.borrow_mut().push(entry);
}

#[test]
fn test_off_keeps_first_reason() {
    let supply = Supply::new();
    let seen: Log = Rc::default();
    let s = Rc::clone(&seen);
    supply.when_off(move |reason| push(&s, reason.to_string()));

    supply.off(Reason::failed("r1"));
    supply.off(Reason::failed("r2"));

    assert!(supply.is_off());
    assert_eq!(*seen.borrow(), vec!["failed: r1"]);
}

#[test]
fn test_needs_propagates_before_and_after_cutoff() {
    let reason = Reason::Failed(EventError::rejected("r"));

    let b = Supply::new();
    let a = Supply::new();
    a.needs(&b);
    b.off(reason.clone());
    assert_eq!(a.reason(), Some(reason.clone()));

    let late = Supply::new();
    late.needs(&b);
    assert_eq!(late.reason(), Some(reason));
}

#[test]
fn test_recurrent_events_follow_breadth_first_order() {
    let notifier = EventNotifier::<String>::new();
    let log: Log = Rc::default();

    let (n, l) = (notifier.clone(), Rc::clone(&log));
    notifier.on(EventReceiver::new(Supply::new(), move |ctx, e: String| {
        push(&l, format!("R({e})"));
        let l2 = Rc::clone(&l);
        ctx.on_recurrent(move |e: String| push(&l2, format!("R2({e})")));
        n.send(format!("{e}!"));
    }));
    let l = Rc::clone(&log);
    notifier.on(move |e: String| push(&l, format!("R3({e})")));

    notifier.send("E1".into());
    assert_eq!(*log.borrow(), vec!["R(E1)", "R3(E1)", "R2(E1!)", "R3(E1!)"]);
}

#[test]
fn test_keeper_fallback_restarts_when_unobserved() {
    let registrations = Rc::new(Cell::new(0));
    let fallbacks = Rc::new(Cell::new(0));
    let (r, f) = (Rc::clone(&registrations), Rc::clone(&fallbacks));
    let keeper = AfterEvent::<Vec<String>>::by_or(
        move |_| r.set(r.get() + 1),
        move || {
            f.set(f.get() + 1);
            vec!["x".to_string()]
        },
    );

    let log: Log = Rc::default();
    let supplies: Vec<Supply> = (0..2)
        .map(|_| {
            let l = Rc::clone(&log);
            keeper.on(move |e: Vec<String>| push(&l, e.join(",")))
        })
        .collect();
    assert_eq!(*log.borrow(), vec!["x", "x"]);

    for supply in &supplies {
        supply.done();
    }
    let before = (registrations.get(), fallbacks.get());
    let l = Rc::clone(&log);
    keeper.on(move |e: Vec<String>| push(&l, e.join(",")));

    assert_eq!(log.borrow().len(), 3);
    assert_eq!(registrations.get(), before.0 + 1);
    assert_eq!(fallbacks.get(), before.1 + 1);
}

#[test]
fn test_share_replays_registration_window_once() {
    let notifier = EventNotifier::<String>::new();
    let upstream = {
        let notifier = notifier.clone();
        OnEvent::by(move |receiver: EventReceiver<String>| {
            notifier.on(receiver);
            notifier.send("a".into());
            notifier.send("b".into());
        })
    };
    let shared = upstream.share();
    let log: Log = Rc::default();

    let l = Rc::clone(&log);
    shared.on(move |e: String| push(&l, format!("A:{e}")));
    let l = Rc::clone(&log);
    shared.on(move |e: String| push(&l, format!("B:{e}")));
    notifier.send("c".into());

    assert_eq!(
        *log.borrow(),
        vec!["A:a", "A:b", "B:a", "B:b", "A:c", "B:c"]
    );
    assert_eq!(notifier.size(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_ordered_resolution_batches() {
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

            let (tx, rx) = oneshot::channel::<String>();
            notifier.send(Resolvable::Ready("1".into()));
            notifier.send(Resolvable::pending(async move {
                rx.await.map_err(|e| EventError::rejected(e))
            }));
            notifier.send(Resolvable::Ready("3".into()));

            assert_eq!(batches.recv().await, Some(vec!["1".to_string()]));
            tx.send("2".into()).unwrap();
            assert_eq!(
                batches.recv().await,
                Some(vec!["2".to_string(), "3".to_string()])
            );
            assert!(batches.try_recv().is_err());
        })
        .await;
}
