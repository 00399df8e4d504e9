//! # eventide
//!
//! **Eventide** is a single-threaded event composition core for Rust.
//!
//! It provides primitives to send events, subscribe to them, cancel
//! subscriptions as a graph, and compose senders into new ones. The crate is
//! designed as a building block for higher-level reactive state and UI layers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ EventNotifier│   │ register fn  │   │  future / E  │
//!     │   (send)     │   │ (any source) │   │ (Resolvable) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Senders                                                          │
//! │  - OnEvent    (events after registration)                         │
//! │  - AfterEvent (current event replayed, then live events)          │
//! │  - EventSource (either, known statically)                         │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐  ┌─────────────┐
//!     │    share()   │   │ thru(Chain)  │   │  resolve()   │  │  pipe(f)    │
//!     │ one upstream │   │ pass stages  │   │ in order /   │  │ any         │
//!     │ N receivers  │   │ skip / dig   │   │ any order    │  │ processor   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘  └──────┬──────┘
//!            └──────────────────┴─────────┬────────┴─────────────────┘
//!                                         ▼
//!                      EventReceiver { supply, receive(ctx, E) }
//!                                         │
//!                                         ▼
//!                      Supply ── needs/cuts ──► dependent supplies
//! ```
//!
//! ### Delivery
//! ```text
//! notifier.send(E1)
//!   ├─► Idle ──► Busy
//!   ├─► for receiver in registration order:
//!   │       receive(ctx, E1)            panics cut that receiver off
//!   │         ├─ send(E2)        ─► queued, not nested
//!   │         └─ ctx.on_recurrent(h) ─► h gets this receiver's share of E2
//!   ├─► pop E2 ──► deliver to every receiver (or its recurrent handler)
//!   └─► queue empty ──► Idle
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Supplies**      | Idempotent cancellation with dependency edges.               | [`Supply`], [`Reason`]                      |
//! | **Receivers**     | Normalized receivers with per-delivery context.              | [`EventReceiver`], [`EventContext`]         |
//! | **Notification**  | Fan-out with a recurrence trampoline.                        | [`EventNotifier`], [`Config`]               |
//! | **Senders**       | Registration surface, keepers with replay.                   | [`OnEvent`], [`AfterEvent`], [`EventSource`]|
//! | **Composition**   | Sharing, pass chains, async resolution.                      | [`Chain`], [`Flow`], [`Resolvable`]         |
//! | **Errors**        | Typed cutoff errors.                                         | [`EventError`]                              |
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use eventide::{AfterEvent, Chain, EventNotifier, Flow};
//!
//! let notifier = EventNotifier::<u32>::new();
//! let counter = AfterEvent::sent_or(&notifier, || 0)
//!     .thru(Chain::new().pass(|n: u32| Flow::Next(format!("count = {n}"))))
//!     .share();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let supply = counter.on(move |line: String| sink.borrow_mut().push(line));
//!
//! notifier.send(1);
//! supply.done();
//! notifier.send(2);
//!
//! assert_eq!(*seen.borrow(), vec!["count = 0", "count = 1"]);
//! ```
mod chain;
mod config;
mod error;
mod events;
mod receivers;
mod resolve;
mod senders;
mod share;
mod supply;

// ---- Public re-exports ----

pub use chain::{Chain, Flow};
pub use config::Config;
pub use error::EventError;
pub use events::EventNotifier;
pub use receivers::{EventContext, EventReceiver, IntoEventReceiver, RecurrentFn};
pub use resolve::Resolvable;
pub use senders::{AfterEvent, EventKeeper, EventSender, EventSource, OnEvent};
pub use supply::{Reason, Supply};
