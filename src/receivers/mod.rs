//! # Event receivers.
//!
//! A receiver is the consuming end of a subscription: a `receive` function paired
//! with the [`Supply`](crate::Supply) that bounds its lifetime.
//!
//! ```text
//!   Fn(E)  ──────────────┐
//!                        ├──► IntoEventReceiver ──► EventReceiver { supply, receive(ctx, E) }
//!   EventReceiver ───────┘
//! ```
//!
//! ## Contents
//! - [`EventReceiver`], [`IntoEventReceiver`] normalized receivers
//! - [`EventContext`] per-delivery context (`on_recurrent`)

mod context;
mod receiver;

pub use context::{EventContext, RecurrentFn};
pub use receiver::{EventReceiver, IntoEventReceiver};

pub(crate) use receiver::{guard, guard_register};
