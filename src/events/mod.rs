//! Event notification: the synchronous fan-out every sender is built on.
//!
//! ## Contents
//! - [`EventNotifier`] receiver set with `send`, recurrence trampoline and its own supply
//!
//! ## Quick reference
//! - **Publishers**: anything holding a notifier clone calls `send`.
//! - **Consumers**: receivers registered with `on`, directly or through
//!   [`OnEvent`](crate::OnEvent)/[`AfterEvent`](crate::AfterEvent) built over the notifier.

mod notifier;

pub use notifier::EventNotifier;
