//! Senders and keepers: the registration surface of the crate.
//!
//! ## Contents
//! - [`OnEvent`] sender: delivers events sent after registration
//! - [`AfterEvent`] keeper: additionally replays the current event on registration
//! - [`EventSender`], [`EventKeeper`] capabilities, [`EventSource`] either-of-both
//!
//! ```text
//!  register fn ──► OnEvent::by ──► on(receiver) ──► Supply
//!                        │
//!                        └────► AfterEvent::sent(_or) ──► on(receiver): replay + live
//! ```

mod after_event;
mod on_event;
mod source;

pub use after_event::AfterEvent;
pub use on_event::OnEvent;
pub use source::{EventKeeper, EventSender, EventSource};
