//! # Sender/keeper capabilities.
//!
//! Whatever can hand out an [`OnEvent`] is an [`EventSender`]; whatever can hand out an
//! [`AfterEvent`] is an [`EventKeeper`]. Where a value may be either, it is carried as
//! an [`EventSource`], so the distinction is known statically instead of probed.

use crate::events::EventNotifier;
use crate::receivers::IntoEventReceiver;
use crate::senders::{AfterEvent, OnEvent};
use crate::supply::Supply;

/// Something receivers can register with.
pub trait EventSender<E: Clone + 'static> {
    /// Sender view of this source.
    fn on_event(&self) -> OnEvent<E>;
}

/// A sender that also replays its most recent event to new receivers.
pub trait EventKeeper<E: Clone + 'static> {
    /// Keeper view of this source.
    fn after_event(&self) -> AfterEvent<E>;
}

/// Either a sender or a keeper.
pub enum EventSource<E> {
    /// Delivers events sent after registration.
    Sender(OnEvent<E>),
    /// Also replays the current event on registration.
    Keeper(AfterEvent<E>),
}

impl<E> Clone for EventSource<E> {
    fn clone(&self) -> Self {
        match self {
            EventSource::Sender(on) => EventSource::Sender(on.clone()),
            EventSource::Keeper(after) => EventSource::Keeper(after.clone()),
        }
    }
}

impl<E> EventSource<E> {
    /// True for [`EventSource::Keeper`].
    #[inline]
    pub fn is_keeper(&self) -> bool {
        matches!(self, EventSource::Keeper(_))
    }
}

impl<E: Clone + 'static> EventSource<E> {
    /// Registers a receiver with the underlying sender or keeper.
    pub fn on(&self, receiver: impl IntoEventReceiver<E>) -> Supply {
        match self {
            EventSource::Sender(on) => on.on(receiver),
            EventSource::Keeper(after) => after.on(receiver),
        }
    }
}

impl<E: Clone + 'static> EventSender<E> for EventSource<E> {
    fn on_event(&self) -> OnEvent<E> {
        match self {
            EventSource::Sender(on) => on.clone(),
            EventSource::Keeper(after) => after.on_event(),
        }
    }
}

impl<E> From<OnEvent<E>> for EventSource<E> {
    fn from(on: OnEvent<E>) -> Self {
        EventSource::Sender(on)
    }
}

impl<E> From<AfterEvent<E>> for EventSource<E> {
    fn from(after: AfterEvent<E>) -> Self {
        EventSource::Keeper(after)
    }
}

impl<E: Clone + 'static> From<EventNotifier<E>> for EventSource<E> {
    fn from(notifier: EventNotifier<E>) -> Self {
        EventSource::Sender(notifier.on_event())
    }
}

impl<E: Clone + 'static> EventSender<E> for EventNotifier<E> {
    fn on_event(&self) -> OnEvent<E> {
        let notifier = self.clone();
        OnEvent::by(move |receiver| {
            notifier.on(receiver);
        })
    }
}
