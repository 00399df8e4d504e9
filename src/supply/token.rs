//! # Supply: a one-shot cancellation token with dependency edges.
//!
//! ```text
//!   a.needs(&b)            b.off(r)
//!   ┌───┐  needs  ┌───┐   ─────────►  b: callbacks(r) ──► a.off(r) ──► a: callbacks(r)
//!   │ a │ ──────► │ b │
//!   └───┘         └───┘   a.off(_) removes a's edge from b
//! ```
//!
//! ## Rules
//! - `off` is idempotent: the first reason wins, callbacks run once, in registration order.
//! - `when_off` on a supply that is already off runs the callback immediately.
//! - `needs` on a supply whose dependency is already off cuts it off immediately.
//! - Callbacks run after the internal borrow is released, so they may freely
//!   re-enter the same supply (register more callbacks, query state, ...).

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::reason::Reason;
use crate::error::EventError;

type Callback = Box<dyn FnOnce(&Reason)>;

#[derive(Default)]
struct SupplyState {
    /// Set exactly once, on the first `off`.
    reason: Option<Reason>,
    /// Pending callbacks keyed for removal.
    callbacks: Vec<(u64, Callback)>,
    next_key: u64,
}

/// Lifetime of a subscription.
///
/// Cheap to clone: every clone is a handle to the same token.
#[derive(Clone, Default)]
pub struct Supply {
    inner: Rc<RefCell<SupplyState>>,
}

impl Supply {
    /// Creates a supply that is not cut off yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a supply that is already cut off with [`Reason::Done`].
    pub fn never() -> Self {
        let supply = Self::new();
        supply.off(Reason::Done);
        supply
    }

    /// True once the supply has been cut off.
    #[inline]
    pub fn is_off(&self) -> bool {
        self.inner.borrow().reason.is_some()
    }

    /// The cutoff reason, or `None` while the supply is still on.
    pub fn reason(&self) -> Option<Reason> {
        self.inner.borrow().reason.clone()
    }

    /// Cuts the supply off.
    ///
    /// Only the first call has an effect: later calls neither change the reason
    /// nor re-run callbacks.
    pub fn off(&self, reason: Reason) -> &Self {
        let callbacks = {
            let mut state = self.inner.borrow_mut();
            if state.reason.is_some() {
                return self;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.callbacks)
        };
        for (_, callback) in callbacks {
            callback(&reason);
        }
        self
    }

    /// Cuts the supply off as completed normally.
    #[inline]
    pub fn done(&self) -> &Self {
        self.off(Reason::Done)
    }

    /// Registers a callback to run on cutoff.
    ///
    /// Runs the callback right away when the supply is already off.
    pub fn when_off(&self, callback: impl FnOnce(&Reason) + 'static) -> &Self {
        self.watch(Box::new(callback));
        self
    }

    /// Makes this supply depend on `other`: cutting `other` off cuts this one off
    /// with the same reason.
    ///
    /// The edge is dropped from `other` as soon as this supply is cut off.
    pub fn needs(&self, other: &Supply) -> &Self {
        if Rc::ptr_eq(&self.inner, &other.inner) {
            return self;
        }
        let dependent = self.clone();
        let key = other.watch(Box::new(move |reason| {
            dependent.off(reason.clone());
        }));
        if let Some(key) = key {
            let upstream = Rc::downgrade(&other.inner);
            self.when_off(move |_| {
                if let Some(inner) = upstream.upgrade() {
                    Supply { inner }.unwatch(key);
                }
            });
        }
        self
    }

    /// Makes `other` depend on this supply. Mirror of [`Supply::needs`].
    pub fn cuts(&self, other: &Supply) -> &Self {
        other.needs(self);
        self
    }

    /// Creates a new supply that depends on this one.
    pub fn derive(&self) -> Supply {
        let derived = Supply::new();
        derived.needs(self);
        derived
    }

    /// Returns a token cancelled when this supply is cut off.
    ///
    /// Bridges a supply into code built around `tokio_util` cancellation.
    pub fn to_cancellation_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let cancel = token.clone();
        self.when_off(move |_| cancel.cancel());
        token
    }

    /// Resolves once the supply is cut off.
    ///
    /// `Ok(())` for [`Reason::Done`], the error for [`Reason::Failed`]. Never resolves
    /// if the supply is dropped without being cut off.
    pub fn when_done(&self) -> impl Future<Output = Result<(), EventError>> + 'static {
        let (tx, rx) = oneshot::channel::<Reason>();
        self.when_off(move |reason| {
            let _ = tx.send(reason.clone());
        });
        async move {
            match rx.await {
                Ok(Reason::Done) => Ok(()),
                Ok(Reason::Failed(err)) => Err(err),
                Err(_) => futures::future::pending().await,
            }
        }
    }

    /// Registers a callback, returning its key while the supply is still on.
    fn watch(&self, callback: Callback) -> Option<u64> {
        let reason = {
            let mut state = self.inner.borrow_mut();
            match state.reason.clone() {
                Some(reason) => reason,
                None => {
                    let key = state.next_key;
                    state.next_key += 1;
                    state.callbacks.push((key, callback));
                    return Some(key);
                }
            }
        };
        callback(&reason);
        None
    }

    fn unwatch(&self, key: u64) {
        let removed = {
            let mut state = self.inner.borrow_mut();
            state
                .callbacks
                .iter()
                .position(|(k, _)| *k == key)
                .map(|idx| state.callbacks.remove(idx))
        };
        // Dropped outside the borrow: the callback may own other supplies.
        drop(removed);
    }

    #[cfg(test)]
    pub(crate) fn pending_callbacks(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }
}

impl fmt::Debug for Supply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supply")
            .field("reason", &self.inner.borrow().reason)
            .finish()
    }
}
