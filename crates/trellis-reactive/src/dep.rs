#![forbid(unsafe_code)]

//! Dependencies (`Dep`): the subscriber set for one reactive property.
//!
//! A `Dep` exists per reactive map key and per container identity. Watchers
//! subscribe to the deps they touch while evaluating; mutating the property
//! notifies every subscriber synchronously.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in subscription order.
//! 2. A watcher appears at most once in a dep's subscriber list.
//! 3. Notification is synchronous on the triggering call stack — no batching
//!    and no dedup across a mutation burst.
//! 4. Subscribers are held weakly; dead entries are pruned lazily during
//!    notification and never notified.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::cx::TrackCx;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide id source for deps and watchers.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A unit that reacts to dependency notifications.
///
/// Implemented by watchers; `update` is the notification entry point and
/// `track_dep` is the mutual-subscription half of dependency collection.
pub trait Subscriber {
    /// Stable unique id.
    fn id(&self) -> u64;
    /// React to a dependency change.
    fn update(&self);
    /// Record `dep` in the subscriber's current dependency set and subscribe
    /// back if this is a newly seen dep.
    fn track_dep(&self, dep: &Dep);
}

/// Subscriber set for one reactive property (or container identity).
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

struct DepInner {
    id: u64,
    subs: RefCell<Vec<(u64, Weak<dyn Subscriber>)>>,
}

impl Dep {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: next_id(),
                subs: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Mutually subscribe the active watcher (if any) with this dep.
    pub fn depend(&self, cx: &TrackCx) {
        if let Some(active) = cx.active() {
            active.track_dep(self);
        }
    }

    /// Notify every live subscriber, in subscription order.
    ///
    /// Runs on the caller's stack. Subscribers added or removed while the
    /// notification is in flight do not affect the current pass: the list is
    /// snapshotted up front.
    pub fn notify(&self) {
        let snapshot: Vec<(u64, Weak<dyn Subscriber>)> = self.inner.subs.borrow().clone();
        trace!(dep = self.inner.id, subscribers = snapshot.len(), "notify");
        for (_, weak) in &snapshot {
            if let Some(sub) = weak.upgrade() {
                sub.update();
            }
        }
        self.inner
            .subs
            .borrow_mut()
            .retain(|(_, weak)| weak.strong_count() > 0);
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subs
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    pub(crate) fn add_sub(&self, id: u64, sub: Weak<dyn Subscriber>) {
        let mut subs = self.inner.subs.borrow_mut();
        if !subs.iter().any(|(sid, _)| *sid == id) {
            subs.push((id, sub));
        }
    }

    pub(crate) fn remove_sub(&self, id: u64) {
        self.inner.subs.borrow_mut().retain(|(sid, _)| *sid != id);
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
