#![forbid(unsafe_code)]

//! Watchers: units of reactive computation.
//!
//! A [`Watcher<T>`] wraps an evaluator closure and the dependency set it
//! touched during its last evaluation. Two modes exist:
//!
//! - **Eager** (render watchers, user watches): evaluates at construction and
//!   re-evaluates synchronously on every dependency notification.
//! - **Lazy** (computed values): starts dirty and unevaluated; a notification
//!   only marks it dirty, deferring recomputation to the next read.
//!
//! [`Computed<T>`] layers the computed read contract on a lazy watcher:
//! evaluate-if-dirty, re-broadcast dependencies to the active outer watcher,
//! return the cached value.
//!
//! # Invariants
//!
//! 1. After any evaluation, the watcher's subscription set equals exactly the
//!    deps read during that evaluation; stale subscriptions are dropped.
//! 2. A lazy watcher's evaluator runs at most once between two dependency
//!    notifications, regardless of how often it is read in between.
//! 3. `version` increments by exactly 1 per evaluation.
//! 4. Evaluation runs with the watcher active on its context, so nested reads
//!    subscribe the innermost watcher; the prior active watcher is restored
//!    afterwards even on panic.
//!
//! # Failure Modes
//!
//! - **Evaluator panics**: the cached value and subscription set remain from
//!   the last completed evaluation; a lazy watcher stays dirty and retries on
//!   the next read.
//! - **Dependency cycle**: re-entering a watcher during its own evaluation
//!   panics with a diagnostic (see [`TrackCx`]).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ahash::AHashSet;
use tracing::trace;

use crate::cx::TrackCx;
use crate::dep::{Dep, Subscriber, next_id};

/// Shared interior for [`Watcher<T>`].
struct WatcherInner<T> {
    id: u64,
    cx: TrackCx,
    eval: Box<dyn Fn(&TrackCx) -> T>,
    lazy: bool,
    dirty: Cell<bool>,
    /// Bumped by exactly 1 per evaluation.
    version: Cell<u64>,
    value: RefCell<Option<T>>,
    /// Deps subscribed during the last completed evaluation.
    deps: RefCell<Vec<Dep>>,
    dep_ids: RefCell<AHashSet<u64>>,
    /// Deps collected by the evaluation currently in flight.
    new_deps: RefCell<Vec<Dep>>,
    new_dep_ids: RefCell<AHashSet<u64>>,
    this: Weak<WatcherInner<T>>,
}

/// One reactive computation with its own dependency set.
///
/// Cloning produces a second handle to the **same** watcher.
pub struct Watcher<T> {
    inner: Rc<WatcherInner<T>>,
}

impl<T> Clone for Watcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Watcher<T> {
    /// Create an eager watcher: evaluates now, re-evaluates on every notify.
    #[must_use]
    pub fn eager(cx: &TrackCx, eval: impl Fn(&TrackCx) -> T + 'static) -> Self {
        let watcher = Self::build(cx, eval, false);
        let value = watcher.inner.run();
        watcher.inner.value.replace(Some(value));
        watcher
    }

    /// Create a lazy watcher: starts dirty, evaluates only via
    /// [`evaluate`](Watcher::evaluate).
    #[must_use]
    pub fn lazy(cx: &TrackCx, eval: impl Fn(&TrackCx) -> T + 'static) -> Self {
        Self::build(cx, eval, true)
    }

    fn build(cx: &TrackCx, eval: impl Fn(&TrackCx) -> T + 'static, lazy: bool) -> Self {
        let cx = cx.clone();
        Self {
            inner: Rc::new_cyclic(|this| WatcherInner {
                id: next_id(),
                cx,
                eval: Box::new(eval),
                lazy,
                dirty: Cell::new(lazy),
                version: Cell::new(0),
                value: RefCell::new(None),
                deps: RefCell::new(Vec::new()),
                dep_ids: RefCell::new(AHashSet::new()),
                new_deps: RefCell::new(Vec::new()),
                new_dep_ids: RefCell::new(AHashSet::new()),
                this: this.clone(),
            }),
        }
    }

    /// Run the evaluator with this watcher active, cache the result, and
    /// clear the dirty flag.
    pub fn evaluate(&self) {
        let value = self.inner.run();
        self.inner.value.replace(Some(value));
        self.inner.dirty.set(false);
    }

    /// React to a dependency notification: eager watchers re-run, lazy
    /// watchers only go dirty.
    pub fn update(&self) {
        Subscriber::update(&*self.inner);
    }

    /// Re-broadcast: make every dep this watcher tracks also subscribe the
    /// currently active outer watcher.
    pub fn depend(&self) {
        let deps = self.inner.deps.borrow().clone();
        for dep in deps {
            dep.depend(&self.inner.cx);
        }
    }

    /// Cached value from the last evaluation, if any.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Number of deps subscribed by the last completed evaluation.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// Evaluation count since construction.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub(crate) fn cx(&self) -> &TrackCx {
        &self.inner.cx
    }
}

impl<T: Clone + 'static> WatcherInner<T> {
    fn run(&self) -> T {
        let this = self
            .this
            .upgrade()
            .expect("watcher interior outlives its own evaluation");
        let this: Rc<dyn Subscriber> = this;
        trace!(watcher = self.id, version = self.version.get() + 1, "evaluate");
        let value = self.cx.scoped(this, || (self.eval)(&self.cx));
        self.version.set(self.version.get() + 1);
        self.cleanup_deps();
        value
    }

    /// Swap in the freshly collected dep set and unsubscribe from deps the
    /// evaluation no longer read.
    fn cleanup_deps(&self) {
        {
            let new_ids = self.new_dep_ids.borrow();
            for dep in self.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(self.id);
                }
            }
        }
        let fresh_deps = std::mem::take(&mut *self.new_deps.borrow_mut());
        let fresh_ids = std::mem::take(&mut *self.new_dep_ids.borrow_mut());
        *self.deps.borrow_mut() = fresh_deps;
        *self.dep_ids.borrow_mut() = fresh_ids;
    }
}

impl<T: Clone + 'static> Subscriber for WatcherInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn update(&self) {
        if self.lazy {
            self.dirty.set(true);
        } else {
            let value = self.run();
            self.value.replace(Some(value));
        }
    }

    fn track_dep(&self, dep: &Dep) {
        let newly_seen = self.new_dep_ids.borrow_mut().insert(dep.id());
        if newly_seen {
            self.new_deps.borrow_mut().push(dep.clone());
            if !self.dep_ids.borrow().contains(&dep.id()) {
                let weak: Weak<dyn Subscriber> = self.this.clone();
                dep.add_sub(self.id, weak);
            }
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Watcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("lazy", &self.inner.lazy)
            .field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

/// A lazily-evaluated, memoized reactive value.
///
/// Reading via [`get`](Computed::get) follows the computed read contract:
/// evaluate if dirty, re-broadcast deps to the active outer watcher so
/// consumers transitively react to this value's own sources, then return the
/// cached value.
pub struct Computed<T> {
    watcher: Watcher<T>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            watcher: self.watcher.clone(),
        }
    }
}

impl<T: Clone + 'static> Computed<T> {
    #[must_use]
    pub fn new(cx: &TrackCx, compute: impl Fn(&TrackCx) -> T + 'static) -> Self {
        Self {
            watcher: Watcher::lazy(cx, compute),
        }
    }

    /// Current value, recomputing only if a dependency changed since the
    /// last read.
    #[must_use]
    pub fn get(&self) -> T {
        if self.watcher.is_dirty() {
            self.watcher.evaluate();
        }
        if self.watcher.cx().is_tracking() {
            self.watcher.depend();
        }
        self.watcher
            .value()
            .expect("computed holds a value after evaluation")
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    /// Force the next read to recompute.
    pub fn invalidate(&self) {
        self.watcher.inner.dirty.set(true);
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.watcher.version()
    }

    /// The underlying lazy watcher.
    #[must_use]
    pub fn watcher(&self) -> &Watcher<T> {
        &self.watcher
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("watcher", &self.watcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn eager_watcher_evaluates_at_construction() {
        let cx = TrackCx::new();
        let dep = Dep::new();
        let dep2 = dep.clone();
        let watcher = Watcher::eager(&cx, move |cx| {
            dep2.depend(cx);
            41 + 1
        });
        assert_eq!(watcher.value(), Some(42));
        assert_eq!(watcher.version(), 1);
        assert_eq!(watcher.dep_count(), 1);
        assert_eq!(dep.subscriber_count(), 1);
    }

    #[test]
    fn eager_watcher_reruns_on_notify() {
        let cx = TrackCx::new();
        let dep = Dep::new();
        let dep2 = dep.clone();
        let hits = Rc::new(Cell::new(0u32));
        let hits2 = Rc::clone(&hits);
        let watcher = Watcher::eager(&cx, move |cx| {
            dep2.depend(cx);
            hits2.set(hits2.get() + 1);
        });
        assert_eq!(hits.get(), 1);
        dep.notify();
        dep.notify();
        assert_eq!(hits.get(), 3);
        assert_eq!(watcher.version(), 3);
    }

    #[test]
    fn lazy_watcher_defers_and_memoizes() {
        let cx = TrackCx::new();
        let dep = Dep::new();
        let dep2 = dep.clone();
        let hits = Rc::new(Cell::new(0u32));
        let hits2 = Rc::clone(&hits);
        let computed = Computed::new(&cx, move |cx| {
            dep2.depend(cx);
            hits2.set(hits2.get() + 1);
            hits2.get()
        });
        // No evaluation at construction.
        assert_eq!(hits.get(), 0);
        assert!(computed.is_dirty());

        assert_eq!(computed.get(), 1);
        assert_eq!(computed.get(), 1);
        assert_eq!(hits.get(), 1);

        dep.notify();
        assert!(computed.is_dirty());
        assert_eq!(hits.get(), 1); // notify alone does not evaluate
        assert_eq!(computed.get(), 2);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn stale_subscriptions_are_dropped_on_reevaluation() {
        let cx = TrackCx::new();
        let left = Dep::new();
        let right = Dep::new();
        let use_left = Rc::new(Cell::new(true));

        let (l, r, flag) = (left.clone(), right.clone(), Rc::clone(&use_left));
        let watcher = Watcher::eager(&cx, move |cx| {
            if flag.get() {
                l.depend(cx);
            } else {
                r.depend(cx);
            }
        });
        assert_eq!(left.subscriber_count(), 1);
        assert_eq!(right.subscriber_count(), 0);

        use_left.set(false);
        watcher.update();
        assert_eq!(left.subscriber_count(), 0);
        assert_eq!(right.subscriber_count(), 1);
        assert_eq!(watcher.dep_count(), 1);
    }

    #[test]
    fn computed_rebroadcasts_deps_to_outer_watcher() {
        let cx = TrackCx::new();
        let source = Dep::new();
        let source2 = source.clone();
        let computed = Computed::new(&cx, move |cx| {
            source2.depend(cx);
            7
        });

        let reads = Rc::new(Cell::new(0u32));
        let (c, reads2) = (computed.clone(), Rc::clone(&reads));
        let _render = Watcher::eager(&cx, move |_cx| {
            reads2.set(reads2.get() + 1);
            c.get()
        });
        assert_eq!(reads.get(), 1);
        // The outer watcher never read `source` directly, yet mutating it
        // re-runs the outer watcher through the computed's re-broadcast.
        assert_eq!(source.subscriber_count(), 2);
        source.notify();
        assert_eq!(reads.get(), 2);
    }

    #[test]
    #[should_panic(expected = "dependency cycle")]
    fn self_read_during_evaluation_is_a_cycle() {
        let cx = TrackCx::new();
        let slot: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));
        let slot2 = Rc::clone(&slot);
        let computed = Computed::new(&cx, move |_cx| {
            slot2.borrow().as_ref().map_or(0, Computed::get)
        });
        slot.borrow_mut().replace(computed.clone());
        let _ = computed.get();
    }
}
