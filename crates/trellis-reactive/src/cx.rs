#![forbid(unsafe_code)]

//! Tracking context (`TrackCx`) for scoped dependency collection.
//!
//! `TrackCx` is a lightweight handle threaded through every reactive read and
//! every watcher evaluation. It replaces a process-global "current watcher"
//! slot with an explicit, stack-disciplined context:
//!
//! - **Scoped activation**: [`scoped`](TrackCx::scoped) pushes a watcher onto
//!   the active stack for the duration of one evaluation and restores the
//!   previous state afterwards, including on panic.
//! - **Nested evaluation**: a computed read inside a render evaluation pushes
//!   a second frame; reads always track against the innermost active watcher.
//! - **Cycle detection**: pushing a watcher that is already on the stack is a
//!   dependency cycle. The context fails fast with a diagnostic instead of
//!   letting the evaluation recurse until the stack overflows.
//!
//! # Invariants
//!
//! 1. The stack depth after `scoped` returns equals the depth before the
//!    call, regardless of success or panic.
//! 2. [`active`](TrackCx::active) always returns the innermost watcher.
//! 3. A watcher id appears at most once on the stack at any instant.
//!
//! `TrackCx` is cheaply cloneable (`Rc` inside); clones share one stack.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dep::Subscriber;

/// Shared, clone-cheap evaluation context.
#[derive(Clone, Default)]
pub struct TrackCx {
    inner: Rc<CxInner>,
}

#[derive(Default)]
struct CxInner {
    active: RefCell<Vec<Rc<dyn Subscriber>>>,
}

impl TrackCx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Innermost active watcher, if an evaluation is in progress.
    pub(crate) fn active(&self) -> Option<Rc<dyn Subscriber>> {
        self.inner.active.borrow().last().cloned()
    }

    /// Whether any watcher is currently evaluating on this context.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        !self.inner.active.borrow().is_empty()
    }

    /// Current evaluation nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.active.borrow().len()
    }

    /// Run `f` with `watcher` as the innermost active watcher.
    ///
    /// The previous active watcher is restored when `f` returns or unwinds.
    ///
    /// # Panics
    ///
    /// Panics with a dependency-cycle diagnostic if `watcher` is already on
    /// the active stack.
    pub(crate) fn scoped<R>(&self, watcher: Rc<dyn Subscriber>, f: impl FnOnce() -> R) -> R {
        let id = watcher.id();
        {
            let active = self.inner.active.borrow();
            assert!(
                !active.iter().any(|w| w.id() == id),
                "dependency cycle: watcher {id} re-entered during its own evaluation (depth {})",
                active.len()
            );
        }
        self.inner.active.borrow_mut().push(watcher);
        let _guard = ScopeGuard {
            active: &self.inner.active,
        };
        f()
    }
}

impl std::fmt::Debug for TrackCx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackCx")
            .field("depth", &self.depth())
            .finish()
    }
}

/// Pops the active stack on drop, so unwinding restores the outer watcher.
struct ScopeGuard<'a> {
    active: &'a RefCell<Vec<Rc<dyn Subscriber>>>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.active.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dep::Dep;

    struct Probe {
        id: u64,
    }

    impl Subscriber for Probe {
        fn id(&self) -> u64 {
            self.id
        }
        fn update(&self) {}
        fn track_dep(&self, _dep: &Dep) {}
    }

    #[test]
    fn scoped_restores_depth() {
        let cx = TrackCx::new();
        assert!(!cx.is_tracking());
        cx.scoped(Rc::new(Probe { id: 1 }), || {
            assert_eq!(cx.depth(), 1);
            cx.scoped(Rc::new(Probe { id: 2 }), || {
                assert_eq!(cx.depth(), 2);
                assert_eq!(cx.active().map(|w| w.id()), Some(2));
            });
            assert_eq!(cx.active().map(|w| w.id()), Some(1));
        });
        assert_eq!(cx.depth(), 0);
    }

    #[test]
    fn scoped_restores_depth_on_panic() {
        let cx = TrackCx::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cx.scoped(Rc::new(Probe { id: 7 }), || panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(cx.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "dependency cycle")]
    fn reentering_active_watcher_is_a_cycle() {
        let cx = TrackCx::new();
        cx.scoped(Rc::new(Probe { id: 3 }), || {
            cx.scoped(Rc::new(Probe { id: 3 }), || {});
        });
    }
}
