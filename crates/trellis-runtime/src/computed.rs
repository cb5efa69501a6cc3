#![forbid(unsafe_code)]

//! Named computed properties.
//!
//! Each property is a lazy watcher over the app's reactive state. Reading
//! one through the registry follows the computed read contract: evaluate if
//! dirty, re-broadcast its deps to the active outer watcher, return the
//! cached value — so a render that reads a computed re-runs when the
//! computed's own sources change, while the compute function itself runs at
//! most once between source mutations.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use trellis_reactive::{Computed, Scalar, TrackCx};

/// Registry of named computed properties.
#[derive(Clone, Default)]
pub struct ComputedRegistry {
    entries: Rc<RefCell<AHashMap<String, Computed<Scalar>>>>,
}

impl ComputedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a computed property. Replaces any previous definition under
    /// the same name.
    pub fn define(
        &self,
        cx: &TrackCx,
        name: impl Into<String>,
        compute: impl Fn(&TrackCx) -> Scalar + 'static,
    ) {
        self.entries
            .borrow_mut()
            .insert(name.into(), Computed::new(cx, compute));
    }

    /// Read a computed property by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Scalar> {
        let computed = self.entries.borrow().get(name).cloned()?;
        Some(computed.get())
    }

    #[must_use]
    pub fn is_dirty(&self, name: &str) -> Option<bool> {
        self.entries
            .borrow()
            .get(name)
            .map(trellis_reactive::Computed::is_dirty)
    }

    /// Evaluation count of one property.
    #[must_use]
    pub fn version(&self, name: &str) -> Option<u64> {
        self.entries
            .borrow()
            .get(name)
            .map(trellis_reactive::Computed::version)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl std::fmt::Debug for ComputedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_reactive::{ReactiveMap, Watcher};

    #[test]
    fn computed_is_cached_between_source_changes() {
        let cx = TrackCx::new();
        let state = ReactiveMap::new();
        state.define("n", 2i64);

        let registry = ComputedRegistry::new();
        let s = state.clone();
        registry.define(&cx, "double", move |cx| {
            match s.get(cx, "n").and_then(|v| v.as_scalar().cloned()) {
                Some(Scalar::Int(n)) => Scalar::Int(n * 2),
                _ => Scalar::Null,
            }
        });

        assert_eq!(registry.get("double"), Some(Scalar::Int(4)));
        assert_eq!(registry.get("double"), Some(Scalar::Int(4)));
        assert_eq!(registry.version("double"), Some(1));

        state.set("n", 5i64).expect("reactive key");
        assert_eq!(registry.is_dirty("double"), Some(true));
        assert_eq!(registry.get("double"), Some(Scalar::Int(10)));
        assert_eq!(registry.version("double"), Some(2));
    }

    #[test]
    fn outer_watcher_reacts_through_the_computed() {
        let cx = TrackCx::new();
        let state = ReactiveMap::new();
        state.define("n", 1i64);

        let registry = ComputedRegistry::new();
        let s = state.clone();
        registry.define(&cx, "double", move |cx| {
            match s.get(cx, "n").and_then(|v| v.as_scalar().cloned()) {
                Some(Scalar::Int(n)) => Scalar::Int(n * 2),
                _ => Scalar::Null,
            }
        });

        let r = registry.clone();
        let outer = Watcher::eager(&cx, move |_cx| r.get("double"));
        assert_eq!(outer.value(), Some(Some(Scalar::Int(2))));

        state.set("n", 3i64).expect("reactive key");
        assert_eq!(outer.value(), Some(Some(Scalar::Int(6))));
    }
}
