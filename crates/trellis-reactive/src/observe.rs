#![forbid(unsafe_code)]

//! Reactive containers: plain data wrapped into observable state.
//!
//! [`observe`] converts plain data (anything that converts to [`Reactive`],
//! including `serde_json::Value`) into reactive form. Scalars pass through
//! untouched; objects become [`ReactiveMap`]s and arrays become
//! [`ReactiveList`]s, recursively.
//!
//! Containers are explicit wrapper types rather than instrumented plain
//! values: their accessors are the sole read path and their mutators are the
//! sole mutation path. The wrapper handle itself is the identity — cloning
//! shares the same interior, re-observing a `Reactive` returns the same
//! handle, and no marker field is visible on the data.
//!
//! # Invariants
//!
//! 1. Wrapping is idempotent: observing an already-reactive value yields the
//!    same wrapper.
//! 2. Nested containers are wrapped at wrap-time and on every reassignment.
//! 3. Writing a value equal to the current one (scalars by value, containers
//!    by handle identity) performs zero notifications.
//! 4. Every mutating list operation observes inserted elements and notifies
//!    the list's identity dep exactly once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::trace;

use crate::cx::TrackCx;
use crate::dep::Dep;
use crate::error::ReactiveError;

// ─── Scalars ─────────────────────────────────────────────────────────────────

/// Leaf value of the reactive data model.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

// ─── Reactive handles ────────────────────────────────────────────────────────

/// A reactive value: a scalar leaf or a shared container handle.
#[derive(Debug, Clone)]
pub enum Reactive {
    Leaf(Scalar),
    Map(ReactiveMap),
    List(ReactiveList),
}

impl Reactive {
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Reactive::Leaf(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&ReactiveMap> {
        match self {
            Reactive::Map(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&ReactiveList> {
        match self {
            Reactive::List(l) => Some(l),
            _ => None,
        }
    }

    /// Identity dep of a container value, if any.
    fn identity_dep(&self) -> Option<&Dep> {
        match self {
            Reactive::Leaf(_) => None,
            Reactive::Map(m) => Some(&m.inner.dep),
            Reactive::List(l) => Some(&l.inner.dep),
        }
    }
}

/// Leaves compare by value, containers by handle identity.
impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Reactive::Leaf(a), Reactive::Leaf(b)) => a == b,
            (Reactive::Map(a), Reactive::Map(b)) => Rc::ptr_eq(&a.inner, &b.inner),
            (Reactive::List(a), Reactive::List(b)) => Rc::ptr_eq(&a.inner, &b.inner),
            _ => false,
        }
    }
}

impl From<Scalar> for Reactive {
    fn from(value: Scalar) -> Self {
        Reactive::Leaf(value)
    }
}

impl From<bool> for Reactive {
    fn from(value: bool) -> Self {
        Reactive::Leaf(value.into())
    }
}

impl From<i64> for Reactive {
    fn from(value: i64) -> Self {
        Reactive::Leaf(value.into())
    }
}

impl From<i32> for Reactive {
    fn from(value: i32) -> Self {
        Reactive::Leaf(value.into())
    }
}

impl From<f64> for Reactive {
    fn from(value: f64) -> Self {
        Reactive::Leaf(value.into())
    }
}

impl From<&str> for Reactive {
    fn from(value: &str) -> Self {
        Reactive::Leaf(value.into())
    }
}

impl From<String> for Reactive {
    fn from(value: String) -> Self {
        Reactive::Leaf(value.into())
    }
}

impl From<ReactiveMap> for Reactive {
    fn from(value: ReactiveMap) -> Self {
        Reactive::Map(value)
    }
}

impl From<ReactiveList> for Reactive {
    fn from(value: ReactiveList) -> Self {
        Reactive::List(value)
    }
}

impl From<serde_json::Value> for Reactive {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Reactive::Leaf(Scalar::Null),
            serde_json::Value::Bool(b) => Reactive::Leaf(Scalar::Bool(b)),
            serde_json::Value::Number(n) => Reactive::Leaf(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => n.as_f64().map_or(Scalar::Null, Scalar::Float),
            }),
            serde_json::Value::String(s) => Reactive::Leaf(Scalar::Str(s)),
            serde_json::Value::Array(items) => {
                Reactive::List(ReactiveList::from_values(items.into_iter().map(Reactive::from)))
            }
            serde_json::Value::Object(fields) => {
                let map = ReactiveMap::new();
                for (key, value) in fields {
                    map.define(key, Reactive::from(value));
                }
                Reactive::Map(map)
            }
        }
    }
}

/// Wrap plain data into reactive form.
///
/// Scalars are a defined no-op; arrays and objects wrap recursively. Passing
/// an already-reactive value returns it unchanged (idempotent).
#[must_use]
pub fn observe(value: impl Into<Reactive>) -> Reactive {
    value.into()
}

// ─── ReactiveMap ─────────────────────────────────────────────────────────────

struct MapEntry {
    dep: Dep,
    value: RefCell<Reactive>,
}

struct MapInner {
    /// Identity dep: notified on key insert/remove, tracked by structural
    /// reads and by readers of this map as a nested value.
    dep: Dep,
    entries: RefCell<AHashMap<String, MapEntry>>,
}

/// Reactive mapping with one dep per key plus an identity dep.
#[derive(Clone)]
pub struct ReactiveMap {
    inner: Rc<MapInner>,
}

impl ReactiveMap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(MapInner {
                dep: Dep::new(),
                entries: RefCell::new(AHashMap::new()),
            }),
        }
    }

    /// Tracked read. Subscribes the active watcher to the key's dep, and to
    /// the identity dep of a nested container value so structural mutations
    /// of the child re-run the reader.
    #[must_use]
    pub fn get(&self, cx: &TrackCx, key: &str) -> Option<Reactive> {
        let entries = self.inner.entries.borrow();
        let entry = entries.get(key)?;
        entry.dep.depend(cx);
        let value = entry.value.borrow().clone();
        if let Some(child) = value.identity_dep() {
            child.depend(cx);
        }
        Some(value)
    }

    /// Untracked read.
    #[must_use]
    pub fn get_untracked(&self, key: &str) -> Option<Reactive> {
        let entries = self.inner.entries.borrow();
        entries.get(key).map(|entry| entry.value.borrow().clone())
    }

    /// Write an existing reactive key.
    ///
    /// No-op (zero notifications) when the new value equals the current one.
    /// Otherwise the new value is observed and the key's dep is notified.
    /// Unknown keys are an error; [`define`](ReactiveMap::define) is the
    /// explicit escape hatch for adding reactive keys.
    pub fn set(&self, key: &str, value: impl Into<Reactive>) -> Result<(), ReactiveError> {
        let value = observe(value);
        let dep = {
            let entries = self.inner.entries.borrow();
            let Some(entry) = entries.get(key) else {
                return Err(ReactiveError::UnknownKey {
                    key: key.to_owned(),
                });
            };
            if *entry.value.borrow() == value {
                return Ok(());
            }
            *entry.value.borrow_mut() = value;
            entry.dep.clone()
        };
        dep.notify();
        Ok(())
    }

    /// Install a reactive key.
    ///
    /// New keys get their own dep and notify the map's identity dep; existing
    /// keys keep their dep and behave like [`set`](ReactiveMap::set).
    pub fn define(&self, key: impl Into<String>, value: impl Into<Reactive>) {
        let key = key.into();
        let value = observe(value);
        trace!(key = %key, "define reactive key");
        enum Outcome {
            Added(Dep),
            Changed(Dep),
            Unchanged,
        }
        let outcome = {
            let mut entries = self.inner.entries.borrow_mut();
            match entries.entry(key) {
                std::collections::hash_map::Entry::Occupied(slot) => {
                    let entry = slot.get();
                    if *entry.value.borrow() == value {
                        Outcome::Unchanged
                    } else {
                        *entry.value.borrow_mut() = value;
                        Outcome::Changed(entry.dep.clone())
                    }
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(MapEntry {
                        dep: Dep::new(),
                        value: RefCell::new(value),
                    });
                    Outcome::Added(self.inner.dep.clone())
                }
            }
        };
        match outcome {
            Outcome::Added(dep) | Outcome::Changed(dep) => dep.notify(),
            Outcome::Unchanged => {}
        }
    }

    /// Remove a reactive key, notifying its dep and the identity dep.
    pub fn remove(&self, key: &str) -> Option<Reactive> {
        let entry = self.inner.entries.borrow_mut().remove(key)?;
        let value = entry.value.into_inner();
        entry.dep.notify();
        self.inner.dep.notify();
        Some(value)
    }

    /// Tracked structural read: key set, sorted for determinism.
    #[must_use]
    pub fn keys(&self, cx: &TrackCx) -> Vec<String> {
        self.inner.dep.depend(cx);
        let mut keys: Vec<String> = self.inner.entries.borrow().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Tracked structural read.
    #[must_use]
    pub fn len(&self, cx: &TrackCx) -> usize {
        self.inner.dep.depend(cx);
        self.inner.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self, cx: &TrackCx) -> bool {
        self.len(cx) == 0
    }

    /// Tracked structural read.
    #[must_use]
    pub fn contains_key(&self, cx: &TrackCx, key: &str) -> bool {
        self.inner.dep.depend(cx);
        self.inner.entries.borrow().contains_key(key)
    }

    /// Dep of one key, if reactive. Mostly useful for tests and diagnostics.
    #[must_use]
    pub fn key_dep(&self, key: &str) -> Option<Dep> {
        self.inner
            .entries
            .borrow()
            .get(key)
            .map(|entry| entry.dep.clone())
    }

    /// The map's identity dep.
    #[must_use]
    pub fn identity_dep(&self) -> Dep {
        self.inner.dep.clone()
    }
}

impl Default for ReactiveMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReactiveMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.inner.entries.borrow();
        f.debug_struct("ReactiveMap")
            .field("len", &entries.len())
            .finish()
    }
}

// ─── ReactiveList ────────────────────────────────────────────────────────────

struct ListInner {
    /// Identity dep: one per list, notified by every mutating operation.
    dep: Dep,
    items: RefCell<Vec<Reactive>>,
}

/// Reactive sequence whose mutating operations are the sole mutation path.
#[derive(Clone)]
pub struct ReactiveList {
    inner: Rc<ListInner>,
}

impl ReactiveList {
    #[must_use]
    pub fn new() -> Self {
        Self::from_values(std::iter::empty())
    }

    /// Build from values, observing each element.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Reactive>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                dep: Dep::new(),
                items: RefCell::new(values.into_iter().map(observe).collect()),
            }),
        }
    }

    /// Tracked read of one element.
    #[must_use]
    pub fn get(&self, cx: &TrackCx, index: usize) -> Option<Reactive> {
        self.inner.dep.depend(cx);
        let value = self.inner.items.borrow().get(index).cloned()?;
        if let Some(child) = value.identity_dep() {
            child.depend(cx);
        }
        Some(value)
    }

    /// Untracked read of one element.
    #[must_use]
    pub fn get_untracked(&self, index: usize) -> Option<Reactive> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// Tracked length read.
    #[must_use]
    pub fn len(&self, cx: &TrackCx) -> usize {
        self.inner.dep.depend(cx);
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self, cx: &TrackCx) -> bool {
        self.len(cx) == 0
    }

    /// Tracked snapshot of all elements.
    #[must_use]
    pub fn to_vec(&self, cx: &TrackCx) -> Vec<Reactive> {
        self.inner.dep.depend(cx);
        self.inner.items.borrow().clone()
    }

    /// Replace one element. Equality short-circuits; otherwise the new value
    /// is observed and the identity dep notified.
    pub fn set(&self, index: usize, value: impl Into<Reactive>) -> Result<(), ReactiveError> {
        let value = observe(value);
        {
            let items = self.inner.items.borrow();
            let len = items.len();
            let Some(current) = items.get(index) else {
                return Err(ReactiveError::IndexOutOfBounds { index, len });
            };
            if *current == value {
                return Ok(());
            }
        }
        self.inner.items.borrow_mut()[index] = value;
        self.inner.dep.notify();
        Ok(())
    }

    pub fn push(&self, value: impl Into<Reactive>) {
        self.inner.items.borrow_mut().push(observe(value));
        self.inner.dep.notify();
    }

    pub fn pop(&self) -> Option<Reactive> {
        let popped = self.inner.items.borrow_mut().pop();
        self.inner.dep.notify();
        popped
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Reactive> {
        let first = {
            let mut items = self.inner.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.inner.dep.notify();
        first
    }

    /// Insert at the front.
    pub fn unshift(&self, value: impl Into<Reactive>) {
        self.inner.items.borrow_mut().insert(0, observe(value));
        self.inner.dep.notify();
    }

    /// Remove `delete_count` elements at `start` (both clamped to the list)
    /// and insert `items` in their place. Returns the removed elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Reactive>,
    ) -> Vec<Reactive> {
        let removed = {
            let mut current = self.inner.items.borrow_mut();
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current
                .splice(start..end, items.into_iter().map(observe))
                .collect()
        };
        self.inner.dep.notify();
        removed
    }

    /// Sort in place with a comparator.
    ///
    /// The comparator must not read or mutate this list.
    pub fn sort_by(&self, compare: impl FnMut(&Reactive, &Reactive) -> std::cmp::Ordering) {
        self.inner.items.borrow_mut().sort_by(compare);
        self.inner.dep.notify();
    }

    pub fn reverse(&self) {
        self.inner.items.borrow_mut().reverse();
        self.inner.dep.notify();
    }

    /// The list's identity dep.
    #[must_use]
    pub fn identity_dep(&self) -> Dep {
        self.inner.dep.clone()
    }
}

impl Default for ReactiveList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReactiveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveList")
            .field("len", &self.inner.items.borrow().len())
            .finish()
    }
}
