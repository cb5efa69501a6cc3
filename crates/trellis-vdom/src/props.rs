#![forbid(unsafe_code)]

//! Attribute and style maps, and the delta between two of them.

use ahash::AHashMap;

use crate::dom::{Document, NodeId};

/// Attributes plus inline style of an element or component node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    attrs: AHashMap<String, String>,
    style: AHashMap<String, String>,
}

impl Props {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn set_style(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.style.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn style(&self, name: &str) -> Option<&str> {
        self.style.get(name).map(String::as_str)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn styles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.style.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.style.is_empty()
    }
}

/// Apply the delta between `old` and `new` props to `el`.
///
/// Styles and attributes present only in `old` are removed, then everything
/// in `new` is set. The document skips journaling idempotent sets, so the
/// journal reflects the actual delta.
pub fn patch_props(doc: &Document, el: NodeId, old: &Props, new: &Props) {
    for (name, _) in old.styles() {
        if new.style(name).is_none() {
            doc.remove_style(el, name);
        }
    }
    for (name, _) in old.attrs() {
        if new.attr(name).is_none() {
            doc.remove_attr(el, name);
        }
    }
    for (name, value) in new.attrs() {
        doc.set_attr(el, name, value);
    }
    for (name, value) in new.styles() {
        doc.set_style(el, name, value);
    }
}
