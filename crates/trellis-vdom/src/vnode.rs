#![forbid(unsafe_code)]

//! Virtual nodes: the lightweight tree the diff runs over.
//!
//! A [`VNode`] is a cheap `Rc` handle. Three kinds exist: elements, text,
//! and components (a tag plus a construction hook invoked on first mount).
//! The bound real-node handle lives in a `Cell` and is assigned during
//! patching; it transfers from the old tree to the new tree exactly once per
//! patch when the two nodes are judged the *same*.
//!
//! Sameness is `(tag, key)` only — text nodes are tagless and always same —
//! so attribute or children differences drive the patch body, never a
//! wholesale replacement.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::{Document, NodeId};
use crate::error::PatchError;
use crate::props::Props;

/// Construction hook for component nodes: instantiates and mounts the
/// component, returning its real root.
pub type ConstructHook = Rc<dyn Fn(&Document) -> Result<NodeId, PatchError>>;

pub enum VNodeKind {
    Element {
        tag: String,
        key: Option<String>,
        props: Props,
        children: Vec<VNode>,
    },
    Text {
        text: String,
    },
    Component {
        tag: String,
        key: Option<String>,
        props: Props,
        hook: ConstructHook,
        /// First-mounted generation of this component. Transferred on every
        /// same-node patch so the hook's instance state stays alive across
        /// parent re-renders.
        retained: RefCell<Option<VNode>>,
    },
}

struct VNodeInner {
    kind: VNodeKind,
    el: Cell<Option<NodeId>>,
}

/// Handle to one virtual node.
#[derive(Clone)]
pub struct VNode {
    inner: Rc<VNodeInner>,
}

impl VNode {
    /// Start building an element node.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is empty — a tagless non-text node is malformed.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> ElementBuilder {
        let tag = tag.into();
        assert!(!tag.is_empty(), "element tag must be non-empty");
        ElementBuilder {
            tag,
            key: None,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> VNode {
        Self::from_kind(VNodeKind::Text { text: text.into() })
    }

    /// Start building a component node around a construction hook.
    ///
    /// # Panics
    ///
    /// Panics if `tag` is empty.
    #[must_use]
    pub fn component(
        tag: impl Into<String>,
        hook: impl Fn(&Document) -> Result<NodeId, PatchError> + 'static,
    ) -> ComponentBuilder {
        let tag = tag.into();
        assert!(!tag.is_empty(), "component tag must be non-empty");
        ComponentBuilder {
            tag,
            key: None,
            props: Props::new(),
            hook: Rc::new(hook),
        }
    }

    fn from_kind(kind: VNodeKind) -> VNode {
        VNode {
            inner: Rc::new(VNodeInner {
                kind,
                el: Cell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &VNodeKind {
        &self.inner.kind
    }

    /// Element or component tag; text nodes are tagless.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match &self.inner.kind {
            VNodeKind::Element { tag, .. } | VNodeKind::Component { tag, .. } => Some(tag),
            VNodeKind::Text { .. } => None,
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match &self.inner.kind {
            VNodeKind::Element { key, .. } | VNodeKind::Component { key, .. } => key.as_deref(),
            VNodeKind::Text { .. } => None,
        }
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.inner.kind, VNodeKind::Text { .. })
    }

    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match &self.inner.kind {
            VNodeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn props(&self) -> Option<&Props> {
        match &self.inner.kind {
            VNodeKind::Element { props, .. } | VNodeKind::Component { props, .. } => Some(props),
            VNodeKind::Text { .. } => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[VNode] {
        match &self.inner.kind {
            VNodeKind::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Bound real node, once mounted.
    #[must_use]
    pub fn el(&self) -> Option<NodeId> {
        self.inner.el.get()
    }

    pub(crate) fn set_el(&self, el: NodeId) {
        self.inner.el.set(Some(el));
    }

    /// Two handles to the same underlying node.
    #[must_use]
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for VNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner.kind {
            VNodeKind::Element { tag, key, children, .. } => f
                .debug_struct("VNode::Element")
                .field("tag", tag)
                .field("key", key)
                .field("children", &children.len())
                .field("el", &self.inner.el.get())
                .finish(),
            VNodeKind::Text { text } => f
                .debug_struct("VNode::Text")
                .field("text", text)
                .field("el", &self.inner.el.get())
                .finish(),
            VNodeKind::Component { tag, key, .. } => f
                .debug_struct("VNode::Component")
                .field("tag", tag)
                .field("key", key)
                .field("el", &self.inner.el.get())
                .finish(),
        }
    }
}

/// Same-node test: `(tag, key)` both match, kinds agree.
///
/// Eligibility for in-place reuse — nothing more. Differing attributes,
/// styles, text, or children never make two nodes "different".
#[must_use]
pub fn is_same_vnode(a: &VNode, b: &VNode) -> bool {
    match (&a.inner.kind, &b.inner.kind) {
        (VNodeKind::Text { .. }, VNodeKind::Text { .. }) => true,
        (
            VNodeKind::Element { .. },
            VNodeKind::Element { .. },
        )
        | (
            VNodeKind::Component { .. },
            VNodeKind::Component { .. },
        ) => a.tag() == b.tag() && a.key() == b.key(),
        _ => false,
    }
}

/// Builder for element nodes.
pub struct ElementBuilder {
    tag: String,
    key: Option<String>,
    props: Props,
    children: Vec<VNode>,
}

impl ElementBuilder {
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.set_style(name, value);
        self
    }

    #[must_use]
    pub fn child(mut self, child: VNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn build(self) -> VNode {
        VNode::from_kind(VNodeKind::Element {
            tag: self.tag,
            key: self.key,
            props: self.props,
            children: self.children,
        })
    }
}

/// Builder for component nodes.
pub struct ComponentBuilder {
    tag: String,
    key: Option<String>,
    props: Props,
    hook: ConstructHook,
}

impl ComponentBuilder {
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn build(self) -> VNode {
        VNode::from_kind(VNodeKind::Component {
            tag: self.tag,
            key: self.key,
            props: self.props,
            hook: self.hook,
            retained: RefCell::new(None),
        })
    }
}
