#![forbid(unsafe_code)]

//! In-memory document: the real-node tree the patch engine mutates.
//!
//! [`Document`] is an arena of [`NodeId`]-addressed nodes behind a shared,
//! clone-cheap handle (`Rc<RefCell<..>>`). Every operation borrows the
//! interior only for its own duration, so nested mounts (component
//! construction hooks running mid-patch) never contend for a long-lived
//! borrow.
//!
//! Every mutation is appended to a journal of [`DomOp`]s, drained via
//! [`take_ops`](Document::take_ops). The journal is how tests assert that a
//! patch produced the *minimal* set of mutations — mounts, moves, and
//! removals are distinct ops.
//!
//! # Invariants
//!
//! 1. A node has at most one parent; inserting an attached node detaches it
//!    first (one journal entry: `Move`, not `Remove` + `Insert`).
//! 2. Sibling order in `children` is the document order.
//! 3. Idempotent attribute/style/text writes are not journaled.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use ahash::AHashMap;
use smallvec::SmallVec;

/// Handle to one real node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One journaled document mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomOp {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    /// First attachment of a node.
    Insert {
        node: NodeId,
        parent: NodeId,
        anchor: Option<NodeId>,
    },
    /// Re-attachment of a node that was already in the tree.
    Move {
        node: NodeId,
        parent: NodeId,
        anchor: Option<NodeId>,
    },
    Remove { node: NodeId },
    Replace { old: NodeId, new: NodeId },
    SetText { node: NodeId, text: String },
    SetAttr { node: NodeId, name: String, value: String },
    RemoveAttr { node: NodeId, name: String },
    SetStyle { node: NodeId, name: String, value: String },
    RemoveStyle { node: NodeId, name: String },
    ClearChildren { node: NodeId },
}

enum Payload {
    Element {
        tag: String,
        attrs: AHashMap<String, String>,
        style: AHashMap<String, String>,
        children: SmallVec<[NodeId; 8]>,
    },
    Text(String),
}

struct RealNode {
    parent: Option<NodeId>,
    payload: Payload,
}

struct DocInner {
    nodes: Vec<RealNode>,
    ops: Vec<DomOp>,
}

/// Shared in-memory document.
///
/// `Document::new()` seeds a root element (`body`) that mount points hang
/// off; it is always attached and never removed.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocInner>>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        let root = RealNode {
            parent: None,
            payload: Payload::Element {
                tag: "body".to_owned(),
                attrs: AHashMap::new(),
                style: AHashMap::new(),
                children: SmallVec::new(),
            },
        };
        Self {
            inner: Rc::new(RefCell::new(DocInner {
                nodes: vec![root],
                ops: Vec::new(),
            })),
        }
    }

    /// The document's root element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    // ── Construction ────────────────────────────────────────────────────

    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        let tag = tag.into();
        assert!(!tag.is_empty(), "element tag must be non-empty");
        let mut doc = self.inner.borrow_mut();
        let id = NodeId(doc.nodes.len() as u32);
        doc.nodes.push(RealNode {
            parent: None,
            payload: Payload::Element {
                tag: tag.clone(),
                attrs: AHashMap::new(),
                style: AHashMap::new(),
                children: SmallVec::new(),
            },
        });
        doc.ops.push(DomOp::CreateElement { node: id, tag });
        id
    }

    pub fn create_text(&self, text: impl Into<String>) -> NodeId {
        let text = text.into();
        let mut doc = self.inner.borrow_mut();
        let id = NodeId(doc.nodes.len() as u32);
        doc.nodes.push(RealNode {
            parent: None,
            payload: Payload::Text(text.clone()),
        });
        doc.ops.push(DomOp::CreateText { node: id, text });
        id
    }

    // ── Tree mutation ───────────────────────────────────────────────────

    /// Insert `node` under `parent` just before `anchor` (append when
    /// `anchor` is `None`). An already-attached node is moved.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is a text node or `anchor` is not a child of
    /// `parent`.
    pub fn insert_before(&self, parent: NodeId, node: NodeId, anchor: Option<NodeId>) {
        let mut doc = self.inner.borrow_mut();
        let was_attached = doc.nodes[node.index()].parent.is_some();
        detach(&mut doc, node);
        doc.nodes[node.index()].parent = Some(parent);
        let children = element_children_mut(&mut doc, parent);
        let at = match anchor {
            Some(anchor) => children
                .iter()
                .position(|&child| child == anchor)
                .expect("anchor is a child of parent"),
            None => children.len(),
        };
        children.insert(at, node);
        doc.ops.push(if was_attached {
            DomOp::Move {
                node,
                parent,
                anchor,
            }
        } else {
            DomOp::Insert {
                node,
                parent,
                anchor,
            }
        });
    }

    pub fn append(&self, parent: NodeId, node: NodeId) {
        self.insert_before(parent, node, None);
    }

    /// Detach `node` from its parent. No-op when already detached.
    pub fn remove(&self, node: NodeId) {
        let mut doc = self.inner.borrow_mut();
        if doc.nodes[node.index()].parent.is_some() {
            detach(&mut doc, node);
            doc.nodes[node.index()].parent = None;
            doc.ops.push(DomOp::Remove { node });
        }
    }

    /// Replace attached `old` with `new` in place.
    ///
    /// # Panics
    ///
    /// Panics if `old` is detached.
    pub fn replace(&self, old: NodeId, new: NodeId) {
        let mut doc = self.inner.borrow_mut();
        let parent = doc.nodes[old.index()]
            .parent
            .expect("replace target is attached");
        detach(&mut doc, new);
        let children = element_children_mut(&mut doc, parent);
        let at = children
            .iter()
            .position(|&child| child == old)
            .expect("attached node is among its parent's children");
        children[at] = new;
        doc.nodes[old.index()].parent = None;
        doc.nodes[new.index()].parent = Some(parent);
        doc.ops.push(DomOp::Replace { old, new });
    }

    /// Detach every child of `node`.
    pub fn clear_children(&self, node: NodeId) {
        let mut doc = self.inner.borrow_mut();
        let children: Vec<NodeId> = element_children_mut(&mut doc, node).drain(..).collect();
        for child in children {
            doc.nodes[child.index()].parent = None;
        }
        doc.ops.push(DomOp::ClearChildren { node });
    }

    // ── Content mutation ────────────────────────────────────────────────

    /// # Panics
    ///
    /// Panics if `node` is not a text node.
    pub fn set_text(&self, node: NodeId, text: impl Into<String>) {
        let text = text.into();
        let mut doc = self.inner.borrow_mut();
        match &mut doc.nodes[node.index()].payload {
            Payload::Text(current) => {
                if *current == text {
                    return;
                }
                *current = text.clone();
            }
            Payload::Element { .. } => panic!("set_text target is a text node"),
        }
        doc.ops.push(DomOp::SetText { node, text });
    }

    pub fn set_attr(&self, node: NodeId, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        let mut doc = self.inner.borrow_mut();
        let attrs = element_attrs_mut(&mut doc, node);
        if attrs.get(&name).is_some_and(|current| *current == value) {
            return;
        }
        attrs.insert(name.clone(), value.clone());
        doc.ops.push(DomOp::SetAttr { node, name, value });
    }

    pub fn remove_attr(&self, node: NodeId, name: &str) {
        let mut doc = self.inner.borrow_mut();
        if element_attrs_mut(&mut doc, node).remove(name).is_some() {
            doc.ops.push(DomOp::RemoveAttr {
                node,
                name: name.to_owned(),
            });
        }
    }

    pub fn set_style(&self, node: NodeId, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        let mut doc = self.inner.borrow_mut();
        let style = element_style_mut(&mut doc, node);
        if style.get(&name).is_some_and(|current| *current == value) {
            return;
        }
        style.insert(name.clone(), value.clone());
        doc.ops.push(DomOp::SetStyle { node, name, value });
    }

    pub fn remove_style(&self, node: NodeId, name: &str) {
        let mut doc = self.inner.borrow_mut();
        if element_style_mut(&mut doc, node).remove(name).is_some() {
            doc.ops.push(DomOp::RemoveStyle {
                node,
                name: name.to_owned(),
            });
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().nodes[node.index()].parent
    }

    #[must_use]
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let doc = self.inner.borrow();
        let parent = doc.nodes[node.index()].parent?;
        let Payload::Element { children, .. } = &doc.nodes[parent.index()].payload else {
            return None;
        };
        let at = children.iter().position(|&child| child == node)?;
        children.get(at + 1).copied()
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        match &self.inner.borrow().nodes[node.index()].payload {
            Payload::Element { children, .. } => children.to_vec(),
            Payload::Text(_) => Vec::new(),
        }
    }

    #[must_use]
    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.inner.borrow().nodes[node.index()].payload,
            Payload::Text(_)
        )
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        match &self.inner.borrow().nodes[node.index()].payload {
            Payload::Element { tag, .. } => Some(tag.clone()),
            Payload::Text(_) => None,
        }
    }

    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<String> {
        match &self.inner.borrow().nodes[node.index()].payload {
            Payload::Text(text) => Some(text.clone()),
            Payload::Element { .. } => None,
        }
    }

    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.inner.borrow().nodes[node.index()].payload {
            Payload::Element { attrs, .. } => attrs.get(name).cloned(),
            Payload::Text(_) => None,
        }
    }

    #[must_use]
    pub fn style(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.inner.borrow().nodes[node.index()].payload {
            Payload::Element { style, .. } => style.get(name).cloned(),
            Payload::Text(_) => None,
        }
    }

    /// Total number of nodes ever created (the arena never reclaims).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    /// Drain the mutation journal.
    #[must_use]
    pub fn take_ops(&self) -> Vec<DomOp> {
        std::mem::take(&mut self.inner.borrow_mut().ops)
    }

    /// Serialize a subtree, attributes and styles in sorted order.
    #[must_use]
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(&mut out, node);
        out
    }

    fn write_html(&self, out: &mut String, node: NodeId) {
        enum Snapshot {
            Text(String),
            Element {
                tag: String,
                attrs: Vec<(String, String)>,
                style: Vec<(String, String)>,
                children: Vec<NodeId>,
            },
        }
        let snapshot = {
            let doc = self.inner.borrow();
            match &doc.nodes[node.index()].payload {
                Payload::Text(text) => Snapshot::Text(text.clone()),
                Payload::Element {
                    tag,
                    attrs,
                    style,
                    children,
                } => {
                    let mut attrs: Vec<(String, String)> =
                        attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    attrs.sort_unstable();
                    let mut style: Vec<(String, String)> =
                        style.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    style.sort_unstable();
                    Snapshot::Element {
                        tag: tag.clone(),
                        attrs,
                        style,
                        children: children.to_vec(),
                    }
                }
            }
        };
        match snapshot {
            Snapshot::Text(text) => out.push_str(&text),
            Snapshot::Element {
                tag,
                attrs,
                style,
                children,
            } => {
                let _ = write!(out, "<{tag}");
                for (name, value) in &attrs {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                if !style.is_empty() {
                    out.push_str(" style=\"");
                    for (name, value) in &style {
                        let _ = write!(out, "{name}:{value};");
                    }
                    out.push('"');
                }
                out.push('>');
                for child in children {
                    self.write_html(out, child);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("pending_ops", &self.inner.borrow().ops.len())
            .finish()
    }
}

/// Remove `node` from its current parent's child list, if attached.
/// Does not touch `node.parent` and journals nothing.
fn detach(doc: &mut DocInner, node: NodeId) {
    if let Some(parent) = doc.nodes[node.index()].parent {
        if let Payload::Element { children, .. } = &mut doc.nodes[parent.index()].payload {
            children.retain(|child| *child != node);
        }
    }
}

fn element_children_mut(doc: &mut DocInner, node: NodeId) -> &mut SmallVec<[NodeId; 8]> {
    match &mut doc.nodes[node.index()].payload {
        Payload::Element { children, .. } => children,
        Payload::Text(_) => panic!("text nodes have no children"),
    }
}

fn element_attrs_mut(doc: &mut DocInner, node: NodeId) -> &mut AHashMap<String, String> {
    match &mut doc.nodes[node.index()].payload {
        Payload::Element { attrs, .. } => attrs,
        Payload::Text(_) => panic!("text nodes have no attributes"),
    }
}

fn element_style_mut(doc: &mut DocInner, node: NodeId) -> &mut AHashMap<String, String> {
    match &mut doc.nodes[node.index()].payload {
        Payload::Element { style, .. } => style,
        Payload::Text(_) => panic!("text nodes have no style"),
    }
}
