#![forbid(unsafe_code)]

//! Component construction: a vnode whose hook mounts a child instance.
//!
//! The returned vnode carries a construction hook; the patch engine invokes
//! it on first mount. The hook spins up a child [`App`] over the shared
//! document, mounts it detached, and exposes the child's real root — the
//! engine inserts that root wherever the component sits in the parent tree.
//! The hook (and with it the child instance and its render watcher) stays
//! alive as long as some generation of the component vnode does; same-node
//! patches carry the first-mounted generation forward.

use trellis_reactive::ReactiveMap;
use trellis_vdom::{Document, VNode};

use crate::app::{App, RenderScope};

/// Build a component vnode with its own state and render function.
///
/// The child instance shares `doc` but owns its state, computed registry,
/// and tracking context: its renders track against its own render watcher,
/// and its state mutations re-patch only its subtree.
#[must_use]
pub fn component(
    doc: &Document,
    tag: impl Into<String>,
    state: ReactiveMap,
    render: impl Fn(&RenderScope<'_>) -> VNode + 'static,
) -> VNode {
    let child = App::new(doc, state, render);
    VNode::component(tag, move |_doc: &Document| child.mount_detached()).build()
}
