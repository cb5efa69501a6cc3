#![forbid(unsafe_code)]

//! Patch: reconcile an old tree (or a raw mount point, or nothing) against a
//! new virtual-node tree with minimal document mutation.
//!
//! # Entry points
//!
//! [`patch`] dispatches on what came before:
//!
//! 1. Nothing → mount: recursively build real nodes for the new tree.
//! 2. A raw mount point → build the new subtree next to it, then remove the
//!    mount point (bridges an initial mount point into the vnode world).
//! 3. An old vnode → [`patch_vnode`].
//!
//! # Keyed children diff
//!
//! [`update_children`] runs four cursors (old-start/end, new-start/end) over
//! the two child sequences with a precomputed key→index map over the old
//! side. The tie-break order is fixed: start/start, end/end, start/end,
//! end/start, then keyed lookup — append, prepend, and reversal resolve in
//! near-linear time before the map is ever consulted, and arbitrary shuffles
//! fall back to O(1) keyed lookups.
//!
//! After the loop, leftover new children mount at a single anchor (the node
//! just past the final new-end, or append when none), which handles both
//! trailing appends and leading prepends; leftover non-nulled old children
//! are removed.
//!
//! # Invariants
//!
//! 1. A real node transfers from old vnode to new vnode exactly once per
//!    patch when the two are the *same* node.
//! 2. Same-keyed children are reused (moved), never rebuilt.
//! 3. Duplicate sibling keys on either side abort with
//!    [`PatchError::DuplicateKey`] before any mutation.

use ahash::{AHashMap, AHashSet};
use tracing::trace;

use crate::dom::{Document, NodeId};
use crate::error::{PatchError, Result};
use crate::props::{Props, patch_props};
use crate::vnode::{VNode, VNodeKind, is_same_vnode};

/// What the new tree is patched against.
pub enum Previous<'a> {
    /// First mount: nothing to reconcile.
    None,
    /// A raw document node serving as the mount point.
    Mount(NodeId),
    /// The previous render's tree.
    Node(&'a VNode),
}

/// Reconcile and return the real root of the new tree.
pub fn patch(doc: &Document, prev: Previous<'_>, next: &VNode) -> Result<NodeId> {
    match prev {
        Previous::None => create_elm(doc, next),
        Previous::Mount(mount) => {
            let parent = doc.parent(mount).ok_or(PatchError::DetachedMountPoint)?;
            let anchor = doc.next_sibling(mount);
            let new_el = create_elm(doc, next)?;
            doc.insert_before(parent, new_el, anchor);
            doc.remove(mount);
            Ok(new_el)
        }
        Previous::Node(old) => patch_vnode(doc, old, next),
    }
}

/// Recursively build real nodes for `vnode`, binding handles as it goes.
///
/// Component nodes run their construction hook, which mounts the component
/// and yields its real root; the root is cached on the vnode.
pub fn create_elm(doc: &Document, vnode: &VNode) -> Result<NodeId> {
    let el = match vnode.kind() {
        VNodeKind::Element {
            tag,
            props,
            children,
            ..
        } => {
            let el = doc.create_element(tag.as_str());
            patch_props(doc, el, &Props::new(), props);
            for child in children {
                let child_el = create_elm(doc, child)?;
                doc.append(el, child_el);
            }
            el
        }
        VNodeKind::Text { text } => doc.create_text(text.as_str()),
        VNodeKind::Component { hook, .. } => hook(doc)?,
    };
    vnode.set_el(el);
    Ok(el)
}

/// Reconcile two vnodes.
///
/// Different nodes are wholesale-replaced. Same nodes reuse the old real
/// node: text updates in place, elements get a props delta and child
/// reconciliation, components keep their mounted instance.
pub fn patch_vnode(doc: &Document, old: &VNode, new: &VNode) -> Result<NodeId> {
    if !is_same_vnode(old, new) {
        let old_el = old.el().ok_or(PatchError::UnboundVNode)?;
        let new_el = create_elm(doc, new)?;
        trace!(?old_el, ?new_el, "replace");
        doc.replace(old_el, new_el);
        return Ok(new_el);
    }

    let el = old.el().ok_or(PatchError::UnboundVNode)?;
    new.set_el(el);

    match (old.kind(), new.kind()) {
        (VNodeKind::Text { text: old_text }, VNodeKind::Text { text: new_text }) => {
            if old_text != new_text {
                doc.set_text(el, new_text.as_str());
            }
        }
        (
            VNodeKind::Element {
                props: old_props,
                children: old_children,
                ..
            },
            VNodeKind::Element {
                props: new_props,
                children: new_children,
                ..
            },
        ) => {
            patch_props(doc, el, old_props, new_props);
            match (old_children.is_empty(), new_children.is_empty()) {
                (false, false) => update_children(doc, el, old_children, new_children)?,
                (true, false) => mount_children(doc, el, new_children)?,
                (false, true) => doc.clear_children(el),
                (true, true) => {}
            }
        }
        (
            VNodeKind::Component {
                retained: old_retained,
                ..
            },
            VNodeKind::Component {
                retained: new_retained,
                ..
            },
        ) => {
            // Carry the first-mounted generation forward so the construction
            // hook's instance state survives parent re-renders.
            let keep = old_retained
                .borrow_mut()
                .take()
                .unwrap_or_else(|| old.clone());
            *new_retained.borrow_mut() = Some(keep);
        }
        _ => unreachable!("same nodes share a kind"),
    }
    Ok(el)
}

fn mount_children(doc: &Document, parent: NodeId, children: &[VNode]) -> Result<()> {
    for child in children {
        let el = create_elm(doc, child)?;
        doc.append(parent, el);
    }
    Ok(())
}

/// Double-ended keyed diff over two non-empty child sequences.
fn update_children(
    doc: &Document,
    parent: NodeId,
    old_children: &[VNode],
    new_children: &[VNode],
) -> Result<()> {
    let mut seen: AHashSet<&str> = AHashSet::new();
    for child in new_children {
        if let Some(key) = child.key()
            && !seen.insert(key)
        {
            return Err(PatchError::DuplicateKey {
                key: key.to_owned(),
            });
        }
    }
    let mut keyed: AHashMap<&str, usize> = AHashMap::new();
    for (index, child) in old_children.iter().enumerate() {
        if let Some(key) = child.key()
            && keyed.insert(key, index).is_some()
        {
            return Err(PatchError::DuplicateKey {
                key: key.to_owned(),
            });
        }
    }

    // Slots nulled by a keyed move are skipped when a cursor reaches them.
    let mut old: Vec<Option<VNode>> = old_children.iter().cloned().map(Some).collect();
    let mut old_start: isize = 0;
    let mut old_end: isize = old.len() as isize - 1;
    let mut new_start: isize = 0;
    let mut new_end: isize = new_children.len() as isize - 1;

    while old_start <= old_end && new_start <= new_end {
        let Some(os) = old[old_start as usize].clone() else {
            old_start += 1;
            continue;
        };
        let Some(oe) = old[old_end as usize].clone() else {
            old_end -= 1;
            continue;
        };
        let ns = &new_children[new_start as usize];
        let ne = &new_children[new_end as usize];

        if is_same_vnode(&os, ns) {
            // Heads align: append/pop-tail pattern.
            patch_vnode(doc, &os, ns)?;
            old_start += 1;
            new_start += 1;
        } else if is_same_vnode(&oe, ne) {
            // Tails align: prepend/shift-head pattern.
            patch_vnode(doc, &oe, ne)?;
            old_end -= 1;
            new_end -= 1;
        } else if is_same_vnode(&os, ne) {
            // Old head became the new tail: move just after old-end.
            patch_vnode(doc, &os, ne)?;
            let moved = ne.el().ok_or(PatchError::UnboundVNode)?;
            let oe_el = oe.el().ok_or(PatchError::UnboundVNode)?;
            doc.insert_before(parent, moved, doc.next_sibling(oe_el));
            old_start += 1;
            new_end -= 1;
        } else if is_same_vnode(&oe, ns) {
            // Old tail became the new head: move just before old-start.
            patch_vnode(doc, &oe, ns)?;
            let moved = ns.el().ok_or(PatchError::UnboundVNode)?;
            let os_el = os.el().ok_or(PatchError::UnboundVNode)?;
            doc.insert_before(parent, moved, Some(os_el));
            old_end -= 1;
            new_start += 1;
        } else {
            let os_el = os.el().ok_or(PatchError::UnboundVNode)?;
            let candidate = ns
                .key()
                .and_then(|key| keyed.get(key).copied())
                .filter(|&index| {
                    old[index]
                        .as_ref()
                        .is_some_and(|found| is_same_vnode(found, ns))
                });
            match candidate {
                Some(index) => {
                    let moved = old[index].take().expect("candidate slot is occupied");
                    let moved_el = moved.el().ok_or(PatchError::UnboundVNode)?;
                    doc.insert_before(parent, moved_el, Some(os_el));
                    patch_vnode(doc, &moved, ns)?;
                }
                None => {
                    let fresh = create_elm(doc, ns)?;
                    doc.insert_before(parent, fresh, Some(os_el));
                }
            }
            new_start += 1;
        }
    }

    if new_start <= new_end {
        // Everything left on the new side mounts at one anchor: the node
        // just past the final new-end (prepend), or append when none.
        let anchor = new_children
            .get((new_end + 1) as usize)
            .and_then(VNode::el);
        for index in new_start..=new_end {
            let fresh = create_elm(doc, &new_children[index as usize])?;
            doc.insert_before(parent, fresh, anchor);
        }
    }

    if old_start <= old_end {
        for slot in &old[old_start as usize..=old_end as usize] {
            if let Some(stale) = slot {
                let el = stale.el().ok_or(PatchError::UnboundVNode)?;
                doc.remove(el);
            }
        }
    }

    Ok(())
}
