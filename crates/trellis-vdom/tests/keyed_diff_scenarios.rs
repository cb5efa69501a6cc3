//! Mutation-journal scenarios for the keyed children diff.
//!
//! Each scenario mounts an old child sequence, drains the journal, patches
//! to a new sequence, and asserts the *exact* shape of the mutations:
//! appends and prepends mount without moving, reversal moves without
//! mounting, shuffles reuse every node via keyed lookup.

use trellis_vdom::dom::DomOp;
use trellis_vdom::{Document, NodeId, Previous, VNode, patch};

fn item(key: &str) -> VNode {
    VNode::element("li")
        .key(key)
        .attr("k", key)
        .child(VNode::text(key))
        .build()
}

fn list(keys: &[&str]) -> VNode {
    VNode::element("ul")
        .children(keys.iter().map(|key| item(key)))
        .build()
}

struct OpCounts {
    mounts: usize,
    moves: usize,
    removes: usize,
}

fn counts(ops: &[DomOp]) -> OpCounts {
    OpCounts {
        mounts: ops
            .iter()
            .filter(|op| matches!(op, DomOp::CreateElement { .. }))
            .count(),
        moves: ops.iter().filter(|op| matches!(op, DomOp::Move { .. })).count(),
        removes: ops
            .iter()
            .filter(|op| matches!(op, DomOp::Remove { .. }))
            .count(),
    }
}

fn key_order(doc: &Document, parent: NodeId) -> Vec<String> {
    doc.children(parent)
        .into_iter()
        .map(|child| doc.attr(child, "k").expect("keyed item"))
        .collect()
}

/// Mount `old`, drain the journal, patch to `new`, return the journal.
fn mount_then_patch(old: &VNode, new: &VNode) -> (Document, NodeId, Vec<DomOp>) {
    let doc = Document::new();
    let el = patch(&doc, Previous::None, old).expect("mount");
    doc.append(doc.root(), el);
    let _ = doc.take_ops();
    let patched = patch(&doc, Previous::Node(old), new).expect("patch");
    assert_eq!(patched, el, "same root is reused");
    let ops = doc.take_ops();
    (doc, el, ops)
}

#[test]
fn append_mounts_one_node_and_moves_nothing() {
    let old = list(&["a", "b", "c", "d"]);
    let new = list(&["a", "b", "c", "d", "e"]);
    let (doc, el, ops) = mount_then_patch(&old, &new);

    let c = counts(&ops);
    assert_eq!(c.moves, 0);
    assert_eq!(c.removes, 0);
    // One new <li> element (its text child journals as a text create).
    assert_eq!(c.mounts, 1);
    assert!(
        matches!(
            ops.iter()
                .find(|op| matches!(op, DomOp::Insert { parent, .. } if *parent == el)),
            Some(DomOp::Insert { anchor: None, .. })
        ),
        "trailing append uses the append anchor"
    );
    assert_eq!(key_order(&doc, el), ["a", "b", "c", "d", "e"]);
}

#[test]
fn prepend_mounts_two_nodes_before_the_old_head() {
    let old = list(&["a", "b", "c", "d"]);
    let new = list(&["e", "f", "a", "b", "c", "d"]);
    let (doc, el, ops) = mount_then_patch(&old, &new);

    let c = counts(&ops);
    assert_eq!(c.moves, 0);
    assert_eq!(c.removes, 0);
    assert_eq!(c.mounts, 2);

    let old_head = doc.children(el)[2];
    assert_eq!(doc.attr(old_head, "k"), Some("a".to_owned()));
    for op in &ops {
        if let DomOp::Insert { parent, anchor, .. } = op
            && *parent == el
        {
            assert_eq!(*anchor, Some(old_head), "prepends share one anchor");
        }
    }
    assert_eq!(key_order(&doc, el), ["e", "f", "a", "b", "c", "d"]);
}

#[test]
fn reversal_reuses_every_node_with_moves_only() {
    let old = list(&["a", "b", "c", "d"]);
    let new = list(&["d", "c", "b", "a"]);
    let (doc, el, ops) = mount_then_patch(&old, &new);

    let c = counts(&ops);
    assert_eq!(c.mounts, 0);
    assert_eq!(c.removes, 0);
    assert_eq!(c.moves, 3);
    assert_eq!(key_order(&doc, el), ["d", "c", "b", "a"]);

    for (old_child, new_child) in old.children().iter().zip(new.children().iter().rev()) {
        assert_eq!(old_child.el(), new_child.el(), "same key reuses the node");
    }
}

#[test]
fn shuffle_reuses_all_nodes_via_key_lookup() {
    let old = list(&["a", "b", "c", "d"]);
    let new = list(&["b", "a", "d", "c"]);
    let (doc, el, ops) = mount_then_patch(&old, &new);

    let c = counts(&ops);
    assert_eq!(c.mounts, 0);
    assert_eq!(c.removes, 0);
    assert_eq!(key_order(&doc, el), ["b", "a", "d", "c"]);
}

#[test]
fn tail_removal_only_removes() {
    let old = list(&["a", "b", "c", "d"]);
    let new = list(&["a", "b"]);
    let (doc, el, ops) = mount_then_patch(&old, &new);

    let c = counts(&ops);
    assert_eq!(c.mounts, 0);
    assert_eq!(c.moves, 0);
    assert_eq!(c.removes, 2);
    assert_eq!(key_order(&doc, el), ["a", "b"]);
}

#[test]
fn lookup_miss_mounts_fresh_nodes() {
    let old = list(&["a", "b"]);
    let new = list(&["x", "y"]);
    let (doc, el, ops) = mount_then_patch(&old, &new);

    let c = counts(&ops);
    assert_eq!(c.mounts, 2);
    assert_eq!(c.removes, 2);
    assert_eq!(key_order(&doc, el), ["x", "y"]);
}
