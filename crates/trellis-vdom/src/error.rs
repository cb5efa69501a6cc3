#![forbid(unsafe_code)]

//! Patch engine errors. All programming-error class: they surface
//! synchronously to the triggering caller and carry no retry semantics.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PatchError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// Two siblings carry the same key; a keyed diff cannot reuse nodes
    /// unambiguously.
    #[error("duplicate sibling key during keyed diff: {key:?}")]
    DuplicateKey { key: String },

    /// The previous tree's node was never bound to a real node, so there is
    /// nothing to patch against.
    #[error("previous virtual node is not bound to a real node")]
    UnboundVNode,

    /// A mount point must live inside the document tree so the built subtree
    /// can be inserted next to it.
    #[error("mount point is not attached to the document")]
    DetachedMountPoint,
}
