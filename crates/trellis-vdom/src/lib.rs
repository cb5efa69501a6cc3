#![forbid(unsafe_code)]

//! Virtual-node model and patch engine for Trellis.
//!
//! This crate is the rendering half of the runtime:
//!
//! - [`VNode`]: lightweight element/text/component description with
//!   key-based identity ([`is_same_vnode`]).
//! - [`Document`]: the in-memory real-node tree, with a mutation journal
//!   ([`DomOp`]) for asserting patch minimality.
//! - [`patch_props`]: attribute/style delta between two [`Props`].
//! - [`patch`]: reconciliation entry point, including the double-ended keyed
//!   children diff.
//!
//! Old and new vnode trees coexist only during one patch pass; the real-node
//! handle of every *same* node transfers old → new exactly once.

pub mod dom;
pub mod error;
pub mod patch;
pub mod props;
pub mod vnode;

pub use dom::{Document, DomOp, NodeId};
pub use error::PatchError;
pub use patch::{Previous, create_elm, patch, patch_vnode};
pub use props::{Props, patch_props};
pub use vnode::{ComponentBuilder, ConstructHook, ElementBuilder, VNode, VNodeKind, is_same_vnode};
