#![forbid(unsafe_code)]

//! Error types for reactive container operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReactiveError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReactiveError {
    /// `set` only writes keys that are already reactive; use `define` to add
    /// a new reactive key.
    #[error("unknown reactive key: {key} (use define to add reactive keys)")]
    UnknownKey { key: String },

    #[error("list index out of bounds: {index} (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}
