#![forbid(unsafe_code)]

//! Trellis public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use trellis_reactive as reactive;
    pub use trellis_runtime as runtime;
    pub use trellis_vdom as vdom;
}
