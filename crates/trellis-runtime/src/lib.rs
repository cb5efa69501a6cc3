#![forbid(unsafe_code)]

//! Runtime loop for Trellis: reactive state in, document mutations out.
//!
//! An [`App`] executes a render function under an eager watcher. Reactive
//! reads during the render subscribe the watcher; every mutation of a read
//! property re-renders and re-patches synchronously. Components nest the
//! same machinery behind construction hooks, and [`ComputedRegistry`] adds
//! named lazy derived values.
//!
//! The render function is an external collaborator: anything that produces
//! one vnode tree per call and is pure aside from its reactive reads.

pub mod app;
pub mod component;
pub mod computed;

pub use app::{App, RenderScope};
pub use component::component;
pub use computed::ComputedRegistry;
