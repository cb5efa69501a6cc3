#![forbid(unsafe_code)]

//! Dependency-tracking reactive state for Trellis.
//!
//! This crate provides the change-tracking half of the runtime:
//!
//! - [`observe`]: wraps plain data ([`serde_json::Value`] or anything
//!   convertible to [`Reactive`]) into observable containers.
//! - [`Dep`]: the subscriber set for one reactive property.
//! - [`Watcher`]: one reactive computation (a render, a user watch) with its
//!   own dependency set, eager or lazy.
//! - [`Computed`]: lazy, memoized derived value with transitive dependency
//!   re-broadcast.
//! - [`TrackCx`]: the evaluation context threaded through reads and
//!   evaluations; replaces hidden global "current watcher" state.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous: `Rc<RefCell<..>>` shared
//! ownership, weak subscriber links, notification on the mutating call
//! stack. A property read during an evaluation mutually subscribes the
//! innermost active watcher with that property's [`Dep`]; a property write
//! notifies its dep's subscribers in subscription order. There is no
//! batching or dedup across a synchronous mutation burst — a watcher
//! notified twice re-evaluates twice.

pub mod cx;
pub mod dep;
pub mod error;
pub mod observe;
pub mod watcher;

pub use cx::TrackCx;
pub use dep::{Dep, Subscriber};
pub use error::ReactiveError;
pub use observe::{Reactive, ReactiveList, ReactiveMap, Scalar, observe};
pub use watcher::{Computed, Watcher};
