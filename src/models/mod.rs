//! Data models for resolved DXR configuration.
//!
//! - [`GlobalConfig`]: settings of the `[DXR]` section, template parameters and the trees
//! - [`TreeConfig`]: settings of one tree section
//! - [`TreeRef`]: a tree borrowed together with its owning [`GlobalConfig`]
//!
//! # Architecture Note
//!
//! Trees are owned by the global configuration. A tree never points back at its
//! owner; [`GlobalConfig::trees`] hands out [`TreeRef`] values that borrow both.

pub mod global;
pub mod tree;

pub use global::GlobalConfig;
pub use tree::{DATABASE_FILE, JOBS_PLACEHOLDER, TreeConfig, TreeRef};
