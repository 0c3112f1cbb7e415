//! Services module - configuration logic that does not depend on the file format.
//!
//! # Components
//!
//! - [`plugins`]: Resolves the enabled and disabled plugin sets of the global scope and of
//!   each tree, and lists the plugins available in the plugin folder.
//! - [`paths`]: Lexical absolutization of directory settings.
//! - [`files`]: `$name` substitution for generated files and per-scope log files.

pub mod files;
pub mod paths;
pub mod plugins;

pub use files::{LogScope, open_log, substitute, substitute_in_file};
pub use paths::absolutize;
pub use plugins::{PluginScope, PluginSets, PluginSpec, WILDCARD, discover_plugins, resolve_plugins};
