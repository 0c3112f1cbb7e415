// dxr-config - configuration resolution for the DXR source indexer
//
// This is the library crate that turns a DXR configuration file into a validated
// configuration graph. The binary crate (main.rs) prints the resolved result.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ConfigLoader, ConfigWarning};
pub use models::{GlobalConfig, TreeConfig, TreeRef};
pub use services::{PluginSets, PluginSpec};
pub use state::{DatabaseBackend, Runtime, TemplateEngine};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
