use camino::Utf8PathBuf;
use thiserror::Error;

/// Fatal errors raised while resolving a configuration file.
///
/// Any of these aborts the whole load; there is no partially valid
/// configuration graph.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: ini::Error,
    },

    #[error("Section '{section}' not found in configuration")]
    MissingSection { section: String },

    #[error("Required key '{key}' missing from section '{section}'")]
    MissingRequiredKey { section: String, key: String },

    #[error("Invalid value '{value}' for '{key}' in section '{section}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Malformed order value '{value}' in section '{section}'")]
    MalformedOrderValue { section: String, value: String },

    #[error("Cannot interpolate '{key}' in section '{section}': {reason}")]
    Interpolation {
        section: String,
        key: String,
        reason: String,
    },

    #[error("Plugin: '{plugin}' is both enabled and disabled in '{scope}'")]
    PluginConflict { plugin: String, scope: String },

    #[error("Cannot determine working directory: {reason}")]
    WorkingDirectory { reason: String },

    #[error("Failed to list plugins in {folder}: {source}")]
    PluginDiscovery {
        folder: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal conditions found during a load.
///
/// Each one is logged when it is found and kept on the resolved
/// [`GlobalConfig`](crate::models::GlobalConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The tree's build command never mentions `$jobs`, so `nb_jobs` has no effect on it.
    BuildCommandMissingJobsPlaceholder { tree: String },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::BuildCommandMissingJobsPlaceholder { tree } => {
                write!(f, "$jobs is not used in build_command for '{}'", tree)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_conflict_message_names_plugin_and_scope() {
        let err = ConfigError::PluginConflict {
            plugin: "clang".to_string(),
            scope: "mozilla-central".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Plugin: 'clang' is both enabled and disabled in 'mozilla-central'"
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = ConfigWarning::BuildCommandMissingJobsPlaceholder {
            tree: "nss".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "$jobs is not used in build_command for 'nss'"
        );
    }
}
