//! Enabled/disabled plugin resolution.
//!
//! Both the global `[DXR]` section and every tree section name the plugins they
//! enable and disable, either as a whitespace-separated list or as the wildcard
//! `*`. The disabled set is always resolved first: a tree's wildcard `enabled`
//! depends on it.

use crate::config::ConfigError;
use camino::Utf8Path;
use indexmap::IndexSet;
use serde::Serialize;
use std::fs;

/// The wildcard token meaning "all applicable plugins".
pub const WILDCARD: &str = "*";

/// A raw `enabled_plugins` or `disabled_plugins` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSpec {
    All,
    Names(IndexSet<String>),
}

impl PluginSpec {
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == WILDCARD {
            PluginSpec::All
        } else {
            PluginSpec::Names(raw.split_whitespace().map(str::to_string).collect())
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PluginSpec::All)
    }
}

/// Where a resolution happens, and what it inherits.
#[derive(Debug, Clone, Copy)]
pub enum PluginScope<'a> {
    /// The global section. `discovered` lists every plugin in the plugin folder.
    Global { name: &'a str, discovered: &'a [String] },
    /// A tree section, narrowing its parent's resolved sets.
    Tree { name: &'a str, parent: &'a PluginSets },
}

impl PluginScope<'_> {
    pub fn name(&self) -> &str {
        match self {
            PluginScope::Global { name, .. } | PluginScope::Tree { name, .. } => name,
        }
    }
}

/// Resolved plugin sets of one scope. The two sets never overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginSets {
    pub enabled: IndexSet<String>,
    pub disabled: IndexSet<String>,
}

impl PluginSets {
    pub fn is_enabled(&self, plugin: &str) -> bool {
        self.enabled.contains(plugin)
    }

    pub fn is_disabled(&self, plugin: &str) -> bool {
        self.disabled.contains(plugin)
    }

    /// First enabled plugin that is also disabled.
    pub fn conflict(&self) -> Option<&str> {
        self.enabled
            .iter()
            .find(|plugin| self.disabled.contains(*plugin))
            .map(String::as_str)
    }
}

/// Resolve a scope's enabled and disabled plugins.
///
/// Disabled:
/// - `*` globally disables every discovered plugin; in a tree it disables
///   everything the parent enabled.
/// - A list in a tree is extended with the parent's disabled plugins, so a
///   plugin disabled globally stays disabled everywhere.
///
/// Enabled:
/// - `*` is every discovered plugin (globally) or every parent-enabled plugin
///   (in a tree), minus the disabled set.
/// - A list is taken literally, without filtering.
///
/// Fails with [`ConfigError::PluginConflict`] when a plugin ends up in both sets.
pub fn resolve_plugins(
    scope: PluginScope<'_>,
    enabled: &PluginSpec,
    disabled: &PluginSpec,
) -> Result<PluginSets, ConfigError> {
    let disabled: IndexSet<String> = match (scope, disabled) {
        (PluginScope::Global { discovered, .. }, PluginSpec::All) => {
            discovered.iter().cloned().collect()
        }
        (PluginScope::Tree { parent, .. }, PluginSpec::All) => parent.enabled.clone(),
        (PluginScope::Global { .. }, PluginSpec::Names(names)) => names.clone(),
        (PluginScope::Tree { parent, .. }, PluginSpec::Names(names)) => {
            let mut names = names.clone();
            names.extend(parent.disabled.iter().cloned());
            names
        }
    };

    let enabled: IndexSet<String> = match (scope, enabled) {
        (PluginScope::Global { discovered, .. }, PluginSpec::All) => discovered
            .iter()
            .filter(|plugin| !disabled.contains(*plugin))
            .cloned()
            .collect(),
        (PluginScope::Tree { parent, .. }, PluginSpec::All) => parent
            .enabled
            .iter()
            .filter(|plugin| !disabled.contains(*plugin))
            .cloned()
            .collect(),
        (_, PluginSpec::Names(names)) => names.clone(),
    };

    let sets = PluginSets { enabled, disabled };
    if let Some(plugin) = sets.conflict() {
        return Err(ConfigError::PluginConflict {
            plugin: plugin.to_string(),
            scope: scope.name().to_string(),
        });
    }

    tracing::debug!(
        "Resolved plugins for '{}': enabled={:?}, disabled={:?}",
        scope.name(),
        sets.enabled,
        sets.disabled
    );
    Ok(sets)
}

/// List plugin names in `folder`, sorted. Every directory entry counts as a plugin.
pub fn discover_plugins(folder: &Utf8Path) -> Result<Vec<String>, ConfigError> {
    let discovery_error = |source| ConfigError::PluginDiscovery {
        folder: folder.to_path_buf(),
        source,
    };

    let mut plugins = Vec::new();
    for entry in fs::read_dir(folder).map_err(discovery_error)? {
        let entry = entry.map_err(discovery_error)?;
        match entry.file_name().into_string() {
            Ok(name) => plugins.push(name),
            Err(name) => tracing::warn!("Skipping non UTF-8 plugin name {:?} in {}", name, folder),
        }
    }
    plugins.sort();

    tracing::debug!("Discovered {} plugins in {}", plugins.len(), folder);
    Ok(plugins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> IndexSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn discovered() -> Vec<String> {
        vec!["foo".to_string(), "bar".to_string(), "baz".to_string()]
    }

    fn global(enabled: &str, disabled: &str) -> Result<PluginSets, ConfigError> {
        let discovered = discovered();
        resolve_plugins(
            PluginScope::Global {
                name: "DXR",
                discovered: &discovered,
            },
            &PluginSpec::parse(enabled),
            &PluginSpec::parse(disabled),
        )
    }

    fn tree(parent: &PluginSets, enabled: &str, disabled: &str) -> Result<PluginSets, ConfigError> {
        resolve_plugins(
            PluginScope::Tree {
                name: "mozilla-central",
                parent,
            },
            &PluginSpec::parse(enabled),
            &PluginSpec::parse(disabled),
        )
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(PluginSpec::parse("*"), PluginSpec::All);
        assert_eq!(PluginSpec::parse(" "), PluginSpec::Names(IndexSet::new()));
        assert_eq!(PluginSpec::parse(""), PluginSpec::Names(IndexSet::new()));
        assert_eq!(
            PluginSpec::parse("clang  pygmentize\tbuglink"),
            PluginSpec::Names(names(&["clang", "pygmentize", "buglink"]))
        );
    }

    #[test]
    fn test_global_wildcard_enabled_excludes_disabled() {
        let sets = global("*", "foo").unwrap();
        assert_eq!(sets.enabled, names(&["bar", "baz"]));
        assert_eq!(sets.disabled, names(&["foo"]));
    }

    #[test]
    fn test_global_wildcard_disabled_takes_every_plugin() {
        let sets = global("", "*").unwrap();
        assert!(sets.enabled.is_empty());
        assert_eq!(sets.disabled, names(&["foo", "bar", "baz"]));
    }

    #[test]
    fn test_global_explicit_lists_conflict() {
        let err = global("foo bar", "bar").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PluginConflict { ref plugin, ref scope } if plugin == "bar" && scope == "DXR"
        ));
    }

    #[test]
    fn test_tree_wildcard_disabled_is_parent_enabled() {
        let parent = global("*", "foo").unwrap();
        let sets = tree(&parent, "", "*").unwrap();
        assert_eq!(sets.disabled, parent.enabled);
        assert!(sets.enabled.is_empty());
    }

    #[test]
    fn test_tree_explicit_disabled_keeps_parent_disabled() {
        let parent = global("*", "foo").unwrap();
        let sets = tree(&parent, "*", "baz").unwrap();
        assert_eq!(sets.disabled, names(&["baz", "foo"]));
        assert_eq!(sets.enabled, names(&["bar"]));
    }

    #[test]
    fn test_tree_explicit_enabled_is_not_filtered() {
        let parent = global("*", "foo").unwrap();
        let err = tree(&parent, "bar", "*").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PluginConflict { ref plugin, ref scope } if plugin == "bar" && scope == "mozilla-central"
        ));
    }

    #[test]
    fn test_tree_cannot_reenable_globally_disabled_plugin() {
        let parent = global("*", "foo").unwrap();
        let err = tree(&parent, "foo", "").unwrap_err();
        assert!(matches!(err, ConfigError::PluginConflict { ref plugin, .. } if plugin == "foo"));
    }

    #[test]
    fn test_discover_plugins_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let folder = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        for plugin in ["pygmentize", "clang", "buglink"] {
            fs::create_dir(folder.join(plugin)).unwrap();
        }

        let plugins = discover_plugins(&folder).unwrap();
        assert_eq!(plugins, vec!["buglink", "clang", "pygmentize"]);
    }

    #[test]
    fn test_discover_missing_folder() {
        let temp_dir = TempDir::new().unwrap();
        let folder = Utf8PathBuf::try_from(temp_dir.path().join("missing")).unwrap();
        assert!(matches!(
            discover_plugins(&folder),
            Err(ConfigError::PluginDiscovery { .. })
        ));
    }

    const POOL: &[&str] = &["a", "b", "c", "d", "e", "f"];

    fn spec() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("*".to_string()),
            proptest::sample::subsequence(POOL, 0..=POOL.len()).prop_map(|names| names.join(" ")),
        ]
    }

    proptest! {
        #[test]
        fn test_resolved_sets_are_disjoint_or_conflict(
            global_enabled in spec(),
            global_disabled in spec(),
            tree_enabled in spec(),
            tree_disabled in spec(),
        ) {
            let discovered: Vec<String> = POOL.iter().map(|s| s.to_string()).collect();
            let scope = PluginScope::Global { name: "DXR", discovered: &discovered };
            let Ok(parent) = resolve_plugins(scope, &PluginSpec::parse(&global_enabled), &PluginSpec::parse(&global_disabled)) else {
                return Ok(());
            };
            prop_assert!(parent.conflict().is_none());

            let scope = PluginScope::Tree { name: "tree", parent: &parent };
            match resolve_plugins(scope, &PluginSpec::parse(&tree_enabled), &PluginSpec::parse(&tree_disabled)) {
                Ok(sets) => {
                    prop_assert!(sets.enabled.is_disjoint(&sets.disabled));
                    if tree_disabled == "*" {
                        prop_assert_eq!(&sets.disabled, &parent.enabled);
                    } else {
                        prop_assert!(sets.disabled.is_superset(&parent.disabled));
                    }
                }
                Err(ConfigError::PluginConflict { plugin, .. }) => {
                    prop_assert!(PluginSpec::parse(&tree_enabled) != PluginSpec::All);
                    prop_assert!(tree_enabled.split_whitespace().any(|p| p == plugin));
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }
    }
}
