use super::global::GlobalConfig;
use crate::services::{LogScope, PluginSets, substitute};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Serialize;
use std::ops::Deref;

/// Placeholder in `build_command` replaced by the job count.
pub const JOBS_PLACEHOLDER: &str = "$jobs";

/// File name of a tree's cross-reference database inside its target folder.
pub const DATABASE_FILE: &str = ".dxr-xref.sqlite";

/// Resolved settings of one tree section.
#[derive(Debug, Clone, Serialize)]
pub struct TreeConfig {
    pub name: String,
    pub source_folder: Utf8PathBuf,
    pub object_folder: Utf8PathBuf,
    /// Always `<global target_folder>/<name>`.
    pub target_folder: Utf8PathBuf,
    pub temp_folder: Utf8PathBuf,
    pub log_folder: Utf8PathBuf,
    pub build_command: String,
    pub ignore_patterns: Vec<String>,
    pub plugins: PluginSets,
    /// `plugin_*` keys of the tree's own section, verbatim.
    pub extensions: IndexMap<String, String>,
}

impl TreeConfig {
    pub fn has_jobs_placeholder(&self) -> bool {
        self.build_command.contains(JOBS_PLACEHOLDER)
    }

    /// The build command with `$jobs` filled in.
    pub fn build_command_for(&self, jobs: usize) -> String {
        let mut vars = IndexMap::new();
        vars.insert("jobs".to_string(), jobs.to_string());
        substitute(&self.build_command, &vars)
    }

    pub fn database_path(&self) -> Utf8PathBuf {
        self.target_folder.join(DATABASE_FILE)
    }

    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }
}

impl LogScope for TreeConfig {
    fn log_folder(&self) -> &Utf8Path {
        &self.log_folder
    }
}

/// A tree borrowed together with the configuration that owns it.
#[derive(Debug, Clone, Copy)]
pub struct TreeRef<'a> {
    global: &'a GlobalConfig,
    tree: &'a TreeConfig,
}

impl<'a> TreeRef<'a> {
    pub(crate) fn new(global: &'a GlobalConfig, tree: &'a TreeConfig) -> Self {
        Self { global, tree }
    }

    pub fn global(&self) -> &'a GlobalConfig {
        self.global
    }

    pub fn config(&self) -> &'a TreeConfig {
        self.tree
    }

    /// The build command with the configured job count filled in.
    pub fn build_command(&self) -> String {
        self.tree.build_command_for(self.global.nb_jobs)
    }
}

impl Deref for TreeRef<'_> {
    type Target = TreeConfig;

    fn deref(&self) -> &TreeConfig {
        self.tree
    }
}

impl LogScope for TreeRef<'_> {
    fn log_folder(&self) -> &Utf8Path {
        &self.tree.log_folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(build_command: &str) -> TreeConfig {
        TreeConfig {
            name: "nss".to_string(),
            source_folder: Utf8PathBuf::from("/src/nss"),
            object_folder: Utf8PathBuf::from("/obj/nss"),
            target_folder: Utf8PathBuf::from("/www/nss"),
            temp_folder: Utf8PathBuf::from("/tmp/dxr-temp/nss"),
            log_folder: Utf8PathBuf::from("/tmp/dxr-temp/logs/nss"),
            build_command: build_command.to_string(),
            ignore_patterns: Vec::new(),
            plugins: PluginSets::default(),
            extensions: IndexMap::new(),
        }
    }

    #[test]
    fn test_build_command_for_jobs() {
        let tree = tree("make -j $jobs -C $objdir");
        assert!(tree.has_jobs_placeholder());
        assert_eq!(tree.build_command_for(12), "make -j 12 -C $objdir");
    }

    #[test]
    fn test_build_command_without_placeholder() {
        let tree = tree("./build.sh");
        assert!(!tree.has_jobs_placeholder());
        assert_eq!(tree.build_command_for(4), "./build.sh");
    }

    #[test]
    fn test_database_path() {
        assert_eq!(
            tree("make").database_path(),
            Utf8PathBuf::from("/www/nss/.dxr-xref.sqlite")
        );
    }
}
