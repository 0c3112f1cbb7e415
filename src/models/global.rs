use super::tree::{TreeConfig, TreeRef};
use crate::config::ConfigWarning;
use crate::services::{LogScope, PluginSets};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Serialize;

/// Resolved `[DXR]` settings and every tree loaded with them.
///
/// Built once by [`ConfigLoader`](crate::config::ConfigLoader). All directory
/// fields are absolute. Nothing is mutated after the load, so a shared
/// reference can be handed to any number of worker threads.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalConfig {
    /// File the configuration was loaded from.
    pub config_file: Utf8PathBuf,

    pub dxrroot: Utf8PathBuf,
    pub plugin_folder: Utf8PathBuf,
    pub nb_jobs: usize,
    pub temp_folder: Utf8PathBuf,
    pub log_folder: Utf8PathBuf,
    pub target_folder: Utf8PathBuf,
    pub template_folder: Utf8PathBuf,

    /// URL prefix of the generated site, without a trailing `/`.
    pub wwwroot: String,
    pub directory_index: String,

    /// RFC 1123 style timestamp of the load, e.g. `Mon, 19 Oct 2026 13:42:00 +0000`.
    pub generated_date: String,

    pub plugins: PluginSets,

    /// Contents of the `[Template]` section.
    pub template_parameters: IndexMap<String, String>,

    /// `plugin_*` keys of the `[DXR]` section, verbatim.
    pub extensions: IndexMap<String, String>,

    pub(crate) trees: Vec<TreeConfig>,

    #[serde(skip)]
    pub(crate) warnings: Vec<ConfigWarning>,
}

impl GlobalConfig {
    /// Trees in processing order.
    pub fn trees(&self) -> impl ExactSizeIterator<Item = TreeRef<'_>> {
        self.trees.iter().map(move |tree| TreeRef::new(self, tree))
    }

    pub fn tree(&self, name: &str) -> Option<TreeRef<'_>> {
        self.trees
            .iter()
            .find(|tree| tree.name == name)
            .map(|tree| TreeRef::new(self, tree))
    }

    pub fn tree_names(&self) -> impl Iterator<Item = &str> {
        self.trees.iter().map(|tree| tree.name.as_str())
    }

    /// Non-fatal problems found while loading.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// A `plugin_*` setting of the `[DXR]` section.
    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }
}

impl LogScope for GlobalConfig {
    fn log_folder(&self) -> &Utf8Path {
        &self.log_folder
    }
}
