//! Configuration loading.
//!
//! [`ConfigLoader`] reads a DXR configuration file and resolves it into a
//! [`GlobalConfig`] holding every [`TreeConfig`]:
//!
//! 1. The `[DXR]` section is read on top of built-in defaults, with caller
//!    overrides taking precedence over the file.
//! 2. The global plugin sets are resolved against the plugin folder.
//! 3. Every other section except `[Template]` becomes a tree, in section order,
//!    narrowing the global plugin sets.

pub mod error;
pub mod ordering;
pub mod source;

pub use error::{ConfigError, ConfigWarning};
pub use ordering::{SectionKey, compare_sections, order_sections};
pub use source::{Options, RawConfig, SectionReader};

use crate::models::{GlobalConfig, JOBS_PLACEHOLDER, TreeConfig};
use crate::services::{PluginScope, PluginSpec, absolutize, discover_plugins, resolve_plugins};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

/// The global section.
pub const GLOBAL_SECTION: &str = "DXR";

/// The section copied verbatim into the template parameters.
pub const TEMPLATE_SECTION: &str = "Template";

/// Prefix of free-form keys kept for plugins.
pub const EXTENSION_PREFIX: &str = "plugin_";

pub const DEFAULT_IGNORE_PATTERNS: &str = ".hg .git CVS .svn .bzr .deps .libs";
pub const DEFAULT_BUILD_COMMAND: &str = "make -j $jobs";

/// `strftime` pattern of [`GlobalConfig::generated_date`].
const GENERATED_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Whether a section name is one of the non-tree sections. Names are case-sensitive.
pub fn is_reserved_section(name: &str) -> bool {
    name == GLOBAL_SECTION || name == TEMPLATE_SECTION
}

#[derive(Debug, Clone)]
enum Input {
    File,
    Text(String),
}

/// Builder that loads a [`GlobalConfig`] from a configuration file.
///
/// # Example
/// ```ignore
/// let config = ConfigLoader::new("dxr.config")
///     .with_override("nb_jobs", "8")
///     .load()?;
///
/// for tree in config.trees() {
///     println!("{} -> {}", tree.name, tree.target_folder);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_file: Utf8PathBuf,
    input: Input,
    overrides: Options,
    working_dir: Option<Utf8PathBuf>,
    install_root: Option<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Load from the file at `config_file`.
    pub fn new<P: AsRef<Utf8Path>>(config_file: P) -> Self {
        Self {
            config_file: config_file.as_ref().to_path_buf(),
            input: Input::File,
            overrides: Options::new(),
            working_dir: None,
            install_root: None,
        }
    }

    /// Load from in-memory text. `config_file` is recorded as the origin but never read.
    pub fn from_text<P: AsRef<Utf8Path>>(config_file: P, text: impl Into<String>) -> Self {
        Self {
            input: Input::Text(text.into()),
            ..Self::new(config_file)
        }
    }

    /// Replace the override mapping. Overrides win over the file for any `[DXR]` key.
    pub fn with_overrides(mut self, overrides: Options) -> Self {
        self.overrides = overrides
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();
        self
    }

    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.overrides.insert(key.to_lowercase(), value.into());
        self
    }

    /// Base for relative directory settings. Defaults to the process working directory.
    pub fn with_working_dir<P: AsRef<Utf8Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Default `dxrroot`. Defaults to the directory holding the running executable.
    pub fn with_install_root<P: AsRef<Utf8Path>>(mut self, dir: P) -> Self {
        self.install_root = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Read and resolve the whole configuration.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]. Nothing is returned unless every section resolved.
    pub fn load(&self) -> Result<GlobalConfig, ConfigError> {
        let raw = match &self.input {
            Input::File => {
                tracing::info!("Loading configuration from {}", self.config_file);
                RawConfig::from_file(&self.config_file)?
            }
            Input::Text(text) => RawConfig::from_text(self.config_file.as_str(), text)?,
        };

        let working_dir = self.working_dir()?;
        let install_root = self.install_root(&working_dir);

        let mut warnings = Vec::new();
        let mut global = self.load_global(&raw, &working_dir, &install_root)?;

        // Ordering reads `order` through the global defaults, like every other global lookup.
        let reader = SectionReader::new(&raw, global_defaults(&install_root, String::new()));
        let trees = order_sections(&reader, raw.sections())?
            .into_iter()
            .filter(|name| !is_reserved_section(name))
            .map(|name| load_tree(&raw, &name, &global, &working_dir, &mut warnings))
            .collect::<Result<Vec<_>, _>>()?;

        global.trees = trees;
        global.warnings = warnings;

        tracing::info!(
            "Loaded configuration {} with {} trees",
            global.config_file,
            global.trees.len()
        );
        Ok(global)
    }

    fn load_global(
        &self,
        raw: &RawConfig,
        working_dir: &Utf8Path,
        install_root: &Utf8Path,
    ) -> Result<GlobalConfig, ConfigError> {
        let generated_date = chrono::Utc::now()
            .format(GENERATED_DATE_FORMAT)
            .to_string();
        let reader = SectionReader::new(raw, global_defaults(install_root, generated_date));
        let get = |key: &str| reader.get_with(GLOBAL_SECTION, key, Some(&self.overrides));

        let dxrroot = absolutize(get("dxrroot")?, working_dir);
        let plugin_folder = absolutize(get("plugin_folder")?, working_dir);
        let nb_jobs = parse_jobs(get("nb_jobs")?)?;
        let temp_folder = absolutize(get("temp_folder")?, working_dir);
        let target_folder = absolutize(get("target_folder")?, working_dir);
        let log_folder = absolutize(get("log_folder")?, working_dir);
        let template_folder = absolutize(get("template")?, working_dir);
        let wwwroot = strip_trailing_slash(get("wwwroot")?);
        let directory_index = get("directory_index")?;
        let generated_date = get("generated_date")?;

        // Template parameters get no built-in defaults.
        let template_reader = SectionReader::new(raw, Options::new());
        let template_parameters = if raw.has_section(TEMPLATE_SECTION) {
            template_reader.items(TEMPLATE_SECTION)?
        } else {
            tracing::debug!("No [{}] section, template parameters are empty", TEMPLATE_SECTION);
            IndexMap::new()
        };

        let extensions = extension_keys(reader.declared_items(GLOBAL_SECTION)?);

        let enabled = PluginSpec::parse(&get("enabled_plugins")?);
        let disabled = PluginSpec::parse(&get("disabled_plugins")?);
        let discovered = if enabled.is_wildcard() || disabled.is_wildcard() {
            discover_plugins(&plugin_folder)?
        } else {
            Vec::new()
        };
        let plugins = resolve_plugins(
            PluginScope::Global {
                name: GLOBAL_SECTION,
                discovered: &discovered,
            },
            &enabled,
            &disabled,
        )?;

        Ok(GlobalConfig {
            config_file: self.config_file.clone(),
            dxrroot,
            plugin_folder,
            nb_jobs,
            temp_folder,
            log_folder,
            target_folder,
            template_folder,
            wwwroot,
            directory_index,
            generated_date,
            plugins,
            template_parameters,
            extensions,
            trees: Vec::new(),
            warnings: Vec::new(),
        })
    }

    fn working_dir(&self) -> Result<Utf8PathBuf, ConfigError> {
        if let Some(dir) = &self.working_dir {
            return Ok(dir.clone());
        }
        let cwd = std::env::current_dir().map_err(|e| ConfigError::WorkingDirectory {
            reason: e.to_string(),
        })?;
        Utf8PathBuf::from_path_buf(cwd).map_err(|path| ConfigError::WorkingDirectory {
            reason: format!("{} is not valid UTF-8", path.display()),
        })
    }

    fn install_root(&self, working_dir: &Utf8Path) -> Utf8PathBuf {
        if let Some(dir) = &self.install_root {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .unwrap_or_else(|| {
                tracing::debug!("Install root unknown, using {}", working_dir);
                working_dir.to_path_buf()
            })
    }
}

/// Built-in defaults of the `[DXR]` section.
fn global_defaults(install_root: &Utf8Path, generated_date: String) -> Options {
    let mut defaults = Options::new();
    defaults.insert("dxrroot".into(), install_root.to_string());
    defaults.insert("plugin_folder".into(), "%(dxrroot)s/plugins".into());
    defaults.insert("nb_jobs".into(), "1".into());
    defaults.insert("temp_folder".into(), "/tmp/dxr-temp".into());
    defaults.insert("log_folder".into(), "%(temp_folder)s/logs".into());
    defaults.insert("template".into(), "%(dxrroot)s/templates/mozilla".into());
    defaults.insert("wwwroot".into(), "/".into());
    defaults.insert("enabled_plugins".into(), "*".into());
    defaults.insert("disabled_plugins".into(), " ".into());
    defaults.insert("directory_index".into(), ".dxr-directory-index.html".into());
    defaults.insert("generated_date".into(), generated_date);
    defaults
}

/// Built-in defaults of a tree section. Folder defaults live under the global ones.
fn tree_defaults(name: &str, global: &GlobalConfig) -> Options {
    let mut defaults = Options::new();
    defaults.insert("enabled_plugins".into(), "*".into());
    defaults.insert("disabled_plugins".into(), "".into());
    defaults.insert("temp_folder".into(), global.temp_folder.join(name).to_string());
    defaults.insert("log_folder".into(), global.log_folder.join(name).to_string());
    defaults.insert("ignore_patterns".into(), DEFAULT_IGNORE_PATTERNS.into());
    defaults.insert("build_command".into(), DEFAULT_BUILD_COMMAND.into());
    defaults
}

fn load_tree(
    raw: &RawConfig,
    name: &str,
    global: &GlobalConfig,
    working_dir: &Utf8Path,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<TreeConfig, ConfigError> {
    let reader = SectionReader::new(raw, tree_defaults(name, global));
    let get = |key: &str| reader.get(name, key);

    let temp_folder = absolutize(get("temp_folder")?, working_dir);
    let log_folder = absolutize(get("log_folder")?, working_dir);
    let object_folder = absolutize(get("object_folder")?, working_dir);
    let source_folder = absolutize(get("source_folder")?, working_dir);
    let build_command = get("build_command")?;
    let ignore_patterns = get("ignore_patterns")?
        .split_whitespace()
        .map(str::to_string)
        .collect();

    // Never read from the file, even when the section sets it.
    let target_folder = global.target_folder.join(name);
    if reader.get_opt(name, "target_folder")?.is_some() {
        tracing::debug!("Ignoring target_folder set in [{}]", name);
    }

    let extensions = extension_keys(reader.declared_items(name)?);

    let plugins = resolve_plugins(
        PluginScope::Tree {
            name,
            parent: &global.plugins,
        },
        &PluginSpec::parse(&get("enabled_plugins")?),
        &PluginSpec::parse(&get("disabled_plugins")?),
    )?;

    if !build_command.contains(JOBS_PLACEHOLDER) {
        let warning = ConfigWarning::BuildCommandMissingJobsPlaceholder {
            tree: name.to_string(),
        };
        tracing::warn!("{}", warning);
        warnings.push(warning);
    }

    tracing::debug!("Loaded tree '{}' from {}", name, source_folder);
    Ok(TreeConfig {
        name: name.to_string(),
        source_folder,
        object_folder,
        target_folder,
        temp_folder,
        log_folder,
        build_command,
        ignore_patterns,
        plugins,
        extensions,
    })
}

fn extension_keys(items: Options) -> IndexMap<String, String> {
    items
        .into_iter()
        .filter(|(key, _)| key.starts_with(EXTENSION_PREFIX))
        .collect()
}

fn parse_jobs(value: String) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(jobs) if jobs > 0 => Ok(jobs),
        _ => Err(ConfigError::InvalidValue {
            section: GLOBAL_SECTION.to_string(),
            key: "nb_jobs".to_string(),
            reason: "expected a positive integer".to_string(),
            value,
        }),
    }
}

/// Drop one trailing `/`. Only the last character is checked.
fn strip_trailing_slash(mut wwwroot: String) -> String {
    if wwwroot.ends_with('/') {
        wwwroot.pop();
    }
    wwwroot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_trailing_slash() {
        assert_eq!(strip_trailing_slash("/a/b/".to_string()), "/a/b");
        assert_eq!(strip_trailing_slash("/".to_string()), "");
        assert_eq!(strip_trailing_slash("/dxr//".to_string()), "/dxr/");
        assert_eq!(strip_trailing_slash("/dxr".to_string()), "/dxr");
        assert_eq!(strip_trailing_slash(String::new()), "");
    }

    #[test]
    fn test_parse_jobs() {
        assert_eq!(parse_jobs(" 8 ".to_string()).unwrap(), 8);
        assert!(matches!(
            parse_jobs("0".to_string()),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "nb_jobs"
        ));
        assert!(parse_jobs("many".to_string()).is_err());
    }

    #[test]
    fn test_reserved_sections() {
        assert!(is_reserved_section("DXR"));
        assert!(is_reserved_section("Template"));
        assert!(!is_reserved_section("mozilla-central"));
        assert!(!is_reserved_section("dxr"));
        assert!(!is_reserved_section("template"));
    }

    #[test]
    fn test_extension_keys_filter_prefix() {
        let mut items = Options::new();
        items.insert("plugin_clang_flags".to_string(), "-O2".to_string());
        items.insert("source_folder".to_string(), "/src".to_string());
        items.insert("plugin_buglink_url".to_string(), "https://bugzil.la/%s".to_string());

        let extensions = extension_keys(items);
        assert_eq!(extensions.len(), 2);
        assert_eq!(extensions["plugin_clang_flags"], "-O2");
        assert!(!extensions.contains_key("source_folder"));
    }

    #[test]
    fn test_global_defaults_complete() {
        let defaults = global_defaults(Utf8Path::new("/opt/dxr"), "now".to_string());
        assert_eq!(defaults["dxrroot"], "/opt/dxr");
        assert_eq!(defaults["disabled_plugins"], " ");
        assert!(!defaults.contains_key("target_folder"));
    }
}
