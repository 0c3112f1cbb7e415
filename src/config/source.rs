//! Raw INI source with ConfigParser-style lookups.
//!
//! The file itself is parsed by `rust-ini`, with quote and escape handling
//! turned off so values reach the loader exactly as written. [`RawConfig`]
//! keeps the resulting sections in file order, and [`SectionReader`] layers
//! built-in defaults, the file's `[DEFAULT]` section and caller overrides on
//! top of it, resolving `%(name)s` references the way DXR configuration files
//! expect.

use super::error::ConfigError;
use camino::Utf8Path;
use indexmap::IndexMap;
use ini::{Ini, ParseOption};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Ordered key/value options of one section.
pub type Options = IndexMap<String, String>;

/// Name of the section whose keys act as fallbacks for every other section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Nested `%(name)s` references are expanded at most this many times.
const MAX_INTERPOLATION_DEPTH: usize = 10;

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\(([^)]*)\)s").expect("Invalid interpolation regex"));

/// Backslashes and quotes are part of the value.
fn parse_options() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

/// Sections and options of a configuration file, exactly as written.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    file_defaults: Options,
    sections: IndexMap<String, Options>,
}

impl RawConfig {
    /// Read an INI file from disk.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let document = Ini::load_from_file_opt(path, parse_options()).map_err(|source| {
            ConfigError::Read {
                origin: path.to_string(),
                source,
            }
        })?;
        Ok(Self::from_ini(path.as_str(), &document))
    }

    /// Parse INI text held in memory.
    ///
    /// `origin` only names the text in error messages.
    pub fn from_text(origin: &str, text: &str) -> Result<Self, ConfigError> {
        let document = Ini::load_from_str_opt(text, parse_options()).map_err(|e| ConfigError::Read {
            origin: origin.to_string(),
            source: ini::Error::Parse(e),
        })?;
        Ok(Self::from_ini(origin, &document))
    }

    fn from_ini(origin: &str, document: &Ini) -> Self {
        let mut raw = RawConfig::default();
        for (name, properties) in document.iter() {
            let Some(name) = name else {
                if !properties.is_empty() {
                    tracing::debug!("Ignoring {} keys outside of any section in {}", properties.len(), origin);
                }
                continue;
            };

            // Option names are case-insensitive, section names are not.
            let options = properties
                .iter()
                .map(|(key, value)| (key.to_lowercase(), value.to_string()));

            // A repeated section adds to the earlier one.
            if name == DEFAULT_SECTION {
                raw.file_defaults.extend(options);
            } else {
                raw.sections.entry(name.to_string()).or_default().extend(options);
            }
        }
        raw
    }

    /// Section names in file order, `[DEFAULT]` excluded.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    /// Section names are case-sensitive.
    fn section(&self, name: &str) -> Option<&Options> {
        self.sections.get(name)
    }
}

/// Read access to a [`RawConfig`] on top of a set of built-in defaults.
///
/// Precedence, highest first: per-call overrides, the section itself, the
/// file's `[DEFAULT]` section, the built-in defaults.
#[derive(Debug)]
pub struct SectionReader<'a> {
    raw: &'a RawConfig,
    defaults: Options,
}

impl<'a> SectionReader<'a> {
    pub fn new(raw: &'a RawConfig, defaults: Options) -> Self {
        Self { raw, defaults }
    }

    /// Interpolated value of `key`, failing with `MissingRequiredKey` when no layer has it.
    pub fn get(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        self.get_with(section, key, None)
    }

    /// Like [`get`](Self::get), with `overrides` taking precedence over every other layer.
    pub fn get_with(
        &self,
        section: &str,
        key: &str,
        overrides: Option<&Options>,
    ) -> Result<String, ConfigError> {
        self.get_opt_with(section, key, overrides)?
            .ok_or_else(|| ConfigError::MissingRequiredKey {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    pub fn get_opt(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        self.get_opt_with(section, key, None)
    }

    fn get_opt_with(
        &self,
        section: &str,
        key: &str,
        overrides: Option<&Options>,
    ) -> Result<Option<String>, ConfigError> {
        let vars = self.layered(section, overrides)?;
        let key = key.to_lowercase();
        match vars.get(&key) {
            Some(raw) => interpolate(section, &key, raw, &vars).map(Some),
            None => Ok(None),
        }
    }

    /// Integer value of `key`, if present.
    pub fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        let Some(value) = self.get_opt(section, key)? else {
            return Ok(None);
        };
        value
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            })
    }

    /// Whether `key` is set in the section or any default layer. Overrides are not consulted.
    pub fn has_option(&self, section: &str, key: &str) -> bool {
        let key = key.to_lowercase();
        match self.raw.section(section) {
            Some(options) => {
                options.contains_key(&key)
                    || self.raw.file_defaults.contains_key(&key)
                    || self.defaults.contains_key(&key)
            }
            None => false,
        }
    }

    /// Every option of the section, defaults included, interpolated.
    pub fn items(&self, section: &str) -> Result<Options, ConfigError> {
        let vars = self.layered(section, None)?;
        vars.iter()
            .map(|(key, raw)| Ok((key.clone(), interpolate(section, key, raw, &vars)?)))
            .collect()
    }

    /// Options written in the file for this section (its own keys plus `[DEFAULT]`),
    /// interpolated against every layer. Built-in defaults are not listed.
    pub fn declared_items(&self, section: &str) -> Result<Options, ConfigError> {
        let options = self.require_section(section)?;
        let vars = self.layered(section, None)?;
        self.raw
            .file_defaults
            .keys()
            .chain(options.keys())
            .map(|key| {
                let raw = &vars[key.as_str()];
                Ok((key.clone(), interpolate(section, key, raw, &vars)?))
            })
            .collect()
    }

    fn require_section(&self, section: &str) -> Result<&'a Options, ConfigError> {
        self.raw
            .section(section)
            .ok_or_else(|| ConfigError::MissingSection {
                section: section.to_string(),
            })
    }

    fn layered(&self, section: &str, overrides: Option<&Options>) -> Result<Options, ConfigError> {
        let options = self.require_section(section)?;

        let mut vars = self.defaults.clone();
        vars.extend(self.raw.file_defaults.clone());
        vars.extend(options.clone());
        if let Some(overrides) = overrides {
            vars.extend(
                overrides
                    .iter()
                    .map(|(key, value)| (key.to_lowercase(), value.clone())),
            );
        }
        Ok(vars)
    }
}

/// Expand `%(name)s` references in `raw` from `vars`.
///
/// `%%` becomes a literal `%` in any pass that expanded a reference.
fn interpolate(section: &str, key: &str, raw: &str, vars: &Options) -> Result<String, ConfigError> {
    let error = |reason: String| ConfigError::Interpolation {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    };

    let mut value = raw.to_string();
    for _ in 0..MAX_INTERPOLATION_DEPTH {
        if !value.contains("%(") {
            return Ok(value);
        }

        let mut missing = None;
        let expanded = REFERENCE_PATTERN.replace_all(&value, |caps: &Captures| {
            let name = caps[1].to_lowercase();
            match vars.get(&name) {
                Some(replacement) => replacement.clone(),
                None => {
                    missing.get_or_insert(name);
                    String::new()
                }
            }
        });
        if let Some(name) = missing {
            return Err(error(format!("bad reference '%({})s'", name)));
        }
        value = expanded.replace("%%", "%");
    }

    if value.contains("%(") {
        return Err(error(format!(
            "more than {} nested references in '{}'",
            MAX_INTERPOLATION_DEPTH, raw
        )));
    }
    Ok(value)
}
