//! File helpers used by the build stages: `$name` substitution and log files.

use anyhow::{Context, Result};
use camino::Utf8Path;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::fs;
use std::sync::LazyLock;

/// Matches `$$`, `$name` and `${name}`.
static VARIABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(?P<escaped>\$)|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\})")
        .expect("Invalid substitution regex")
});

/// Replace `$name` and `${name}` with values from `vars`.
///
/// Unknown names are left as written and `$$` becomes `$`.
pub fn substitute(text: &str, vars: &IndexMap<String, String>) -> String {
    VARIABLE_PATTERN
        .replace_all(text, |caps: &Captures| {
            if caps.name("escaped").is_some() {
                return "$".to_string();
            }
            let name = caps
                .name("named")
                .or_else(|| caps.name("braced"))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Run [`substitute`] over a file in place.
///
/// Used on generated sources; the input file should say which variables it expects.
pub fn substitute_in_file(path: &Utf8Path, vars: &IndexMap<String, String>) -> Result<()> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file for substitution: {}", path))?;

    fs::write(path, substitute(&data, vars))
        .with_context(|| format!("Failed to write substituted file: {}", path))?;

    tracing::debug!("Substituted {} variables in {}", vars.len(), path);
    Ok(())
}

/// Anything that owns a log folder: the global configuration or a tree.
pub trait LogScope {
    fn log_folder(&self) -> &Utf8Path;
}

/// Create (or truncate) the log file `name` in the scope's log folder.
pub fn open_log<S: LogScope + ?Sized>(scope: &S, name: &str) -> Result<fs::File> {
    let folder = scope.log_folder();
    if !folder.exists() {
        fs::create_dir_all(folder)
            .with_context(|| format!("Failed to create log directory: {}", folder))?;
    }

    let path = folder.join(name);
    fs::File::create(&path).with_context(|| format!("Failed to open log file: {}", path))
}
