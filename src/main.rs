//! dxr-config - resolve a DXR configuration file and print the result.
//!
//! # Execution Flow
//!
//! 1. Parse the command line
//! 2. Initialize logging (stderr, plus rotating files with `--log-dir`)
//! 3. Load the configuration with any `--set` overrides applied to `[DXR]`
//! 4. Print the resolved configuration as YAML or JSON
//!
//! Any configuration error is fatal: it is logged and the process exits with status 1.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use dxr_config::config::Options;
use dxr_config::{APP_NAME, ConfigLoader, VERSION};
use std::process;

#[derive(Parser)]
#[command(name = "dxr-config")]
#[command(about = "Resolve and print a DXR configuration", version)]
struct Cli {
    /// Path to the configuration file
    config: Utf8PathBuf,

    /// Override a [DXR] key, e.g. `--set nb_jobs=8` (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, String)>,

    /// Also write logs to rotating files in this directory
    #[arg(long)]
    log_dir: Option<Utf8PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn parse_override(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", arg));
    }
    Ok((key.to_string(), value.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let guard = dxr_config::logging::setup_logging(cli.log_dir.as_deref(), APP_NAME, cli.debug)?;

    tracing::debug!("Starting {} v{}", APP_NAME, VERSION);

    let overrides: Options = cli.overrides.into_iter().collect();
    let config = match ConfigLoader::new(&cli.config).with_overrides(overrides).load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            drop(guard);
            process::exit(1);
        }
    };

    let rendered = match cli.format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(&config)
            .context("Failed to serialize configuration to YAML")?,
        OutputFormat::Json => serde_json::to_string_pretty(&config)
            .context("Failed to serialize configuration to JSON")?,
    };
    println!("{}", rendered);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("nb_jobs=8").unwrap(),
            ("nb_jobs".to_string(), "8".to_string())
        );
        assert_eq!(
            parse_override("wwwroot=/dxr=root").unwrap(),
            ("wwwroot".to_string(), "/dxr=root".to_string())
        );
        assert!(parse_override("nb_jobs").is_err());
        assert!(parse_override("=8").is_err());
    }

    #[test]
    fn test_cli_parses_repeated_overrides() {
        let cli = Cli::try_parse_from([
            "dxr-config",
            "dxr.config",
            "--set",
            "nb_jobs=4",
            "--set",
            "wwwroot=/dxr/",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, Utf8PathBuf::from("dxr.config"));
        assert_eq!(cli.overrides.len(), 2);
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
