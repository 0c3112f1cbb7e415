use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing::Subscriber;
use tracing_appender::rolling;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Console output on stderr, keeping stdout free for command output.
fn console_layer<S>() -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
}

/// Setup logging to stderr, plus a daily rotating log file when `log_dir` is given.
///
/// Console output goes to stderr so that configuration warnings land on the
/// error stream and stdout stays free for command output.
///
/// # Arguments
/// * `log_dir` - Directory for log files, created if missing
/// * `log_prefix` - Prefix for log files (e.g., "dxr-config")
/// * `debug_mode` - If true, use debug level; otherwise use info level
///
/// # Returns
/// The file writer's guard, which must be held for the duration of the program
/// to keep file logging active. `None` when only the console is used.
pub fn setup_logging(
    log_dir: Option<&Utf8Path>,
    log_prefix: &str,
    debug_mode: bool,
) -> Result<Option<WorkerGuard>> {
    // Determine log level based on debug mode
    let env_filter = if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer())
            .try_init()
            .context("Failed to install log subscriber")?;

        tracing::debug!("Logging initialized: console only, debug={}", debug_mode);
        return Ok(None);
    };

    // Create log directory if it doesn't exist
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    // Create daily rotating file appender
    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer())
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!(
        "Logging initialized: dir={}, prefix={}, debug={}",
        log_dir,
        log_prefix,
        debug_mode
    );

    Ok(Some(guard))
}
