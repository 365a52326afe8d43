//! Structured logging for Pulse Globe.
//!
//! Console output carries uptime timestamps and module paths; debug builds
//! additionally write JSON lines to `pulse.log` for looking back at a run.
//! Library crates emit through the `log` facade, which `tracing-subscriber`
//! picks up alongside native `tracing` events from the app.

use pulse_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config say otherwise.
pub const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "pulse.log";

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - whether to attach the file layer
/// * `config` - source of the `debug.log_level` filter
///
/// `RUST_LOG` always wins over the config. Calling this twice is harmless:
/// the second subscriber is rejected and a warning is logged through the first.
///
/// ```no_run
/// use pulse_config::Config;
///
/// let config = Config::default();
/// pulse_log::init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_for(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        if subscriber.with(file_layer).try_init().is_err() {
            tracing::warn!("logging already initialized");
        }
        return;
    }

    if subscriber.try_init().is_err() {
        tracing::warn!("logging already initialized");
    }
}

/// The filter string for a config: its `log_level` unless empty.
///
/// A bare level such as `"debug"` keeps wgpu and naga at `warn`; anything
/// containing a directive (`=` or `,`) is passed through untouched.
pub fn filter_for(config: Option<&Config>) -> String {
    match config.map(|c| c.debug.log_level.trim()) {
        Some(level) if !level.is_empty() => {
            if level.contains('=') || level.contains(',') {
                level.to_string()
            } else {
                format!("{level},wgpu=warn,naga=warn")
            }
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// `EnvFilter` with [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
