//! Pulse Globe: a spinning globe whose city connections light up as signals
//! spread between nearby cities.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p pulse-app -- --capture-frames 500` to dump frames.

use clap::Parser;
use pulse_config::{CliArgs, Config, default_config_dir};

fn main() {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map_or_else(default_config_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to resolve config directory: {e}");
            std::process::exit(1);
        }
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    pulse_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = pulse_app::run(config) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
