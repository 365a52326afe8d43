//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Pulse Globe command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "pulse-globe", about = "Signals spreading over a globe of cities")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Seed for the initial edge activation.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the offscreen glow pass.
    #[arg(long)]
    pub no_glow: bool,

    /// Write this many frames as PNG files, then exit.
    #[arg(long)]
    pub capture_frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(seed) = args.seed {
            self.graph.rng_seed = Some(seed);
        }
        if args.no_glow {
            self.render.glow = false;
        }
        if let Some(frames) = args.capture_frames {
            self.capture.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(1920),
            seed: Some(42),
            no_glow: true,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.graph.rng_seed, Some(42));
        assert!(!config.render.glow);
        // Non-overridden fields retain defaults
        assert_eq!(config.window.height, 1000);
        assert_eq!(config.capture.frames, 0);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::try_parse_from([
            "pulse-globe",
            "--capture-frames",
            "500",
            "--no-glow",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.capture_frames, Some(500));
        assert!(args.no_glow);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
