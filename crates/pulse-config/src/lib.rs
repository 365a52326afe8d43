//! Configuration system for Pulse Globe.
//!
//! Settings persist to disk as a RON file, can be overridden from the command
//! line via clap, and tolerate missing or unknown fields so old config files
//! keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CameraConfig, CaptureConfig, Config, DebugConfig, GraphConfig, PropagationConfig,
    RenderConfig, TimingConfig, WindowConfig, default_config_dir,
};
pub use error::ConfigError;
