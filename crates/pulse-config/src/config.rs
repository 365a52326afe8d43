//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";
const APP_DIR: &str = "pulse-globe";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Proximity graph construction.
    pub graph: GraphConfig,
    /// Signal propagation rules.
    pub propagation: PropagationConfig,
    /// Orbital camera.
    pub camera: CameraConfig,
    /// Frame timing.
    pub timing: TimingConfig,
    /// Offline frame dumping.
    pub capture: CaptureConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// MSAA sample count for the screen pass (1 or 4).
    pub msaa_samples: u32,
    /// Render the offscreen glow pass and composite it over the scene.
    pub glow: bool,
    /// Glow target is `surface / glow_downscale` in each dimension.
    pub glow_downscale: u32,
    /// Blur tap spacing in glow texels.
    pub glow_radius: f32,
    /// Multiplier applied when compositing the blurred glow.
    pub glow_intensity: f32,
    /// Icosphere subdivision level for the globe mesh.
    pub globe_subdivisions: u32,
}

/// Proximity graph construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Cities closer than this (unit-sphere chord length) are connected.
    pub threshold: f32,
    /// Arc bulge for the shortest connections.
    pub min_height: f32,
    /// Arc bulge for connections right at the threshold.
    pub max_height: f32,
    /// Each edge starts active with probability `1 / seed_one_in`.
    pub seed_one_in: u32,
    /// Fixed RNG seed for reproducible runs; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

/// Propagation rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PropagationConfig {
    /// Progress added to every active edge per tick.
    pub step: f32,
    /// Maximum edges a completing edge activates at its target.
    pub fan_out: u32,
}

/// Orbital camera parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Eye position; the camera always looks at the origin.
    pub eye: [f32; 3],
    /// Globe rotation speed in radians per second of `cur_time`.
    pub angular_speed: f32,
    /// Globe rotation at `cur_time == 0`, in radians.
    pub phase: f32,
}

/// Frame timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Fixed `cur_time` increment per rendered frame, in seconds.
    pub frame_dt: f32,
    /// When set, propagation ticks run at this rate instead of once per frame.
    pub fixed_rate_hz: Option<f64>,
}

/// Frame dump settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Number of frames to write before exiting; 0 disables capture.
    pub frames: u32,
    /// `cur_time` increment per captured frame.
    pub frame_dt: f32,
    /// Directory receiving `NNNNN.png` files.
    pub output_dir: PathBuf,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter override (e.g., "debug", "info,pulse_graph=trace").
    pub log_level: String,
    /// Log a propagation summary every this many frames; 0 disables it.
    pub stats_interval: u32,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            vsync: true,
            title: "Pulse Globe".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            msaa_samples: 4,
            glow: true,
            glow_downscale: 2,
            glow_radius: 1.0,
            glow_intensity: 1.0,
            globe_subdivisions: 6,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            min_height: 0.05,
            max_height: 0.3,
            seed_one_in: 150,
            rng_seed: None,
        }
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            step: 0.02,
            fan_out: 3,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            eye: [0.0, 1.3, 3.0],
            angular_speed: -0.2 * 0.75,
            phase: 1.5,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frame_dt: 1.0 / 60.0,
            fixed_rate_hz: None,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames: 0,
            frame_dt: 1.0 / 40.0,
            output_dir: PathBuf::from("frames"),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval: 300,
        }
    }
}

impl CaptureConfig {
    /// True when frames should be written to disk.
    pub fn enabled(&self) -> bool {
        self.frames > 0
    }
}

impl Config {
    /// The `cur_time` step to use per rendered frame.
    ///
    /// Captured runs use their own step so the dumped animation plays at a
    /// fixed speed regardless of how long each frame takes to write.
    pub fn frame_dt(&self) -> f32 {
        if self.capture.enabled() {
            self.capture.frame_dt
        } else {
            self.timing.frame_dt
        }
    }
}

/// Platform config directory for Pulse Globe (e.g. `~/.config/pulse-globe`).
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join(APP_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })
    }

    /// Re-read the file; returns `Some(new_config)` if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
