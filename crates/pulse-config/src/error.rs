//! Configuration error types.

use std::path::PathBuf;

/// Errors raised while locating, reading, or writing `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The platform exposes no per-user configuration directory.
    #[error("no configuration directory available on this platform")]
    NoConfigDir,

    /// The config file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file or its directory could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid RON for [`Config`](crate::Config).
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    /// Serializing the in-memory config failed.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),
}
