//! Error types for scenesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// `init` without `force` found an existing file.
    #[error("config already exists at {path}")]
    AlreadyExists { path: PathBuf },

    /// Parsed fine but the values cannot drive a session.
    #[error("invalid config: {0}")]
    Invalid(String),
}
