use std::path::PathBuf;

use ttyprims_config::ConfigError;

/// Errors that can occur while opening, configuring, or using a device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The resolved device path does not exist.
    #[error("device {path} does not exist")]
    NotFound { path: PathBuf },

    /// The native open call failed.
    #[error("failed to open device {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The opened handle does not refer to a terminal device.
    #[error("device {path} is not a tty")]
    NotATerminal { path: PathBuf },

    /// Switching between blocking and non-blocking I/O failed.
    #[error("failed to change blocking mode on {path}: {source}")]
    BlockingMode {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The line settings could not be planned.
    #[error("invalid configuration for {path}: {source}")]
    Config {
        path: PathBuf,
        source: ConfigError,
    },

    /// The handle was already closed.
    #[error("device handle is closed")]
    Closed,

    /// An I/O error occurred on an open handle.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
