/// Errors raised while validating or planning a serial configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The requested baud rate is not in the supported set.
    #[error("invalid baud rate option \"{0}\"")]
    InvalidBaudRate(i64),

    /// The parity code is not one of -1 (none), 0 (even), 1 (odd).
    #[error("invalid parity option \"{0}\"")]
    InvalidParity(i64),

    /// An option map entry had the wrong shape.
    #[error("invalid option {name}: {message}")]
    InvalidOption { name: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
