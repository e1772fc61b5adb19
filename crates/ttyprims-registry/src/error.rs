use ttyprims_config::ConfigError;
use ttyprims_device::DeviceError;

/// Errors that can occur while binding schemes or opening through them.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No configurator exists for the host platform.
    #[error("no serial configurator for this platform")]
    NotConcrete,

    /// The scheme could not be bound.
    #[error("cannot register scheme {scheme:?}: {reason}")]
    RegistrationFailed { scheme: String, reason: String },

    /// Nothing is bound to the scheme.
    #[error("scheme {0:?} is not registered")]
    NotRegistered(String),

    /// The address is not of the form `<scheme>://<device>`.
    #[error("invalid device uri {0:?}")]
    InvalidUri(String),

    /// Device-level failure.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Option map or line settings were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
