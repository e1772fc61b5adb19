//! Virtual-scheme bindings for configured serial devices.
//!
//! A [`ProtocolRegistry`] maps a scheme such as `arduino://` to a
//! configurator and a layer of default options, so callers open devices by
//! URI. [`OpenFlags`] adapts results for hosts that expect a silent failure
//! sentinel instead of an error.

pub mod error;
pub mod flags;
pub mod registry;

pub use error::{RegistryError, Result};
pub use flags::OpenFlags;
pub use registry::{split_uri, validate_scheme, Binding, ProtocolRegistry, DEFAULT_SCHEME};
