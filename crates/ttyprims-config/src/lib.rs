//! Serial link configuration model and platform command planning.
//!
//! This is the lowest layer of ttyprims and performs no I/O:
//! - [`SerialConfig`] holds one snapshot of the requested line settings
//! - [`SerialOptions`] is the loosely-typed option map used at the boundary
//! - [`plan`] turns a config into the platform's configuration tokens
//!
//! Everything that touches a device lives in `ttyprims-device`.

pub mod baud;
pub mod config;
pub mod error;
pub mod options;
pub mod plan;
pub mod platform;

pub use baud::BaudRate;
pub use config::{Parity, SerialConfig, DEFAULT_BOOT_DELAY, MIN_BOOT_DELAY};
pub use error::{ConfigError, Result};
pub use options::{CustomCommand, SerialOptions};
pub use plan::{plan, CommandPlan, Token};
pub use platform::Platform;
