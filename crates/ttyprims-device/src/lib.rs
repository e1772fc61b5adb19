//! Serial device resolution, configuration sequencing, and handles.
//!
//! Many USB-serial adapters reset the attached microcontroller when the port
//! is opened. Configuring the line therefore has to be ordered carefully
//! against the native open and a boot delay, and that order differs between
//! POSIX and Windows. [`SerialConfigurator`] owns that ordering; the
//! [`PlatformDriver`] implementations hold the per-platform sequence.
//!
//! OS access goes through [`DeviceBackend`] so the sequence can be observed
//! in tests (see the `test-util` feature).

pub mod address;
pub mod backend;
pub mod command;
pub mod configurator;
pub mod driver;
pub mod error;
pub mod handle;
pub mod native;
pub mod os;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use address::{resolve, strip_scheme, DeviceAddress};
pub use backend::DeviceBackend;
pub use command::ConfigCommand;
pub use configurator::SerialConfigurator;
pub use driver::{driver_for, PlatformDriver, PosixDriver, WindowsDriver};
pub use error::{DeviceError, Result};
pub use handle::{DeviceHandle, HandleOption, ReadOutcome};
pub use native::{DeviceStat, NativeHandle};
pub use os::{OsBackend, SerialFile};
