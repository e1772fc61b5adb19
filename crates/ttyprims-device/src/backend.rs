use std::io;
use std::time::Duration;

use crate::address::DeviceAddress;
use crate::command::ConfigCommand;
use crate::native::NativeHandle;

/// Operating system services the configurator depends on.
///
/// [`OsBackend`](crate::OsBackend) is the real implementation.
pub trait DeviceBackend: Send + Sync + std::fmt::Debug {
    /// Whether a device exists at the resolved address.
    fn exists(&self, address: &DeviceAddress) -> bool;

    /// Open the device for binary read/write access.
    fn open(&self, address: &DeviceAddress) -> io::Result<Box<dyn NativeHandle>>;

    /// Run a configuration command to completion.
    ///
    /// A non-zero exit status is reported as an error.
    fn execute(&self, command: &ConfigCommand) -> io::Result<()>;

    /// Block the calling thread.
    fn sleep(&self, duration: Duration);
}
