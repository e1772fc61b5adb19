use std::io::{self, Read, Seek, Write};
use std::time::{Duration, SystemTime};

/// Metadata reported for an open device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStat {
    /// Size in bytes; zero for character devices.
    pub size: u64,
    pub is_terminal: bool,
    pub is_char_device: bool,
    pub readonly: bool,
    pub modified: Option<SystemTime>,
}

/// An open OS-level handle to a serial device.
///
/// Implemented by [`SerialFile`](crate::SerialFile) for real devices. Dropping
/// the value releases the OS handle.
pub trait NativeHandle: Read + Write + Seek + Send + std::fmt::Debug {
    /// Truncate or extend the underlying file.
    fn truncate(&mut self, size: u64) -> io::Result<()>;

    fn stat(&self) -> io::Result<DeviceStat>;

    /// Whether the handle refers to a terminal (tty) device.
    fn is_terminal(&self) -> bool;

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()>;

    /// Wait up to `timeout` for input. Returns `false` on timeout.
    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool>;
}
