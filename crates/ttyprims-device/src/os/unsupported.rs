use std::fs::{File, Metadata};
use std::io;
use std::path::Path;
use std::time::Duration;

fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "serial devices are not supported on this platform",
    )
}

pub(super) fn device_exists(path: &Path) -> bool {
    path.exists()
}

pub(super) fn open_device(_path: &Path) -> io::Result<File> {
    Err(unsupported())
}

pub(super) fn set_nonblocking(_file: &File, _nonblocking: bool) -> io::Result<()> {
    Err(unsupported())
}

pub(super) fn poll_readable(_file: &File, _timeout: Duration) -> io::Result<bool> {
    Err(unsupported())
}

pub(super) fn is_char_device(_metadata: &Metadata) -> bool {
    false
}
