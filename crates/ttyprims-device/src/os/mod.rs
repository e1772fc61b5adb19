//! Real operating system backend.

use std::fs::File;
use std::io::{self, IsTerminal, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tracing::debug;

use crate::address::DeviceAddress;
use crate::backend::DeviceBackend;
use crate::command::ConfigCommand;
use crate::native::{DeviceStat, NativeHandle};

#[cfg(not(any(unix, windows)))]
#[path = "unsupported.rs"]
mod sys;
#[cfg(unix)]
#[path = "unix.rs"]
mod sys;
#[cfg(windows)]
#[path = "windows.rs"]
mod sys;

/// Backend that talks to the host OS: filesystem, processes, and sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsBackend;

impl DeviceBackend for OsBackend {
    fn exists(&self, address: &DeviceAddress) -> bool {
        sys::device_exists(address.path())
    }

    fn open(&self, address: &DeviceAddress) -> io::Result<Box<dyn NativeHandle>> {
        let file = SerialFile::open(address.path())?;
        Ok(Box::new(file))
    }

    fn execute(&self, command: &ConfigCommand) -> io::Result<()> {
        debug!(%command, "running configuration command");
        let output = command
            .to_process()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(io::Error::other(format!(
            "`{command}` exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A serial device opened for binary read/write access.
#[derive(Debug)]
pub struct SerialFile {
    file: File,
    path: PathBuf,
    nonblocking: bool,
}

impl SerialFile {
    /// Open `path` read/write without creating it.
    ///
    /// On unix the device never becomes the controlling terminal.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = sys::open_device(path)?;
        debug!(?path, "opened device");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            nonblocking: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for SerialFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.file.read(buf)?;
        // Non-blocking COM reads report "nothing yet" as a zero-length read.
        if read == 0 && !buf.is_empty() && self.nonblocking && cfg!(windows) {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        Ok(read)
    }
}

impl Write for SerialFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for SerialFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl NativeHandle for SerialFile {
    fn truncate(&mut self, size: u64) -> io::Result<()> {
        self.file.set_len(size)
    }

    fn stat(&self) -> io::Result<DeviceStat> {
        let metadata = self.file.metadata()?;
        Ok(DeviceStat {
            size: metadata.len(),
            is_terminal: self.is_terminal(),
            is_char_device: sys::is_char_device(&metadata),
            readonly: metadata.permissions().readonly(),
            modified: metadata.modified().ok(),
        })
    }

    fn is_terminal(&self) -> bool {
        self.file.is_terminal()
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        sys::set_nonblocking(&self.file, nonblocking)?;
        self.nonblocking = nonblocking;
        Ok(())
    }

    fn poll_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        sys::poll_readable(&self.file, timeout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn scratch_file(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ttyprims-os-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::write(&path, b"0123456789").expect("scratch file should be writable");
        path
    }

    #[test]
    fn regular_file_is_not_a_terminal() {
        let path = scratch_file("tty");
        let file = SerialFile::open(&path).expect("scratch file should open");
        assert!(!file.is_terminal());

        let stat = file.stat().expect("stat should succeed");
        assert_eq!(stat.size, 10);
        assert!(!stat.is_char_device);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn open_does_not_create_missing_paths() {
        let path = scratch_file("missing");
        std::fs::remove_file(&path).unwrap();
        let err = SerialFile::open(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!path.exists());
    }

    #[test]
    fn nonblocking_flag_round_trips() {
        let path = scratch_file("nonblock");
        let mut file = SerialFile::open(&path).unwrap();
        file.set_nonblocking(true).expect("O_NONBLOCK should be settable");
        file.set_nonblocking(false).expect("O_NONBLOCK should be clearable");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn failing_command_reports_exit_status() {
        let command = ConfigCommand::new("sh", vec!["-c".into(), "echo nope >&2; exit 3".into()]);
        let err = OsBackend.execute(&command).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nope"), "{message}");
    }

    #[test]
    fn missing_program_is_an_error() {
        let command = ConfigCommand::new("ttyprims-definitely-not-a-program", Vec::new());
        assert!(OsBackend.execute(&command).is_err());
    }
}
