//! Recording backend and handle for sequencing tests.
//!
//! Every OS interaction is appended to a shared [`Journal`], so tests can
//! assert the exact order of opens, commands, sleeps, and mode switches.

use std::collections::HashSet;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::address::DeviceAddress;
use crate::backend::DeviceBackend;
use crate::command::ConfigCommand;
use crate::native::{DeviceStat, NativeHandle};

/// One observed interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Exists(PathBuf),
    Open(PathBuf),
    Execute(String),
    Sleep(Duration),
    IsTerminal,
    SetNonblocking(bool),
    Close,
}

/// Shared, ordered event log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<MockEvent>>>,
    written: Arc<Mutex<Vec<u8>>>,
    full: Arc<Mutex<bool>>,
}

impl Journal {
    pub fn events(&self) -> Vec<MockEvent> {
        lock(&self.events).clone()
    }

    /// Bytes written to any handle opened through this journal.
    pub fn written(&self) -> Vec<u8> {
        lock(&self.written).clone()
    }

    /// While full, every write reports `WouldBlock`.
    pub fn set_full(&self, full: bool) {
        *lock(&self.full) = full;
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
        lock(&self.written).clear();
    }

    /// Position of the first event matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&MockEvent) -> bool) -> Option<usize> {
        lock(&self.events).iter().position(predicate)
    }

    fn push(&self, event: MockEvent) {
        lock(&self.events).push(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory device handle.
///
/// Reads drain `input`. Once drained, a blocking read reports end-of-stream
/// and a non-blocking read reports `WouldBlock`.
#[derive(Debug)]
pub struct MockHandle {
    journal: Journal,
    input: Cursor<Vec<u8>>,
    terminal: bool,
    nonblocking: bool,
    fail_nonblocking: bool,
}

impl MockHandle {
    pub fn new(journal: Journal, input: Vec<u8>) -> Self {
        Self {
            journal,
            input: Cursor::new(input),
            terminal: true,
            nonblocking: false,
            fail_nonblocking: false,
        }
    }

    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn failing_nonblocking(mut self, fail: bool) -> Self {
        self.fail_nonblocking = fail;
        self
    }

    fn remaining(&self) -> u64 {
        (self.input.get_ref().len() as u64).saturating_sub(self.input.position())
    }
}

impl Read for MockHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining() == 0 && self.nonblocking {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.input.read(buf)
    }
}

impl Write for MockHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if *lock(&self.journal.full) {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        lock(&self.journal.written).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MockHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.input.seek(pos)
    }
}

impl NativeHandle for MockHandle {
    fn truncate(&mut self, size: u64) -> io::Result<()> {
        let size = usize::try_from(size).map_err(io::Error::other)?;
        self.input.get_mut().resize(size, 0);
        Ok(())
    }

    fn stat(&self) -> io::Result<DeviceStat> {
        Ok(DeviceStat {
            size: self.input.get_ref().len() as u64,
            is_terminal: self.terminal,
            is_char_device: self.terminal,
            readonly: false,
            modified: None,
        })
    }

    fn is_terminal(&self) -> bool {
        self.journal.push(MockEvent::IsTerminal);
        self.terminal
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        self.journal.push(MockEvent::SetNonblocking(nonblocking));
        if self.fail_nonblocking {
            return Err(io::Error::other("fcntl refused"));
        }
        self.nonblocking = nonblocking;
        Ok(())
    }

    fn poll_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(self.remaining() > 0)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.journal.push(MockEvent::Close);
    }
}

/// Backend whose devices, failures, and device output are scripted.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    journal: Journal,
    devices: HashSet<PathBuf>,
    input: Vec<u8>,
    not_a_terminal: bool,
    fail_open: bool,
    fail_nonblocking: bool,
    fail_commands: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a device exist at `path`.
    pub fn with_device(mut self, path: impl AsRef<Path>) -> Self {
        self.devices.insert(path.as_ref().to_path_buf());
        self
    }

    /// Bytes every opened handle will yield to reads.
    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = input.into();
        self
    }

    pub fn not_a_terminal(mut self) -> Self {
        self.not_a_terminal = true;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_nonblocking(mut self) -> Self {
        self.fail_nonblocking = true;
        self
    }

    pub fn failing_commands(mut self) -> Self {
        self.fail_commands = true;
        self
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}

impl DeviceBackend for MockBackend {
    fn exists(&self, address: &DeviceAddress) -> bool {
        self.journal
            .push(MockEvent::Exists(address.path().to_path_buf()));
        self.devices.contains(address.path())
    }

    fn open(&self, address: &DeviceAddress) -> io::Result<Box<dyn NativeHandle>> {
        self.journal.push(MockEvent::Open(address.path().to_path_buf()));
        if self.fail_open {
            return Err(io::ErrorKind::PermissionDenied.into());
        }
        let handle = MockHandle::new(self.journal.clone(), self.input.clone())
            .terminal(!self.not_a_terminal)
            .failing_nonblocking(self.fail_nonblocking);
        Ok(Box::new(handle))
    }

    fn execute(&self, command: &ConfigCommand) -> io::Result<()> {
        self.journal.push(MockEvent::Execute(command.to_string()));
        if self.fail_commands {
            return Err(io::Error::other("command not found"));
        }
        Ok(())
    }

    fn sleep(&self, duration: Duration) {
        self.journal.push(MockEvent::Sleep(duration));
    }
}
