use std::io::{self, ErrorKind, Read, SeekFrom, Write};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::address::DeviceAddress;
use crate::error::{DeviceError, Result};
use crate::native::{DeviceStat, NativeHandle};

/// Result of a single read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// At least one byte was read.
    Data(Bytes),
    /// No data is available right now. Not end-of-stream.
    WouldBlock,
    /// The device reported end-of-stream.
    Eof,
}

/// Per-handle I/O settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOption {
    /// `true` for blocking reads and writes.
    Blocking(bool),
    /// Longest a blocking read waits for input. `Duration::ZERO` waits forever.
    ReadTimeout(Duration),
    /// Bytes requested from the device per read. Zero reads exactly what was asked for.
    ReadBuffer(usize),
    /// Bytes held back before writing to the device. Zero writes through.
    WriteBuffer(usize),
}

/// An open, configured serial device.
///
/// Created by the configurator once the device is ready. The handle has a
/// single owner and is not synchronized. [`close`](Self::close) is idempotent
/// and also runs on drop.
#[derive(Debug)]
pub struct DeviceHandle {
    inner: Option<Box<dyn NativeHandle>>,
    address: DeviceAddress,
    errors_suppressed: bool,
    blocking: bool,
    read_timeout: Duration,
    read_buffer: usize,
    write_buffer: usize,
    pending_read: BytesMut,
    pending_write: BytesMut,
    eof: bool,
}

impl DeviceHandle {
    pub(crate) fn new(
        inner: Box<dyn NativeHandle>,
        address: DeviceAddress,
        errors_suppressed: bool,
    ) -> Self {
        Self {
            inner: Some(inner),
            address,
            errors_suppressed,
            blocking: true,
            read_timeout: Duration::ZERO,
            read_buffer: 0,
            write_buffer: 0,
            pending_read: BytesMut::new(),
            pending_write: BytesMut::new(),
            eof: false,
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Whether failures on this handle are only logged at debug level.
    pub fn errors_suppressed(&self) -> bool {
        self.errors_suppressed
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.is_terminal())
    }

    /// Whether the last read hit end-of-stream.
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Read up to `count` bytes.
    ///
    /// In non-blocking mode, or when a read timeout expires, an empty
    /// device yields [`ReadOutcome::WouldBlock`] rather than `Eof`.
    pub fn read(&mut self, count: usize) -> Result<ReadOutcome> {
        self.native()?;
        if count == 0 {
            return Ok(ReadOutcome::Data(Bytes::new()));
        }
        if !self.pending_read.is_empty() {
            let take = count.min(self.pending_read.len());
            return Ok(ReadOutcome::Data(self.pending_read.split_to(take).freeze()));
        }

        let wait = self.blocking && !self.read_timeout.is_zero();
        let timeout = self.read_timeout;
        let mut chunk = BytesMut::zeroed(count.max(self.read_buffer));
        let native = self.native()?;

        if wait && !native.poll_readable(timeout)? {
            return Ok(ReadOutcome::WouldBlock);
        }

        let read = loop {
            match native.read(&mut chunk) {
                Ok(read) => break read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Ok(ReadOutcome::WouldBlock)
                }
                Err(err) => return Err(err.into()),
            }
        };

        if read == 0 {
            self.eof = true;
            return Ok(ReadOutcome::Eof);
        }
        self.eof = false;

        chunk.truncate(read);
        if read > count {
            self.pending_read = chunk.split_off(count);
        }
        Ok(ReadOutcome::Data(chunk.freeze()))
    }

    /// Write `data`, returning how many bytes were accepted.
    ///
    /// A non-blocking device that cannot take data right now accepts zero.
    /// Buffered data counts as accepted once it is held; a full device
    /// leaves it pending for the next write or flush.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.write_buffer > 0 {
            self.native()?;
            self.pending_write.extend_from_slice(data);
            if self.pending_write.len() >= self.write_buffer {
                match self.flush_pending() {
                    Ok(()) => {}
                    Err(DeviceError::Io(err)) if err.kind() == ErrorKind::WouldBlock => {
                        debug!(
                            device = %self.address,
                            pending = self.pending_write.len(),
                            "device full, keeping buffered data"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
            return Ok(data.len());
        }

        let native = self.native()?;
        loop {
            match native.write(data) {
                Ok(written) => return Ok(written),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Write out buffered data and flush the device.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_pending()?;
        self.native()?.flush()?;
        Ok(())
    }

    /// Move the stream position. Buffered input is discarded.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.flush_pending()?;
        let pos = match pos {
            SeekFrom::Current(offset) => i64::try_from(self.pending_read.len())
                .ok()
                .and_then(|buffered| offset.checked_sub(buffered))
                .map(SeekFrom::Current)
                .ok_or_else(|| io::Error::from(ErrorKind::InvalidInput))?,
            other => other,
        };
        let position = self.native()?.seek(pos)?;
        self.pending_read.clear();
        self.eof = false;
        Ok(position)
    }

    /// Current stream position, as seen by the reader.
    pub fn tell(&mut self) -> Result<u64> {
        self.seek(SeekFrom::Current(0))
    }

    pub fn truncate(&mut self, size: u64) -> Result<()> {
        self.flush_pending()?;
        self.native()?.truncate(size)?;
        Ok(())
    }

    pub fn stat(&self) -> Result<DeviceStat> {
        let native = self.inner.as_ref().ok_or(DeviceError::Closed)?;
        Ok(native.stat()?)
    }

    pub fn set_option(&mut self, option: HandleOption) -> Result<()> {
        match option {
            HandleOption::Blocking(blocking) => {
                let path = self.address.path().to_path_buf();
                self.native()?
                    .set_nonblocking(!blocking)
                    .map_err(|source| DeviceError::BlockingMode { path, source })?;
                self.blocking = blocking;
                debug!(device = %self.address, blocking, "changed blocking mode");
            }
            HandleOption::ReadTimeout(timeout) => self.read_timeout = timeout,
            HandleOption::ReadBuffer(size) => self.read_buffer = size,
            HandleOption::WriteBuffer(size) => {
                self.write_buffer = size;
                if size == 0 {
                    self.flush_pending()?;
                }
            }
        }
        Ok(())
    }

    /// Release the device. Calling this again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.inner.is_none() {
            return Ok(());
        }
        let flushed = self.flush_pending();
        self.pending_read.clear();
        self.pending_write.clear();
        if let Some(native) = self.inner.take() {
            drop(native);
            debug!(device = %self.address, "closed device");
        }
        flushed
    }

    fn native(&mut self) -> Result<&mut Box<dyn NativeHandle>> {
        self.inner.as_mut().ok_or(DeviceError::Closed)
    }

    fn flush_pending(&mut self) -> Result<()> {
        let Some(native) = self.inner.as_mut() else {
            return if self.pending_write.is_empty() {
                Ok(())
            } else {
                Err(DeviceError::Closed)
            };
        };

        while !self.pending_write.is_empty() {
            match native.write(&self.pending_write) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero).into()),
                Ok(written) => self.pending_write.advance(written),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            if self.errors_suppressed {
                debug!(device = %self.address, error = %err, "close failed");
            } else {
                warn!(device = %self.address, error = %err, "close failed");
            }
        }
    }
}

impl Read for DeviceHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match DeviceHandle::read(self, buf.len()).map_err(into_io)? {
            ReadOutcome::Data(data) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            ReadOutcome::WouldBlock => Err(ErrorKind::WouldBlock.into()),
            ReadOutcome::Eof => Ok(0),
        }
    }
}

impl Write for DeviceHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match DeviceHandle::write(self, buf).map_err(into_io)? {
            0 if !buf.is_empty() => Err(ErrorKind::WouldBlock.into()),
            written => Ok(written),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        DeviceHandle::flush(self).map_err(into_io)
    }
}

fn into_io(err: DeviceError) -> io::Error {
    match err {
        DeviceError::Io(err) => err,
        DeviceError::Closed => io::Error::new(ErrorKind::NotConnected, err.to_string()),
        other => io::Error::other(other.to_string()),
    }
}
