use std::fs::{File, Metadata, OpenOptions};
use std::io;
use std::os::windows::io::AsRawHandle;
use std::path::{Path, PathBuf};
use std::time::Duration;

use windows_sys::Win32::Devices::Communication::{SetCommTimeouts, COMMTIMEOUTS};
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::Storage::FileSystem::QueryDosDeviceW;

const DOS_TARGET_CAPACITY: usize = 512;

fn com_name(path: &Path) -> Option<&str> {
    let name = path.to_str()?;
    let digits = name.get(3..)?;
    let is_com = name[..3].eq_ignore_ascii_case("com")
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit());
    is_com.then_some(name)
}

pub(super) fn device_exists(path: &Path) -> bool {
    let Some(name) = com_name(path) else {
        return path.exists();
    };

    let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
    let mut target = [0u16; DOS_TARGET_CAPACITY];

    // SAFETY: `wide` is NUL-terminated and `target` is writable for the given length.
    let written =
        unsafe { QueryDosDeviceW(wide.as_ptr(), target.as_mut_ptr(), target.len() as u32) };
    written != 0
}

/// `com10` and above are only reachable through the `\\.\` namespace.
fn native_path(path: &Path) -> PathBuf {
    match com_name(path) {
        Some(name) => PathBuf::from(format!(r"\\.\{name}")),
        None => path.to_path_buf(),
    }
}

pub(super) fn open_device(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(native_path(path))
}

pub(super) fn set_nonblocking(file: &File, nonblocking: bool) -> io::Result<()> {
    // MAXDWORD interval with zero totals returns immediately with what is buffered.
    let timeouts = COMMTIMEOUTS {
        ReadIntervalTimeout: if nonblocking { u32::MAX } else { 0 },
        ReadTotalTimeoutMultiplier: 0,
        ReadTotalTimeoutConstant: 0,
        WriteTotalTimeoutMultiplier: 0,
        WriteTotalTimeoutConstant: 0,
    };

    // SAFETY: the handle is owned by `file` and `timeouts` outlives the call.
    let ok = unsafe { SetCommTimeouts(file.as_raw_handle() as HANDLE, &timeouts) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// COM handles expose no readiness; reads are governed by COMMTIMEOUTS.
pub(super) fn poll_readable(_file: &File, _timeout: Duration) -> io::Result<bool> {
    Ok(true)
}

pub(super) fn is_char_device(metadata: &Metadata) -> bool {
    !metadata.is_file() && !metadata.is_dir()
}
