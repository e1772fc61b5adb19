use std::fmt;
use std::path::{Path, PathBuf};

use ttyprims_config::Platform;

/// A device as named by the caller and as located on this platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    logical: String,
    path: PathBuf,
}

impl DeviceAddress {
    pub fn new(logical: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            logical: logical.into(),
            path: path.into(),
        }
    }

    /// Name as given by the caller, without the scheme.
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Platform-qualified path, e.g. `/dev/ttyACM0` or `com3`.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Remove a leading `<scheme>://`, if present.
pub fn strip_scheme<'a>(path: &'a str, scheme: &str) -> &'a str {
    path.strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix("://"))
        .unwrap_or(path)
}

/// Resolve a (possibly scheme-prefixed) device name for `platform`.
///
/// Never fails: names that cannot be interpreted are passed through and
/// will fail at open time instead.
pub fn resolve(path: &str, scheme: &str, platform: Platform) -> DeviceAddress {
    let logical = strip_scheme(path, scheme);
    let resolved = match platform {
        Platform::Linux | Platform::Bsd => posix_path(logical),
        Platform::Windows => windows_port(logical).unwrap_or_else(|| logical.to_string()),
    };
    DeviceAddress::new(logical, resolved)
}

fn posix_path(logical: &str) -> String {
    if logical.starts_with('/') {
        logical.to_string()
    } else {
        format!("/dev/{logical}")
    }
}

/// `3`, `com3`, `COM03` -> `com3`.
fn windows_port(logical: &str) -> Option<String> {
    let digits = match logical.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("com") => &logical[3..],
        _ => logical,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u32 = digits.parse().ok()?;
    Some(format!("com{number}"))
}
