use std::fmt;

/// Host platform family, as far as serial configuration is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux: `stty -F <path>`.
    Linux,
    /// macOS and the BSDs: `stty -f <path>`.
    Bsd,
    /// Windows: `mode <device>`.
    Windows,
}

impl Platform {
    /// Platform this binary was compiled for.
    ///
    /// Returns `None` on targets with neither a tty layer nor COM ports.
    pub fn current() -> Option<Self> {
        if cfg!(windows) {
            Some(Self::Windows)
        } else if cfg!(any(target_os = "linux", target_os = "android")) {
            Some(Self::Linux)
        } else if cfg!(unix) {
            Some(Self::Bsd)
        } else {
            None
        }
    }

    /// Whether the platform uses the POSIX tty model.
    pub fn is_posix(self) -> bool {
        !matches!(self, Self::Windows)
    }

    /// Lowercase name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Bsd => "bsd",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
