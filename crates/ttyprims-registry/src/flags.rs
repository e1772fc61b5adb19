/// How failures surface from [`ProtocolRegistry::open_with_flags`].
///
/// [`ProtocolRegistry::open_with_flags`]: crate::ProtocolRegistry::open_with_flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Return failures as errors. When unset they collapse to `Ok(None)`.
    pub report_errors: bool,
    /// Search an include path for the device. Not supported.
    pub use_path: bool,
}

impl OpenFlags {
    pub const USE_PATH: u32 = 0x01;
    pub const REPORT_ERRORS: u32 = 0x08;

    pub fn reporting() -> Self {
        Self {
            report_errors: true,
            use_path: false,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    /// Decode host stream-open option bits. Unknown bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            report_errors: bits & Self::REPORT_ERRORS != 0,
            use_path: bits & Self::USE_PATH != 0,
        }
    }

    pub fn bits(self) -> u32 {
        let mut bits = 0;
        if self.report_errors {
            bits |= Self::REPORT_ERRORS;
        }
        if self.use_path {
            bits |= Self::USE_PATH;
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_host_bits() {
        assert_eq!(OpenFlags::from_bits(0), OpenFlags::silent());
        assert_eq!(OpenFlags::from_bits(0x08), OpenFlags::reporting());
        let both = OpenFlags::from_bits(0x09 | 0x100);
        assert!(both.report_errors && both.use_path);
        assert_eq!(both.bits(), 0x09);
    }
}
