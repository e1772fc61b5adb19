use std::fmt;

use crate::platform::Platform;

/// Baud rates supported on every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaudRate {
    B300,
    B600,
    B1200,
    B2400,
    B4800,
    B9600,
    B14400,
    B19200,
    B28800,
    B31250,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 13] = [
        Self::B300,
        Self::B600,
        Self::B1200,
        Self::B2400,
        Self::B4800,
        Self::B9600,
        Self::B14400,
        Self::B19200,
        Self::B28800,
        Self::B31250,
        Self::B38400,
        Self::B57600,
        Self::B115200,
    ];

    /// Look up a rate in bits per second.
    pub fn from_rate(rate: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|b| i64::from(b.as_u32()) == rate)
    }

    /// Rate in bits per second.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::B300 => 300,
            Self::B600 => 600,
            Self::B1200 => 1_200,
            Self::B2400 => 2_400,
            Self::B4800 => 4_800,
            Self::B9600 => 9_600,
            Self::B14400 => 14_400,
            Self::B19200 => 19_200,
            Self::B28800 => 28_800,
            Self::B31250 => 31_250,
            Self::B38400 => 38_400,
            Self::B57600 => 57_600,
            Self::B115200 => 115_200,
        }
    }

    /// Value understood by `mode`: the leading digits up to 19200, raw above.
    pub fn windows_code(self) -> u32 {
        match self {
            Self::B300 => 30,
            Self::B600 => 60,
            Self::B1200 => 12,
            Self::B2400 => 24,
            Self::B4800 => 48,
            Self::B9600 => 96,
            Self::B14400 => 14,
            Self::B19200 => 19,
            other => other.as_u32(),
        }
    }

    /// Configuration token for this rate on `platform`.
    pub fn token(self, platform: Platform) -> String {
        match platform {
            Platform::Windows => format!("baud={}", self.windows_code()),
            Platform::Linux | Platform::Bsd => self.as_u32().to_string(),
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

impl TryFrom<i64> for BaudRate {
    type Error = crate::ConfigError;

    fn try_from(rate: i64) -> Result<Self, Self::Error> {
        Self::from_rate(rate).ok_or(crate::ConfigError::InvalidBaudRate(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rate_round_trips_through_lookup() {
        for rate in BaudRate::ALL {
            assert_eq!(BaudRate::from_rate(i64::from(rate.as_u32())), Some(rate));
        }
    }

    #[test]
    fn unsupported_rates_are_rejected() {
        for rate in [0, 110, 150, 96, 250_000, -9600] {
            assert_eq!(BaudRate::from_rate(rate), None, "rate {rate}");
        }
        assert_eq!(
            BaudRate::try_from(110),
            Err(crate::ConfigError::InvalidBaudRate(110))
        );
    }

    #[test]
    fn windows_codes_scale_up_to_19200() {
        assert_eq!(BaudRate::B9600.windows_code(), 96);
        assert_eq!(BaudRate::B1200.windows_code(), 12);
        assert_eq!(BaudRate::B19200.windows_code(), 19);
        assert_eq!(BaudRate::B28800.windows_code(), 28_800);
        assert_eq!(BaudRate::B115200.windows_code(), 115_200);
    }

    #[test]
    fn tokens_differ_by_platform() {
        assert_eq!(BaudRate::B9600.token(Platform::Linux), "9600");
        assert_eq!(BaudRate::B9600.token(Platform::Bsd), "9600");
        assert_eq!(BaudRate::B9600.token(Platform::Windows), "baud=96");
        assert_eq!(BaudRate::B57600.token(Platform::Windows), "baud=57600");
    }
}
