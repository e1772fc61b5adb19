use std::time::Duration;

use crate::baud::BaudRate;
use crate::error::{ConfigError, Result};

/// Shortest accepted boot delay.
pub const MIN_BOOT_DELAY: Duration = Duration::from_secs(1);
/// Boot delay used when none is configured.
pub const DEFAULT_BOOT_DELAY: Duration = Duration::from_secs(2);

const DATA_BITS_RANGE: (i64, i64) = (5, 8);
const STOP_BITS_RANGE: (i64, i64) = (1, 2);

/// Parity bit handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Parity {
    /// Decode the option-map code: -1 none, 0 even, 1 odd.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::None),
            0 => Some(Self::Even),
            1 => Some(Self::Odd),
            _ => None,
        }
    }

    /// Option-map code for this parity.
    pub fn code(self) -> i64 {
        match self {
            Self::None => -1,
            Self::Even => 0,
            Self::Odd => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Even => "even",
            Self::Odd => "odd",
        }
    }
}

/// One snapshot of the requested line settings for a device.
///
/// Baud rate and parity are kept as requested so that out-of-range values
/// surface as [`ConfigError`] when a plan is built. Data and stop bits are
/// clamped on read, and the boot delay is floored when set.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    baud_rate: i64,
    parity: i64,
    data_bits: i64,
    stop_bits: i64,
    custom_command: Option<Vec<String>>,
    boot_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: i64::from(BaudRate::B9600.as_u32()),
            parity: Parity::None.code(),
            data_bits: 8,
            stop_bits: 1,
            custom_command: None,
            boot_delay: DEFAULT_BOOT_DELAY,
        }
    }
}

impl SerialConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the baud rate in bits per second.
    pub fn with_baud_rate(mut self, rate: i64) -> Self {
        self.baud_rate = rate;
        self
    }

    pub fn with_baud(self, rate: BaudRate) -> Self {
        self.with_baud_rate(i64::from(rate.as_u32()))
    }

    pub fn with_parity(self, parity: Parity) -> Self {
        self.with_parity_code(parity.code())
    }

    /// Set parity from its option-map code.
    pub fn with_parity_code(mut self, code: i64) -> Self {
        self.parity = code;
        self
    }

    pub fn with_data_bits(mut self, bits: i64) -> Self {
        self.data_bits = bits;
        self
    }

    pub fn with_stop_bits(mut self, bits: i64) -> Self {
        self.stop_bits = bits;
        self
    }

    /// Replace every derived token with `tokens`, verbatim.
    pub fn with_custom_command<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_command = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    pub fn without_custom_command(mut self) -> Self {
        self.custom_command = None;
        self
    }

    /// Set the boot delay. Values below [`MIN_BOOT_DELAY`] are raised to it.
    pub fn with_boot_delay(mut self, delay: Duration) -> Self {
        self.boot_delay = delay.max(MIN_BOOT_DELAY);
        self
    }

    /// Set the boot delay from seconds, as given in the option map.
    ///
    /// The sign is ignored. Non-finite values fall back to the default.
    pub fn with_boot_delay_secs(self, secs: f64) -> Self {
        let delay = Duration::try_from_secs_f64(secs.abs()).unwrap_or(DEFAULT_BOOT_DELAY);
        self.with_boot_delay(delay)
    }

    /// Validated baud rate.
    pub fn baud_rate(&self) -> Result<BaudRate> {
        BaudRate::try_from(self.baud_rate)
    }

    /// Baud rate as requested, before validation.
    pub fn requested_baud_rate(&self) -> i64 {
        self.baud_rate
    }

    /// Validated parity.
    pub fn parity(&self) -> Result<Parity> {
        Parity::from_code(self.parity).ok_or(ConfigError::InvalidParity(self.parity))
    }

    /// Data bits, clamped to 5..=8.
    pub fn data_bits(&self) -> u8 {
        clamp_bits(self.data_bits, DATA_BITS_RANGE)
    }

    /// Stop bits, clamped to 1..=2.
    pub fn stop_bits(&self) -> u8 {
        clamp_bits(self.stop_bits, STOP_BITS_RANGE)
    }

    pub fn custom_command(&self) -> Option<&[String]> {
        self.custom_command.as_deref()
    }

    pub fn boot_delay(&self) -> Duration {
        self.boot_delay
    }
}

fn clamp_bits(value: i64, (min, max): (i64, i64)) -> u8 {
    // Both ranges fit in u8.
    value.clamp(min, max) as u8
}
