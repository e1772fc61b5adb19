use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{SerialConfig, DEFAULT_BOOT_DELAY};
use crate::error::{ConfigError, Result};

/// Custom configuration command: one string or a list of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomCommand {
    Line(String),
    Tokens(Vec<String>),
}

impl CustomCommand {
    /// Tokens in order. A single line is split on whitespace.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Self::Tokens(tokens) => tokens.clone(),
        }
    }
}

/// Option map attached to an open call.
///
/// Every field is optional so option maps can be layered with
/// [`SerialOptions::merged_over`]; absent fields inherit from the layer below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerialOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<i64>,
    /// -1 none, 0 even, 1 odd.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_command: Option<CustomCommand>,
    /// Boot delay in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usleep_s: Option<f64>,
}

impl SerialOptions {
    /// Built-in defaults every other layer is merged over.
    pub fn builtin() -> Self {
        Self {
            baud_rate: Some(9_600),
            parity: Some(-1),
            data_size: Some(8),
            stop_size: Some(1),
            custom_command: None,
            usleep_s: Some(DEFAULT_BOOT_DELAY.as_secs_f64()),
        }
    }

    /// Parse an option map from JSON.
    pub fn from_json(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|err| ConfigError::InvalidOption {
            name: "options",
            message: err.to_string(),
        })
    }

    /// Parse an option map from a JSON string.
    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|err| ConfigError::InvalidOption {
            name: "options",
            message: err.to_string(),
        })
    }

    /// Fill every field missing here from `base`.
    pub fn merged_over(&self, base: &SerialOptions) -> SerialOptions {
        SerialOptions {
            baud_rate: self.baud_rate.or(base.baud_rate),
            parity: self.parity.or(base.parity),
            data_size: self.data_size.or(base.data_size),
            stop_size: self.stop_size.or(base.stop_size),
            custom_command: self
                .custom_command
                .clone()
                .or_else(|| base.custom_command.clone()),
            usleep_s: self.usleep_s.or(base.usleep_s),
        }
    }

    /// Snapshot these options, over the built-in defaults, as a config.
    pub fn to_config(&self) -> SerialConfig {
        let options = self.merged_over(&Self::builtin());
        let mut config = SerialConfig::new();

        if let Some(rate) = options.baud_rate {
            config = config.with_baud_rate(rate);
        }
        if let Some(code) = options.parity {
            config = config.with_parity_code(code);
        }
        if let Some(bits) = options.data_size {
            config = config.with_data_bits(bits);
        }
        if let Some(bits) = options.stop_size {
            config = config.with_stop_bits(bits);
        }
        if let Some(secs) = options.usleep_s {
            config = config.with_boot_delay_secs(secs);
        }
        if let Some(command) = &options.custom_command {
            config = config.with_custom_command(command.tokens());
        }

        config
    }

    /// Boot delay these options request, floored.
    pub fn boot_delay(&self) -> Option<Duration> {
        self.usleep_s
            .map(|secs| SerialConfig::new().with_boot_delay_secs(secs).boot_delay())
    }
}
