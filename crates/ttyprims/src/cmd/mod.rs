use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use ttyprims_config::{CustomCommand, Parity, Platform, SerialConfig, SerialOptions};
use ttyprims_device::{DeviceError, DeviceHandle, ReadOutcome};
use ttyprims_registry::{split_uri, ProtocolRegistry, DEFAULT_SCHEME};

use crate::exit::{config_error, io_error, registry_error, CliError, CliResult, FAILURE, USAGE};
use crate::output::OutputFormat;

pub mod doctor;
pub mod listen;
pub mod plan;
pub mod resolve;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the configuration command for a device without touching it.
    Plan(PlanArgs),
    /// Print the platform path a device name resolves to.
    Resolve(ResolveArgs),
    /// Open a device, write a payload, and optionally wait for a reply.
    Send(SendArgs),
    /// Open a device and print what it sends.
    Listen(ListenArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Plan(args) => plan::run(args, format),
        Command::Resolve(args) => resolve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Linux,
    Bsd,
    Windows,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::Linux => Platform::Linux,
            PlatformArg::Bsd => Platform::Bsd,
            PlatformArg::Windows => Platform::Windows,
        }
    }
}

/// Explicit platform, else the host's.
pub fn target_platform(arg: Option<PlatformArg>) -> CliResult<Platform> {
    arg.map(Platform::from)
        .or_else(Platform::current)
        .ok_or_else(|| CliError::new(USAGE, "no serial support on this host; pass --platform"))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ParityArg {
    None,
    Even,
    Odd,
}

impl ParityArg {
    fn code(self) -> i64 {
        match self {
            ParityArg::None => Parity::None.code(),
            ParityArg::Even => Parity::Even.code(),
            ParityArg::Odd => Parity::Odd.code(),
        }
    }
}

/// Line settings shared by every command that opens or plans a device.
#[derive(Args, Debug, Clone)]
pub struct SerialArgs {
    /// Scheme for device names given without one.
    #[arg(long, env = "TTYPRIMS_SCHEME", default_value = DEFAULT_SCHEME)]
    pub scheme: String,
    /// Baud rate.
    #[arg(long, short = 'b', env = "TTYPRIMS_BAUD_RATE")]
    pub baud: Option<i64>,
    /// Parity.
    #[arg(long, value_enum)]
    pub parity: Option<ParityArg>,
    /// Data bits (clamped to 5..=8).
    #[arg(long, allow_negative_numbers = true)]
    pub data_bits: Option<i64>,
    /// Stop bits (clamped to 1..=2).
    #[arg(long, allow_negative_numbers = true)]
    pub stop_bits: Option<i64>,
    /// Raw configuration tokens replacing every derived setting.
    #[arg(long, value_name = "TOKENS", allow_hyphen_values = true)]
    pub custom_command: Option<String>,
    /// Seconds to let the board boot after open (minimum 1).
    #[arg(long, env = "TTYPRIMS_BOOT_DELAY", value_name = "SECONDS")]
    pub boot_delay: Option<f64>,
    /// JSON file of default options.
    #[arg(long, env = "TTYPRIMS_DEFAULTS", value_name = "FILE")]
    pub defaults: Option<PathBuf>,
}

impl SerialArgs {
    /// `<scheme>://<device>`, keeping a scheme the device already carries.
    pub fn uri(&self, device: &str) -> String {
        if device.contains("://") {
            device.to_string()
        } else {
            format!("{}://{device}", self.scheme)
        }
    }

    /// Per-invocation options from flags and environment.
    pub fn options(&self) -> SerialOptions {
        SerialOptions {
            baud_rate: self.baud,
            parity: self.parity.map(ParityArg::code),
            data_size: self.data_bits,
            stop_size: self.stop_bits,
            custom_command: self.custom_command.clone().map(CustomCommand::Line),
            usleep_s: self.boot_delay,
        }
    }

    /// Default options from `--defaults`, or none.
    pub fn defaults(&self) -> CliResult<SerialOptions> {
        let Some(path) = &self.defaults else {
            return Ok(SerialOptions::default());
        };
        let text = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        SerialOptions::from_json_str(&text)
            .map_err(|err| config_error(&format!("invalid defaults in {}", path.display()), err))
    }

    /// Fully layered config snapshot.
    pub fn config(&self) -> CliResult<SerialConfig> {
        Ok(self.options().merged_over(&self.defaults()?).to_config())
    }
}

/// Register the device's scheme for the host and open it.
pub fn open_device(serial: &SerialArgs, device: &str) -> CliResult<DeviceHandle> {
    let uri = serial.uri(device);
    let (scheme, _) = split_uri(&uri).map_err(|err| registry_error("invalid device", err))?;

    let mut registry = ProtocolRegistry::new();
    registry
        .register(scheme, serial.defaults()?)
        .map_err(|err| registry_error("register failed", err))?;
    registry
        .open(&uri, &serial.options())
        .map_err(|err| registry_error("open failed", err))
}

/// Anything that can be polled for bytes the way a non-blocking handle is.
pub trait ByteSource {
    fn poll_bytes(&mut self, max: usize) -> Result<ReadOutcome, DeviceError>;
}

impl ByteSource for DeviceHandle {
    fn poll_bytes(&mut self, max: usize) -> Result<ReadOutcome, DeviceError> {
        self.read(max)
    }
}

/// Parse `500ms`, `5s`, or bare seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub fn device_closed(device: &str) -> CliError {
    CliError::new(FAILURE, format!("{device}: device closed the stream"))
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Device name, with or without a scheme (e.g. ttyACM0, COM3, arduino://ttyUSB0).
    pub device: String,
    /// Plan for this platform instead of the host.
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,
    #[command(flatten)]
    pub serial: SerialArgs,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Device name, with or without a scheme.
    pub device: String,
    /// Resolve for this platform instead of the host.
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,
    /// Scheme for device names given without one.
    #[arg(long, env = "TTYPRIMS_SCHEME", default_value = DEFAULT_SCHEME)]
    pub scheme: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device name, with or without a scheme.
    pub device: String,
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["bytes", "file"])]
    pub data: Option<String>,
    /// Comma-separated byte values (0-255).
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["data", "file"])]
    pub bytes: Option<Vec<u32>>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "bytes"])]
    pub file: Option<PathBuf>,
    /// Append a newline to the payload.
    #[arg(long)]
    pub newline: bool,
    /// Wait for a reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    /// Delay between polls of the device.
    #[arg(long, default_value = "20ms")]
    pub poll_interval: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device name, with or without a scheme.
    pub device: String,
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Exit after printing N chunks.
    #[arg(long)]
    pub count: Option<usize>,
    /// Delay between polls of the device.
    #[arg(long, default_value = "20ms")]
    pub poll_interval: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}
