use std::sync::Arc;

use tracing::debug;
use ttyprims_config::{Platform, SerialConfig};

use crate::address::DeviceAddress;
use crate::backend::DeviceBackend;
use crate::command::ConfigCommand;
use crate::driver::{driver_for, PlatformDriver};
use crate::error::{DeviceError, Result};
use crate::handle::DeviceHandle;
use crate::os::OsBackend;

/// Opens devices by name: resolve, check, then run the platform sequence.
#[derive(Debug, Clone)]
pub struct SerialConfigurator {
    driver: Arc<dyn PlatformDriver>,
    backend: Arc<dyn DeviceBackend>,
}

impl SerialConfigurator {
    pub fn new(driver: Arc<dyn PlatformDriver>, backend: Arc<dyn DeviceBackend>) -> Self {
        Self { driver, backend }
    }

    /// Configurator for `platform` against the real OS.
    pub fn for_platform(platform: Platform) -> Self {
        Self::new(driver_for(platform), Arc::new(OsBackend))
    }

    /// Configurator for the host, if the host has serial support.
    pub fn current() -> Option<Self> {
        Platform::current().map(Self::for_platform)
    }

    pub fn platform(&self) -> Platform {
        self.driver.platform()
    }

    pub fn driver(&self) -> &dyn PlatformDriver {
        self.driver.as_ref()
    }

    pub fn backend(&self) -> &dyn DeviceBackend {
        self.backend.as_ref()
    }

    pub fn resolve(&self, path: &str, scheme: &str) -> DeviceAddress {
        self.driver.resolve_address(path, scheme)
    }

    /// Resolve and build the configuration command without touching the device.
    pub fn describe(
        &self,
        path: &str,
        scheme: &str,
        config: &SerialConfig,
    ) -> Result<(DeviceAddress, ConfigCommand)> {
        let address = self.resolve(path, scheme);
        let command = self.driver.build_command(&address, config)?;
        Ok((address, command))
    }

    /// Open and configure the device named by `path`.
    pub fn open(&self, path: &str, scheme: &str, config: &SerialConfig) -> Result<DeviceHandle> {
        self.open_with(path, scheme, config, false)
    }

    /// As [`open`](Self::open), recording whether the caller suppresses errors.
    pub fn open_with(
        &self,
        path: &str,
        scheme: &str,
        config: &SerialConfig,
        errors_suppressed: bool,
    ) -> Result<DeviceHandle> {
        let address = self.resolve(path, scheme);
        debug!(
            logical = address.logical(),
            device = %address,
            platform = %self.platform(),
            "resolved device"
        );

        if !self.backend.exists(&address) {
            return Err(DeviceError::NotFound {
                path: address.path().to_path_buf(),
            });
        }

        self.driver
            .apply_configuration(self.backend.as_ref(), &address, config, errors_suppressed)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use ttyprims_config::{BaudRate, ConfigError, Parity};

    use super::*;
    use crate::handle::ReadOutcome;
    use crate::mock::{MockBackend, MockEvent};

    fn configurator(platform: Platform, backend: &MockBackend) -> SerialConfigurator {
        SerialConfigurator::new(driver_for(platform), Arc::new(backend.clone()))
    }

    fn basic_config() -> SerialConfig {
        SerialConfig::new()
            .with_baud(BaudRate::B9600)
            .with_parity(Parity::None)
            .with_data_bits(8)
            .with_stop_bits(1)
    }

    fn execute_index(events: &[MockEvent]) -> usize {
        events
            .iter()
            .position(|e| matches!(e, MockEvent::Execute(_)))
            .expect("configuration command should run")
    }

    #[test]
    fn posix_opens_waits_then_configures() {
        let backend = MockBackend::new().with_device("/dev/ttyACM0");
        let handle = configurator(Platform::Linux, &backend)
            .open("arduino://ttyACM0", "arduino", &basic_config())
            .expect("open should succeed");

        let events = backend.journal().events();
        let open = events
            .iter()
            .position(|e| *e == MockEvent::Open(PathBuf::from("/dev/ttyACM0")))
            .unwrap();
        let sleep = events
            .iter()
            .position(|e| matches!(e, MockEvent::Sleep(d) if *d >= Duration::from_secs(1)))
            .unwrap();
        let execute = execute_index(&events);
        let tty_check = events.iter().position(|e| *e == MockEvent::IsTerminal).unwrap();
        let nonblocking = events
            .iter()
            .position(|e| *e == MockEvent::SetNonblocking(true))
            .unwrap();

        assert!(open < sleep && sleep < execute && execute < tty_check && tty_check < nonblocking);
        assert!(!handle.is_blocking());

        let MockEvent::Execute(command) = &events[execute] else {
            unreachable!()
        };
        assert!(
            command.starts_with("stty -F /dev/ttyACM0 9600 -parenb cs8 -cstopb clocal -crtscts"),
            "{command}"
        );
        assert!(command.ends_with("noflsh"));
    }

    #[test]
    fn windows_configures_before_open() {
        let backend = MockBackend::new().with_device("com3");
        let handle = configurator(Platform::Windows, &backend)
            .open("COM3", "arduino", &basic_config())
            .expect("open should succeed");

        let events = backend.journal().events();
        assert_eq!(
            events[..4],
            [
                MockEvent::Exists(PathBuf::from("com3")),
                MockEvent::Execute(
                    "mode com3 baud=96 parity=n data=8 stop=1 to=on xon=off odsr=off octs=off dtr=on rts=on idsr=off"
                        .to_string()
                ),
                MockEvent::Open(PathBuf::from("com3")),
                MockEvent::Sleep(Duration::from_secs(2)),
            ]
        );
        assert_eq!(events[4], MockEvent::SetNonblocking(true));
        assert!(!events.contains(&MockEvent::IsTerminal));
        assert!(!handle.is_blocking());
    }

    #[test]
    fn windows_ignores_nonblocking_failure() {
        let backend = MockBackend::new().with_device("com7").failing_nonblocking();
        let handle = configurator(Platform::Windows, &backend)
            .open("7", "arduino", &basic_config())
            .expect("non-blocking failure is not fatal on windows");
        assert!(handle.is_blocking());
        assert!(!handle.is_closed());
    }

    #[test]
    fn missing_device_is_not_opened_or_configured() {
        for platform in [Platform::Linux, Platform::Windows] {
            let backend = MockBackend::new();
            let err = configurator(platform, &backend)
                .open("ttyUSB9", "arduino", &basic_config())
                .unwrap_err();

            assert!(matches!(err, DeviceError::NotFound { .. }));
            let events = backend.journal().events();
            assert_eq!(events.len(), 1, "{events:?}");
            assert!(matches!(events[0], MockEvent::Exists(_)));
        }
    }

    #[test]
    fn posix_rejects_non_terminal_and_closes_handle() {
        let backend = MockBackend::new().with_device("/dev/null").not_a_terminal();
        let err = configurator(Platform::Linux, &backend)
            .open("null", "arduino", &basic_config())
            .unwrap_err();

        assert!(matches!(err, DeviceError::NotATerminal { .. }));
        let events = backend.journal().events();
        assert_eq!(events.last(), Some(&MockEvent::Close));
        assert!(!events.contains(&MockEvent::SetNonblocking(true)));
    }

    #[test]
    fn posix_blocking_mode_failure_closes_handle() {
        let backend = MockBackend::new()
            .with_device("/dev/ttyACM0")
            .failing_nonblocking();
        let err = configurator(Platform::Linux, &backend)
            .open("ttyACM0", "arduino", &basic_config())
            .unwrap_err();

        assert!(matches!(err, DeviceError::BlockingMode { .. }));
        let events = backend.journal().events();
        assert_eq!(events.last(), Some(&MockEvent::Close));
        assert_eq!(events.iter().filter(|e| **e == MockEvent::Close).count(), 1);
    }

    #[test]
    fn open_failure_is_reported() {
        let backend = MockBackend::new()
            .with_device("/dev/ttyACM0")
            .failing_open();
        let err = configurator(Platform::Linux, &backend)
            .open("ttyACM0", "arduino", &basic_config())
            .unwrap_err();

        assert!(matches!(err, DeviceError::Open { .. }));
        assert!(!backend
            .journal()
            .events()
            .iter()
            .any(|e| matches!(e, MockEvent::Execute(_))));
    }

    #[test]
    fn invalid_settings_fail_before_native_open() {
        let cases = [
            (
                basic_config().with_baud_rate(250_000),
                ConfigError::InvalidBaudRate(250_000),
            ),
            (basic_config().with_parity_code(5), ConfigError::InvalidParity(5)),
        ];

        for platform in [Platform::Linux, Platform::Windows] {
            for (config, expected) in cases.clone() {
                let backend = MockBackend::new().with_device("/dev/ttyACM0").with_device("com1");
                let name = if platform.is_posix() { "ttyACM0" } else { "com1" };
                let err = configurator(platform, &backend)
                    .open(name, "arduino", &config)
                    .unwrap_err();

                match err {
                    DeviceError::Config { source, .. } => assert_eq!(source, expected),
                    other => panic!("unexpected error: {other}"),
                }
                let events = backend.journal().events();
                assert!(!events
                    .iter()
                    .any(|e| matches!(e, MockEvent::Open(_) | MockEvent::Execute(_))));
            }
        }
    }

    #[test]
    fn command_failure_is_not_fatal() {
        let backend = MockBackend::new()
            .with_device("/dev/ttyACM0")
            .failing_commands();
        let handle = configurator(Platform::Linux, &backend)
            .open("ttyACM0", "arduino", &basic_config());
        assert!(handle.is_ok());
    }

    #[test]
    fn custom_command_is_passed_verbatim() {
        let backend = MockBackend::new().with_device("/dev/ttyACM0");
        let config = basic_config().with_custom_command(["raw", "115200"]);
        configurator(Platform::Linux, &backend)
            .open("ttyACM0", "arduino", &config)
            .unwrap();

        let events = backend.journal().events();
        let MockEvent::Execute(command) = &events[execute_index(&events)] else {
            unreachable!()
        };
        assert_eq!(command, "stty -F /dev/ttyACM0 raw 115200");
    }

    #[test]
    fn configured_boot_delay_is_used() {
        let backend = MockBackend::new().with_device("/dev/ttyACM0");
        let config = basic_config().with_boot_delay(Duration::from_millis(3_500));
        configurator(Platform::Bsd, &backend)
            .open("ttyACM0", "arduino", &config)
            .unwrap();
        assert!(backend
            .journal()
            .events()
            .contains(&MockEvent::Sleep(Duration::from_millis(3_500))));
    }

    #[test]
    fn opened_handle_reads_device_output() {
        let backend = MockBackend::new()
            .with_device("/dev/ttyACM0")
            .with_input(b"ready\n".to_vec());
        let mut handle = configurator(Platform::Linux, &backend)
            .open("ttyACM0", "arduino", &basic_config())
            .unwrap();

        assert_eq!(
            handle.read(64).unwrap(),
            ReadOutcome::Data(bytes::Bytes::from_static(b"ready\n"))
        );
        assert_eq!(handle.read(64).unwrap(), ReadOutcome::WouldBlock);
    }

    #[test]
    fn describe_does_not_touch_the_device() {
        let backend = MockBackend::new();
        let (address, command) = configurator(Platform::Windows, &backend)
            .describe("arduino://4", "arduino", &basic_config())
            .unwrap();

        assert_eq!(address.path(), std::path::Path::new("com4"));
        assert_eq!(command.program(), "mode");
        assert!(backend.journal().events().is_empty());
    }
}
