use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};
use ttyprims_config::SerialOptions;
use ttyprims_device::{DeviceHandle, SerialConfigurator};

use crate::error::{RegistryError, Result};
use crate::flags::OpenFlags;

/// Scheme bound by default.
pub const DEFAULT_SCHEME: &str = "arduino";

/// A scheme, the configurator that opens its devices, and its default options.
#[derive(Debug, Clone)]
pub struct Binding {
    scheme: String,
    configurator: SerialConfigurator,
    defaults: SerialOptions,
}

impl Binding {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn configurator(&self) -> &SerialConfigurator {
        &self.configurator
    }

    /// Registration-time options, layered over the built-in defaults.
    pub fn defaults(&self) -> &SerialOptions {
        &self.defaults
    }
}

/// Scheme-keyed store of serial bindings.
///
/// Explicitly constructed and owned; there is no global instance. Mutation
/// takes `&mut self`, so sharing one across threads needs external locking.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    bindings: HashMap<String, Binding>,
}

impl ProtocolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with `scheme` bound for the host platform.
    pub fn init(scheme: &str, defaults: SerialOptions) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(scheme, defaults)?;
        Ok(registry)
    }

    /// Drop every binding.
    pub fn reset(&mut self) {
        debug!(count = self.bindings.len(), "resetting protocol registry");
        self.bindings.clear();
    }

    /// Bind `scheme` to the host platform's configurator.
    pub fn register(&mut self, scheme: &str, defaults: SerialOptions) -> Result<()> {
        let configurator = SerialConfigurator::current().ok_or(RegistryError::NotConcrete)?;
        self.register_with(scheme, configurator, defaults)
    }

    /// Bind `scheme` to an explicit configurator.
    ///
    /// An existing binding for the scheme is removed first; the last
    /// registration wins. Schemes are case-insensitive and stored lowercase.
    pub fn register_with(
        &mut self,
        scheme: &str,
        configurator: SerialConfigurator,
        defaults: SerialOptions,
    ) -> Result<()> {
        validate_scheme(scheme)?;
        let scheme = scheme.to_ascii_lowercase();
        self.unregister(&scheme);

        info!(%scheme, platform = %configurator.platform(), "registered serial scheme");
        self.bindings.insert(
            scheme.clone(),
            Binding {
                scheme,
                configurator,
                defaults,
            },
        );
        Ok(())
    }

    /// Remove the binding for `scheme`. Returns whether one existed.
    pub fn unregister(&mut self, scheme: &str) -> bool {
        let removed = self.bindings.remove(&scheme.to_ascii_lowercase()).is_some();
        if removed {
            debug!(scheme, "unregistered serial scheme");
        }
        removed
    }

    pub fn is_registered(&self, scheme: &str) -> bool {
        self.bindings.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    pub fn binding(&self, scheme: &str) -> Option<&Binding> {
        self.bindings.get(&scheme.to_ascii_lowercase())
    }

    /// Open `<scheme>://<device>` with per-call `options`.
    ///
    /// Options are layered over the binding's defaults, which are layered
    /// over the built-in defaults.
    pub fn open(&self, uri: &str, options: &SerialOptions) -> Result<DeviceHandle> {
        self.open_inner(uri, options, false)
    }

    /// Open for hosts that expect a failure sentinel.
    ///
    /// With `report_errors` set this behaves like [`open`](Self::open).
    /// Otherwise any failure is logged at debug level and yields `Ok(None)`.
    pub fn open_with_flags(
        &self,
        uri: &str,
        options: &SerialOptions,
        flags: OpenFlags,
    ) -> Result<Option<DeviceHandle>> {
        if flags.use_path && flags.report_errors {
            warn!(uri, "include-path lookup is not supported for serial devices");
        }

        match self.open_inner(uri, options, !flags.report_errors) {
            Ok(handle) => Ok(Some(handle)),
            Err(err) if flags.report_errors => Err(err),
            Err(err) => {
                debug!(uri, error = %err, "suppressed open failure");
                Ok(None)
            }
        }
    }

    /// As [`open_with_flags`](Self::open_with_flags), taking a raw option map.
    ///
    /// A `null` context means no per-call options.
    pub fn open_with_context(
        &self,
        uri: &str,
        context: &Value,
        flags: OpenFlags,
    ) -> Result<Option<DeviceHandle>> {
        let options = match context {
            Value::Null => Ok(SerialOptions::default()),
            value => SerialOptions::from_json(value),
        };

        match options {
            Ok(options) => self.open_with_flags(uri, &options, flags),
            Err(err) if flags.report_errors => Err(err.into()),
            Err(err) => {
                debug!(uri, error = %err, "suppressed invalid option map");
                Ok(None)
            }
        }
    }

    /// Options an open of `uri` would use, fully layered.
    pub fn effective_options(&self, uri: &str, options: &SerialOptions) -> Result<SerialOptions> {
        let (scheme, _) = split_uri(uri)?;
        let binding = self.lookup(scheme)?;
        Ok(options
            .merged_over(&binding.defaults)
            .merged_over(&SerialOptions::builtin()))
    }

    fn lookup(&self, scheme: &str) -> Result<&Binding> {
        self.binding(scheme)
            .ok_or_else(|| RegistryError::NotRegistered(scheme.to_string()))
    }

    fn open_inner(
        &self,
        uri: &str,
        options: &SerialOptions,
        errors_suppressed: bool,
    ) -> Result<DeviceHandle> {
        let (scheme, _) = split_uri(uri)?;
        let binding = self.lookup(scheme)?;
        let config = options.merged_over(&binding.defaults).to_config();

        let handle = binding
            .configurator
            .open_with(uri, scheme, &config, errors_suppressed)?;
        Ok(handle)
    }
}

/// Split `<scheme>://<device>` into its scheme and device name.
pub fn split_uri(uri: &str) -> Result<(&str, &str)> {
    match uri.split_once("://") {
        Some((scheme, device)) if !scheme.is_empty() && !device.is_empty() => Ok((scheme, device)),
        _ => Err(RegistryError::InvalidUri(uri.to_string())),
    }
}

/// Check `scheme` is a URI scheme: a letter, then letters, digits, `+`, `-` or `.`.
pub fn validate_scheme(scheme: &str) -> Result<()> {
    let mut chars = scheme.chars();
    let reason = match chars.next() {
        None => Some("scheme is empty"),
        Some(first) if !first.is_ascii_alphabetic() => Some("scheme must start with a letter"),
        Some(_) => chars
            .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))
            .then_some("scheme may only contain letters, digits, '+', '-' and '.'"),
    };

    match reason {
        Some(reason) => Err(RegistryError::RegistrationFailed {
            scheme: scheme.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use ttyprims_config::{CustomCommand, Platform};
    use ttyprims_device::mock::{MockBackend, MockEvent};
    use ttyprims_device::{driver_for, DeviceError};

    use super::*;

    fn mock_configurator(platform: Platform, backend: &MockBackend) -> SerialConfigurator {
        SerialConfigurator::new(driver_for(platform), Arc::new(backend.clone()))
    }

    fn executed(backend: &MockBackend) -> Vec<String> {
        backend
            .journal()
            .events()
            .into_iter()
            .filter_map(|event| match event {
                MockEvent::Execute(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    fn registry_with(backend: &MockBackend, defaults: SerialOptions) -> ProtocolRegistry {
        let mut registry = ProtocolRegistry::new();
        registry
            .register_with(
                DEFAULT_SCHEME,
                mock_configurator(Platform::Linux, backend),
                defaults,
            )
            .unwrap();
        registry
    }

    #[test]
    fn reregistration_leaves_one_binding() {
        let backend = MockBackend::new();
        let mut registry = ProtocolRegistry::new();
        let first = SerialOptions {
            baud_rate: Some(57_600),
            ..SerialOptions::default()
        };
        let second = SerialOptions {
            baud_rate: Some(115_200),
            ..SerialOptions::default()
        };

        registry
            .register_with("arduino", mock_configurator(Platform::Linux, &backend), first)
            .unwrap();
        registry
            .register_with("arduino", mock_configurator(Platform::Bsd, &backend), second)
            .unwrap();

        assert_eq!(registry.schemes(), ["arduino"]);
        let binding = registry.binding("arduino").unwrap();
        assert_eq!(binding.defaults().baud_rate, Some(115_200));
        assert_eq!(binding.configurator().platform(), Platform::Bsd);
    }

    #[test]
    fn rejects_invalid_scheme_names() {
        let backend = MockBackend::new();
        let mut registry = ProtocolRegistry::new();
        for scheme in ["", "1serial", "ar duino", "tty_usb", "com:"] {
            let err = registry
                .register_with(
                    scheme,
                    mock_configurator(Platform::Linux, &backend),
                    SerialOptions::default(),
                )
                .unwrap_err();
            assert!(
                matches!(err, RegistryError::RegistrationFailed { .. }),
                "{scheme:?}: {err}"
            );
        }
        assert!(registry.schemes().is_empty());

        for scheme in ["arduino", "serial+usb", "tty-1", "a.b"] {
            assert!(validate_scheme(scheme).is_ok(), "{scheme}");
        }
    }

    #[test]
    fn unregister_and_reset() {
        let backend = MockBackend::new();
        let mut registry = registry_with(&backend, SerialOptions::default());
        registry
            .register_with(
                "teensy",
                mock_configurator(Platform::Linux, &backend),
                SerialOptions::default(),
            )
            .unwrap();

        assert_eq!(registry.schemes(), ["arduino", "teensy"]);
        assert!(registry.unregister("teensy"));
        assert!(!registry.unregister("teensy"));
        assert!(registry.is_registered("arduino"));

        registry.reset();
        assert!(!registry.is_registered("arduino"));
    }

    #[test]
    fn uri_must_carry_a_registered_scheme() {
        let backend = MockBackend::new();
        let registry = registry_with(&backend, SerialOptions::default());

        for uri in ["ttyACM0", "://ttyACM0", "arduino://"] {
            assert!(matches!(
                registry.open(uri, &SerialOptions::default()),
                Err(RegistryError::InvalidUri(_))
            ));
        }
        assert!(matches!(
            registry.open("teensy://ttyACM0", &SerialOptions::default()),
            Err(RegistryError::NotRegistered(scheme)) if scheme == "teensy"
        ));
        assert!(backend.journal().events().is_empty());
    }

    #[test]
    fn schemes_match_case_insensitively() {
        let backend = MockBackend::new().with_device("/dev/ttyACM0");
        let mut registry = ProtocolRegistry::new();
        registry
            .register_with(
                "Arduino",
                mock_configurator(Platform::Linux, &backend),
                SerialOptions::default(),
            )
            .unwrap();

        assert_eq!(registry.schemes(), ["arduino"]);
        assert!(registry.is_registered("ARDUINO"));

        let handle = registry
            .open("ARDUINO://ttyACM0", &SerialOptions::default())
            .unwrap();
        assert_eq!(handle.address().path(), PathBuf::from("/dev/ttyACM0"));
        drop(handle);

        assert!(registry.unregister("arduino"));
        assert!(registry.schemes().is_empty());
    }

    #[test]
    fn options_layer_over_registration_defaults() {
        let backend = MockBackend::new().with_device("/dev/ttyACM0");
        let defaults = SerialOptions {
            baud_rate: Some(57_600),
            stop_size: Some(2),
            usleep_s: Some(3.0),
            ..SerialOptions::default()
        };
        let registry = registry_with(&backend, defaults);
        let options = SerialOptions {
            parity: Some(1),
            stop_size: Some(1),
            ..SerialOptions::default()
        };

        let handle = registry.open("arduino://ttyACM0", &options).unwrap();
        assert!(!handle.errors_suppressed());
        assert_eq!(handle.address().path(), PathBuf::from("/dev/ttyACM0"));

        let commands = executed(&backend);
        assert_eq!(commands.len(), 1);
        assert!(
            commands[0].starts_with("stty -F /dev/ttyACM0 57600 parenb parodd cs8 -cstopb clocal"),
            "{}",
            commands[0]
        );
        assert!(backend
            .journal()
            .events()
            .contains(&MockEvent::Sleep(Duration::from_secs(3))));

        let effective = registry
            .effective_options("arduino://ttyACM0", &options)
            .unwrap();
        assert_eq!(effective.baud_rate, Some(57_600));
        assert_eq!(effective.parity, Some(1));
        assert_eq!(effective.data_size, Some(8));
        assert_eq!(effective.stop_size, Some(1));
    }

    #[test]
    fn per_open_custom_command_wins() {
        let backend = MockBackend::new().with_device("/dev/ttyUSB0");
        let registry = registry_with(&backend, SerialOptions::default());
        let options = SerialOptions {
            custom_command: Some(CustomCommand::Line("raw 19200".into())),
            ..SerialOptions::default()
        };

        registry.open("arduino://ttyUSB0", &options).unwrap();
        assert_eq!(executed(&backend), ["stty -F /dev/ttyUSB0 raw 19200"]);
    }

    #[test]
    fn reporting_flags_surface_errors() {
        let backend = MockBackend::new();
        let registry = registry_with(&backend, SerialOptions::default());

        let err = registry
            .open_with_flags(
                "arduino://ttyACM9",
                &SerialOptions::default(),
                OpenFlags::reporting(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Device(DeviceError::NotFound { .. })
        ));
    }

    #[test]
    fn silent_flags_return_sentinel() {
        let backend = MockBackend::new();
        let registry = registry_with(&backend, SerialOptions::default());

        let opened = registry
            .open_with_flags(
                "arduino://ttyACM9",
                &SerialOptions::default(),
                OpenFlags::silent(),
            )
            .unwrap();
        assert!(opened.is_none());

        let invalid_baud = SerialOptions {
            baud_rate: Some(12_345),
            ..SerialOptions::default()
        };
        let opened = registry
            .open_with_flags("arduino://ttyACM9", &invalid_baud, OpenFlags::silent())
            .unwrap();
        assert!(opened.is_none());
    }

    #[test]
    fn silent_open_marks_handle_suppressed() {
        let backend = MockBackend::new().with_device("/dev/ttyACM0");
        let registry = registry_with(&backend, SerialOptions::default());

        let handle = registry
            .open_with_flags(
                "arduino://ttyACM0",
                &SerialOptions::default(),
                OpenFlags::from_bits(0),
            )
            .unwrap()
            .expect("device exists");
        assert!(handle.errors_suppressed());
    }

    #[test]
    fn context_map_is_parsed() {
        let backend = MockBackend::new().with_device("/dev/ttyACM0");
        let registry = registry_with(&backend, SerialOptions::default());

        let handle = registry
            .open_with_context(
                "arduino://ttyACM0",
                &json!({ "baud_rate": 115200, "data_size": 7, "usleep_s": 1.5 }),
                OpenFlags::reporting(),
            )
            .unwrap();
        assert!(handle.is_some());
        assert!(executed(&backend)[0].starts_with("stty -F /dev/ttyACM0 115200 -parenb cs7"));

        let err = registry
            .open_with_context(
                "arduino://ttyACM0",
                &json!({ "baud": 9600 }),
                OpenFlags::reporting(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));

        let silenced = registry
            .open_with_context(
                "arduino://ttyACM0",
                &json!({ "baud": 9600 }),
                OpenFlags::silent(),
            )
            .unwrap();
        assert!(silenced.is_none());
    }

    #[cfg(any(unix, windows))]
    #[test]
    fn init_binds_host_platform() {
        let registry = ProtocolRegistry::init(DEFAULT_SCHEME, SerialOptions::default()).unwrap();
        let binding = registry.binding(DEFAULT_SCHEME).unwrap();
        assert_eq!(Some(binding.configurator().platform()), Platform::current());
    }

    #[test]
    fn split_uri_parts() {
        assert_eq!(
            split_uri("arduino://ttyACM0").unwrap(),
            ("arduino", "ttyACM0")
        );
        assert_eq!(split_uri("arduino://COM3").unwrap(), ("arduino", "COM3"));
        assert!(split_uri("/dev/ttyACM0").is_err());
    }
}
