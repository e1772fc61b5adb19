use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use ttyprims_config::{plan, CommandPlan, Platform, SerialConfig};

use crate::address::{resolve, DeviceAddress};
use crate::backend::DeviceBackend;
use crate::command::ConfigCommand;
use crate::error::{DeviceError, Result};
use crate::handle::{DeviceHandle, HandleOption};

/// Platform-specific resolution, planning, and configuration sequence.
///
/// Pick one with [`driver_for`] at startup.
pub trait PlatformDriver: Send + Sync + std::fmt::Debug {
    fn platform(&self) -> Platform;

    /// Map a (possibly scheme-prefixed) device name to a platform path.
    fn resolve_address(&self, path: &str, scheme: &str) -> DeviceAddress {
        resolve(path, scheme, self.platform())
    }

    /// Plan configuration tokens for `config`.
    fn plan_command(&self, config: &SerialConfig) -> CommandPlan {
        plan(config, self.platform())
    }

    /// Consume a fresh plan into the full configuration command.
    fn build_command(&self, address: &DeviceAddress, config: &SerialConfig) -> Result<ConfigCommand> {
        ConfigCommand::build(self.platform(), address, self.plan_command(config)).map_err(
            |source| DeviceError::Config {
                path: address.path().to_path_buf(),
                source,
            },
        )
    }

    /// Configure and open the device at `address`.
    ///
    /// On error no native handle is left open.
    fn apply_configuration(
        &self,
        backend: &dyn DeviceBackend,
        address: &DeviceAddress,
        config: &SerialConfig,
        errors_suppressed: bool,
    ) -> Result<DeviceHandle>;
}

/// Driver for the current platform, or for an explicit one.
pub fn driver_for(platform: Platform) -> Arc<dyn PlatformDriver> {
    match platform {
        Platform::Linux | Platform::Bsd => Arc::new(PosixDriver::new(platform)),
        Platform::Windows => Arc::new(WindowsDriver),
    }
}

/// POSIX sequence: open, settle, configure, validate.
///
/// A tty's line settings reset when no process holds it open, so the
/// configuration command must run while our handle is held.
#[derive(Debug, Clone, Copy)]
pub struct PosixDriver {
    platform: Platform,
}

impl PosixDriver {
    /// `platform` must be a POSIX platform; Windows falls back to Linux.
    pub fn new(platform: Platform) -> Self {
        let platform = if platform.is_posix() {
            platform
        } else {
            Platform::Linux
        };
        Self { platform }
    }
}

impl PlatformDriver for PosixDriver {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn apply_configuration(
        &self,
        backend: &dyn DeviceBackend,
        address: &DeviceAddress,
        config: &SerialConfig,
        errors_suppressed: bool,
    ) -> Result<DeviceHandle> {
        let command = self.build_command(address, config)?;

        let native = backend.open(address).map_err(|source| DeviceError::Open {
            path: address.path().to_path_buf(),
            source,
        })?;
        let mut handle = DeviceHandle::new(native, address.clone(), errors_suppressed);
        reset_io_options(&mut handle)?;

        wait_for_boot(backend, address, config.boot_delay());
        run_command(backend, &command);

        if !handle.is_terminal() {
            let _ = handle.close();
            return Err(DeviceError::NotATerminal {
                path: address.path().to_path_buf(),
            });
        }

        if let Err(err) = handle.set_option(HandleOption::Blocking(false)) {
            let _ = handle.close();
            return Err(err);
        }

        info!(device = %address, platform = %self.platform, "device ready");
        Ok(handle)
    }
}

/// Windows sequence: configure, open, settle.
///
/// `mode` cannot reconfigure a port once a handle is held, so it runs first.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsDriver;

impl PlatformDriver for WindowsDriver {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn apply_configuration(
        &self,
        backend: &dyn DeviceBackend,
        address: &DeviceAddress,
        config: &SerialConfig,
        errors_suppressed: bool,
    ) -> Result<DeviceHandle> {
        let command = self.build_command(address, config)?;
        run_command(backend, &command);

        let native = backend.open(address).map_err(|source| DeviceError::Open {
            path: address.path().to_path_buf(),
            source,
        })?;
        let mut handle = DeviceHandle::new(native, address.clone(), errors_suppressed);

        wait_for_boot(backend, address, config.boot_delay());
        reset_io_options(&mut handle)?;

        // The result of this switch is unreliable on COM ports; it is not checked.
        if let Err(err) = handle.set_option(HandleOption::Blocking(false)) {
            debug!(device = %address, error = %err, "ignoring non-blocking switch failure");
        }

        info!(device = %address, platform = %Platform::Windows, "device ready");
        Ok(handle)
    }
}

fn reset_io_options(handle: &mut DeviceHandle) -> Result<()> {
    handle.set_option(HandleOption::ReadTimeout(Duration::ZERO))?;
    handle.set_option(HandleOption::ReadBuffer(0))?;
    handle.set_option(HandleOption::WriteBuffer(0))
}

fn wait_for_boot(backend: &dyn DeviceBackend, address: &DeviceAddress, delay: Duration) {
    debug!(device = %address, ?delay, "waiting for device to boot");
    backend.sleep(delay);
}

/// Run the configuration command. Failure is logged, not fatal.
fn run_command(backend: &dyn DeviceBackend, command: &ConfigCommand) {
    debug!(%command, "applying line settings");
    if let Err(err) = backend.execute(command) {
        warn!(%command, error = %err, "configuration command failed");
    }
}
