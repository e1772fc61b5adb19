//! Configure and talk to USB serial microcontrollers.
//!
//! Opening a USB-serial port often resets the board behind it, and the
//! point at which line settings can be applied differs between POSIX and
//! Windows. ttyprims sequences configuration, open, and boot delay
//! correctly for the host platform and hands back a non-blocking handle.
//!
//! # Crate Structure
//!
//! - [`config`]: line settings, option maps, and command planning (no I/O)
//! - [`device`]: address resolution, the configurator, and device handles
//! - [`registry`]: `scheme://device` bindings (behind `registry` feature)
//! - [`pack`]: conversion between integer sequences and byte strings
//!
//! ```no_run
//! use ttyprims::registry::{ProtocolRegistry, DEFAULT_SCHEME};
//! use ttyprims::config::SerialOptions;
//!
//! let registry = ProtocolRegistry::init(DEFAULT_SCHEME, SerialOptions::default())?;
//! let options = SerialOptions { baud_rate: Some(115_200), ..SerialOptions::default() };
//! let mut handle = registry.open("arduino://ttyACM0", &options)?;
//! handle.write(b"ping\n")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export configuration types.
pub mod config {
    pub use ttyprims_config::*;
}

/// Re-export device types.
pub mod device {
    pub use ttyprims_device::*;
}

/// Re-export registry types (requires `registry` feature).
#[cfg(feature = "registry")]
pub mod registry {
    pub use ttyprims_registry::*;
}

pub mod pack;

pub use pack::{pack, unpack};
