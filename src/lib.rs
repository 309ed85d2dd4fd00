pub mod config;
pub mod error;
pub mod link;
pub mod readings;
pub mod util;

#[cfg(test)]
mod tests;

pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use link::{ConnectionState, DeviceLink};
pub use readings::{SpotKind, SpotReading};
pub use util::io::bus::Subscription;
pub use util::io::serial::{RelayCommand, TelemetryRecord};
pub use util::io::transport::{ByteLink, DevicePort, PortSelector, UsbPortSelector};
