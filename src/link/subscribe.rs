use crate::util::io::bus::Subscription;
use crate::util::io::serial::TelemetryRecord;

use super::{ConnectionState, DeviceLink};

impl DeviceLink {
    /// Connection-status updates, starting with the current state.
    pub fn subscribe_status(&self) -> Subscription<ConnectionState> {
        self.inner.broadcaster.subscribe_status()
    }

    /// Relay on/off updates, starting with the last known value.
    pub fn subscribe_relay(&self) -> Subscription<bool> {
        self.inner.broadcaster.subscribe_relay()
    }

    /// Telemetry from sensor packets received after subscribing.
    pub fn subscribe_telemetry(&self) -> Subscription<TelemetryRecord> {
        self.inner.broadcaster.subscribe_telemetry()
    }

    pub fn relay_state(&self) -> bool {
        self.inner.broadcaster.relay_state()
    }

    pub fn latest_telemetry(&self) -> Option<TelemetryRecord> {
        self.inner.broadcaster.latest_telemetry()
    }
}
