use crate::log_info;

use super::{ConnectionState, DeviceLink};

impl DeviceLink {
    /// Never blocks on I/O; the state lock is only held for plain reads and writes.
    pub fn current_state(&self) -> ConnectionState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to `next` and broadcast it before returning. Leaving `connected`
    /// also resets the relay to off.
    pub(in crate::link) fn transition(&self, next: ConnectionState) -> ConnectionState {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let previous = *state;
        *state = next;

        self.inner.broadcaster.publish_status(next);
        if previous.is_connected() && !next.is_connected() {
            self.inner.broadcaster.publish_relay(false);
        }

        if previous != next {
            log_info!("🔌 Connection state: {} → {}", previous, next);
        }
        previous
    }

    /// Atomically claim the connect slot. Returns false when a session is
    /// already connecting or connected.
    pub(in crate::link) fn begin_connect(&self) -> bool {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.is_active() {
            return false;
        }

        let previous = *state;
        *state = ConnectionState::Connecting;
        self.inner.broadcaster.publish_status(ConnectionState::Connecting);
        log_info!("🔌 Connection state: {} → {}", previous, ConnectionState::Connecting);
        true
    }
}
