use tokio::io::AsyncWriteExt;

use crate::error::{LinkError, Result};
use crate::util::io::serial::{to_wire, RelayCommand};
use crate::{log_debug, log_error, log_info, log_warn};

use super::{DeviceLink, TeardownCause};

impl DeviceLink {
    /// Write one newline-terminated command to the device.
    ///
    /// Rejected with `NotConnected` unless a session is open, and with
    /// `EmptyCommand` for blank input; neither touches the transport. A failed
    /// write closes the session the same way a failed read does.
    pub async fn send_command(&self, command: &str) -> Result<()> {
        let line = match to_wire(command) {
            Ok(line) => line,
            Err(e) => {
                log_warn!("Rejected command: {}", e);
                return Err(e);
            }
        };

        if !self.current_state().is_connected() {
            log_error!("Serial port not writable; dropping command {}", line.trim_end());
            return Err(LinkError::NotConnected);
        }

        let mut slot = self.inner.writer.lock().await;
        let Some(writer) = slot.as_mut() else {
            log_error!("Serial port not writable; dropping command {}", line.trim_end());
            return Err(LinkError::NotConnected);
        };

        let generation = writer.generation;
        let cancel = writer.cancel.clone();
        let write = async {
            writer.half.write_all(line.as_bytes()).await?;
            writer.half.flush().await
        };
        // A write stuck on a full device buffer must not hold the writer
        // past a teardown.
        let written: Option<std::io::Result<()>> = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            written = write => Some(written),
        };
        drop(slot);

        let Some(written) = written else {
            log_warn!("Session closed while writing {}; command abandoned", line.trim_end());
            return Err(LinkError::NotConnected);
        };

        match written {
            Ok(()) => {
                log_debug!("Sent command: {}", line.trim_end());
                Ok(())
            }
            Err(e) => {
                log_error!("Error writing to serial port: {}", e);
                self.teardown(Some(generation), TeardownCause::WriteFailed).await;
                Err(e.into())
            }
        }
    }

    pub async fn set_relay(&self, on: bool) -> Result<()> {
        let command = RelayCommand::for_state(on);
        log_info!("🚰 Sending relay {} command", if on { "on" } else { "off" });
        self.send_command(command.as_str()).await
    }

    /// Ask for the opposite of the last relay state the device reported.
    pub async fn toggle_relay(&self) -> Result<()> {
        self.set_relay(!self.relay_state()).await
    }
}
