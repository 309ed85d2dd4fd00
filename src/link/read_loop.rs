use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::util::io::frame::LineFramer;
use crate::util::io::serial::{DeviceMessage, Rejection};
use crate::{log_debug, log_error, log_info, log_warn};

use super::{DeviceLink, LinkReader, TeardownCause};

enum ReadEnd {
    Cancelled,
    EndOfStream,
    Failed(std::io::Error),
}

impl DeviceLink {
    /// Body of the per-connection read task. Returns the read half so teardown
    /// can release it.
    pub(in crate::link) async fn read_loop(
        self,
        mut reader: LinkReader,
        cancel: CancellationToken,
        generation: u64,
    ) -> LinkReader {
        let mut framer = LineFramer::new();
        let mut chunk = vec![0u8; self.inner.config.read_chunk_size];

        log_info!("📡 Read task started (session {})", generation);

        let end = loop {
            // The pending read is dropped, not just flagged, when cancelled
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => break ReadEnd::Cancelled,
                read = reader.read(&mut chunk) => read,
            };

            match read {
                Ok(0) => break ReadEnd::EndOfStream,
                Ok(n) => {
                    log_debug!("Serial received {} bytes", n);
                    for line in framer.push(&chunk[..n]) {
                        if cancel.is_cancelled() {
                            break;
                        }
                        self.dispatch_line(&line);
                    }
                }
                Err(e) => break ReadEnd::Failed(e),
            }
        };

        let dropped = framer.finish();
        if dropped > 0 {
            log_debug!("Discarding {} bytes of unterminated input", dropped);
        }

        match end {
            ReadEnd::Cancelled => {
                log_info!("Read task stopped (session {})", generation);
            }
            ReadEnd::EndOfStream => {
                log_warn!("Serial stream closed by device (session {})", generation);
                self.spawn_teardown(generation, TeardownCause::EndOfStream);
            }
            ReadEnd::Failed(e) => {
                log_error!("Error reading from serial port: {}", e);
                self.spawn_teardown(generation, TeardownCause::ReadFailed);
            }
        }

        reader
    }

    fn dispatch_line(&self, line: &str) {
        match DeviceMessage::classify(line) {
            Ok(DeviceMessage::SensorPacket { telemetry, relay_on }) => {
                log_debug!("Sensor packet: {:?}, relay={}", telemetry, relay_on);
                self.inner.broadcaster.publish_packet(telemetry, relay_on);
            }
            Ok(DeviceMessage::Diagnostic(message)) => {
                log_error!("Error from device: {}", message);
            }
            Ok(DeviceMessage::Status(message)) => {
                log_info!("Status from device: {}", message);
            }
            Err(rejection @ Rejection::Malformed(_)) => {
                log_warn!("Could not parse JSON from serial port: {} ({})", line, rejection);
            }
            Err(Rejection::UnknownShape) => {
                log_debug!("Ignoring unrecognised line: {}", line);
            }
        }
    }
}
