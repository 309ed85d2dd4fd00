use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::{log_error, log_info, log_warn};

use super::{CommandWriter, ConnectionState, DeviceLink, Session};

impl DeviceLink {
    /// Select and open the device, then start the read task.
    ///
    /// Returns once the link is `connected` or `error`. A call while already
    /// connecting or connected does nothing and returns `Ok(())`. On failure
    /// the state is `error`, no port stays held, and the cause is returned.
    pub async fn connect(&self) -> Result<()> {
        if !self.begin_connect() {
            log_info!("A connection attempt is already in progress or established");
            return Ok(());
        }

        let mut port = match self.inner.selector.request_port().await {
            Ok(port) => port,
            Err(e) => {
                log_error!("Could not acquire a serial port: {}", e);
                self.transition(ConnectionState::Error);
                return Err(e);
            }
        };

        let link = match port.open(self.inner.config.baud_rate).await {
            Ok(link) => link,
            Err(e) => {
                log_error!("There was an error opening the serial port {}: {}", port.path(), e);
                if let Err(close_err) = port.close().await {
                    log_warn!("Error releasing port {}: {}", port.path(), close_err);
                }
                self.transition(ConnectionState::Error);
                return Err(e);
            }
        };

        // Hold the lifecycle lock until the session is stored so a read task
        // that ends immediately can't tear down a half-installed session.
        let _lifecycle = self.inner.lifecycle.lock().await;

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (reader, writer) = tokio::io::split(link);

        let cancel = CancellationToken::new();
        *self.inner.writer.lock().await = Some(CommandWriter {
            generation,
            cancel: cancel.clone(),
            half: writer,
        });

        self.transition(ConnectionState::Connected);
        log_info!("Serial port {} opened (session {})", port.path(), generation);

        let reader_task = tokio::spawn(self.clone().read_loop(reader, cancel.clone(), generation));

        *self.inner.session.lock().await = Some(Session {
            generation,
            port,
            cancel,
            reader_task,
        });

        Ok(())
    }
}
