use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::{log_info, log_warn};

use super::{ConnectionState, DeviceLink, TeardownCause};

impl DeviceLink {
    /// Release the current session and end in `disconnected`.
    ///
    /// With `Some(generation)` only that session is torn down, so a late
    /// failure report from an old session can't close a newer one. Every I/O step
    /// is bounded by the configured timeout and runs even if an earlier step
    /// failed.
    pub(in crate::link) async fn teardown(&self, generation: Option<u64>, cause: TeardownCause) {
        let _lifecycle = self.inner.lifecycle.lock().await;

        let session = {
            let mut slot = self.inner.session.lock().await;
            match (slot.as_ref(), generation) {
                (Some(current), Some(wanted)) if current.generation != wanted => None,
                _ => slot.take(),
            }
        };

        let Some(mut session) = session else {
            return;
        };

        let step = self.inner.config.teardown_step_timeout();
        log_info!("Closing session {} ({})", session.generation, cause);

        // 1. Stop the read task and any in-flight write; both drop their
        // pending I/O on cancellation
        session.cancel.cancel();

        // 2. Write side first. The cancelled write releases the lock promptly,
        // and the writer must leave the slot so the transport really closes.
        let writer = {
            let mut slot = self.inner.writer.lock().await;
            match slot.as_ref() {
                Some(w) if w.generation == session.generation => slot.take(),
                _ => None,
            }
        };
        if let Some(mut writer) = writer {
            match timeout(step, writer.half.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log_warn!("Error closing writer: {}", e),
                Err(_) => log_warn!("Timed out closing writer"),
            }
        }

        // 3. Read side
        match timeout(step, &mut session.reader_task).await {
            Ok(Ok(reader)) => drop(reader),
            Ok(Err(e)) => log_warn!("Read task ended abnormally: {}", e),
            Err(_) => {
                log_warn!("Read task did not stop in time; aborting it");
                session.reader_task.abort();
            }
        }

        // 4. The port itself
        match timeout(step, session.port.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log_warn!("Error closing port {}: {}", session.port.path(), e),
            Err(_) => log_warn!("Timed out closing port {}", session.port.path()),
        }

        self.transition(ConnectionState::Disconnected);
    }

    /// Teardown triggered from inside the read task. Runs on its own task so
    /// the read task can finish and be joined.
    pub(in crate::link) fn spawn_teardown(&self, generation: u64, cause: TeardownCause) {
        let link = self.clone();
        tokio::spawn(async move {
            link.teardown(Some(generation), cause).await;
        });
    }
}
