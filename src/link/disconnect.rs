use super::{DeviceLink, TeardownCause};

impl DeviceLink {
    /// Close the session, if any, and return once it is `disconnected`.
    /// Errors along the way are logged, never returned. Without an open
    /// session this is a no-op, apart from waiting out a teardown or session
    /// install already in flight.
    pub async fn disconnect(&self) {
        self.teardown(None, TeardownCause::Requested).await;
    }
}
