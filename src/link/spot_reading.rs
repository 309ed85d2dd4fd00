use crate::readings::{SpotKind, SpotReading};

use super::DeviceLink;

impl DeviceLink {
    /// Simulated NPK / pH / tank reading; works in any connection state.
    pub async fn get_spot_reading(&self, kind: SpotKind) -> SpotReading {
        self.inner.readings.read(kind).await
    }
}
