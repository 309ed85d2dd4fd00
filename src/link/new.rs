use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use crate::config::LinkConfig;
use crate::error::Result;
use crate::readings::SpotReadingGenerator;
use crate::util::io::bus::EventBroadcaster;
use crate::util::io::transport::{PortSelector, UsbPortSelector};

use super::{ConnectionState, DeviceLink, LinkInner};

impl DeviceLink {
    /// Build an idle link. Fails on a config `LinkConfig::validate` rejects.
    pub fn new(config: LinkConfig, selector: impl PortSelector + 'static) -> Result<Self> {
        Self::with_selector(config, Arc::new(selector))
    }

    pub fn with_selector(config: LinkConfig, selector: Arc<dyn PortSelector>) -> Result<Self> {
        config.validate()?;
        let readings = SpotReadingGenerator::from_config(&config);

        Ok(Self {
            inner: Arc::new(LinkInner {
                config,
                selector,
                broadcaster: EventBroadcaster::new(),
                readings,
                state: Mutex::new(ConnectionState::Disconnected),
                session: tokio::sync::Mutex::new(None),
                writer: tokio::sync::Mutex::new(None),
                lifecycle: tokio::sync::Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
        })
    }

    /// Link to a USB serial adapter, using `config.port_path` when set.
    pub fn usb(config: LinkConfig) -> Result<Self> {
        let selector = UsbPortSelector::new(config.port_path.clone());
        Self::new(config, selector)
    }

    pub fn config(&self) -> &LinkConfig {
        &self.inner.config
    }
}
