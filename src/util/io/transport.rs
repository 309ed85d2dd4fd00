// src/util/io/transport.rs
//! Transport capability - selecting, opening and closing the serial device

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;

use crate::error::{LinkError, Result};
use crate::{log_debug, log_info, log_warn};

/// An open duplex byte stream to the device.
pub trait ByteLink: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ByteLink for T {}

/// A selected, not necessarily open, device port. Only ever used from one
/// task at a time, so `Sync` is not required.
#[async_trait]
pub trait DevicePort: Send {
    /// Human-readable location, e.g. `/dev/ttyUSB0`
    fn path(&self) -> &str;

    async fn open(&mut self, baud_rate: u32) -> Result<Box<dyn ByteLink>>;

    /// Release the port. Must be safe to call whether or not `open` succeeded.
    async fn close(&mut self) -> Result<()>;
}

/// Host capability that picks which device to talk to.
#[async_trait]
pub trait PortSelector: Send + Sync {
    async fn request_port(&self) -> Result<Box<dyn DevicePort>>;
}

/// Selects a USB serial port: the configured path when given, otherwise the
/// first detected adapter.
#[derive(Debug, Clone, Default)]
pub struct UsbPortSelector {
    port_path: Option<String>,
}

impl UsbPortSelector {
    pub fn new(port_path: Option<String>) -> Self {
        Self { port_path }
    }

    /// Detect available USB serial ports (works on Linux + macOS)
    pub fn detect_usb_ports() -> Vec<String> {
        let mut ports = Vec::new();

        #[cfg(target_os = "linux")]
        {
            // ttyUSB* for FTDI/CH340 adapters, ttyACM* for native USB boards
            if let Ok(entries) = std::fs::read_dir("/dev") {
                for entry in entries.flatten() {
                    if let Some(name) = entry.file_name().to_str() {
                        if name.starts_with("ttyUSB") || name.starts_with("ttyACM") {
                            ports.push(format!("/dev/{}", name));
                        }
                    }
                }
            }
        }

        #[cfg(target_os = "macos")]
        {
            if let Ok(entries) = std::fs::read_dir("/dev") {
                for entry in entries.flatten() {
                    if let Some(name) = entry.file_name().to_str() {
                        if name.starts_with("cu.usb") {
                            ports.push(format!("/dev/{}", name));
                        }
                    }
                }
            }
        }

        if ports.is_empty() {
            if let Ok(found) = tokio_serial::available_ports() {
                ports.extend(found.into_iter().map(|info| info.port_name));
            }
        }

        ports.sort();
        ports.dedup();
        ports
    }
}

#[async_trait]
impl PortSelector for UsbPortSelector {
    async fn request_port(&self) -> Result<Box<dyn DevicePort>> {
        if let Some(path) = &self.port_path {
            log_info!("Using configured serial port {}", path);
            return Ok(Box::new(UsbPort::new(path.clone())));
        }

        let ports = tokio::task::spawn_blocking(Self::detect_usb_ports)
            .await
            .map_err(|e| LinkError::CapabilityUnavailable(e.to_string()))?;

        log_debug!("Detected serial ports: {:?}", ports);

        match ports.into_iter().next() {
            Some(path) => {
                log_info!("Selected serial port {}", path);
                Ok(Box::new(UsbPort::new(path)))
            }
            None => {
                log_warn!("No USB serial ports detected");
                Err(LinkError::CapabilityUnavailable(
                    "no USB serial ports detected".to_string(),
                ))
            }
        }
    }
}

/// A USB serial adapter backed by `tokio-serial`.
#[derive(Debug)]
pub struct UsbPort {
    path: String,
    opened: bool,
}

impl UsbPort {
    pub fn new(path: String) -> Self {
        Self { path, opened: false }
    }
}

#[async_trait]
impl DevicePort for UsbPort {
    fn path(&self) -> &str {
        &self.path
    }

    async fn open(&mut self, baud_rate: u32) -> Result<Box<dyn ByteLink>> {
        log_info!("Opening serial port {} at {} baud", self.path, baud_rate);

        let stream = tokio_serial::new(&self.path, baud_rate)
            .open_native_async()
            .map_err(|e| LinkError::OpenFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        self.opened = true;
        Ok(Box::new(stream))
    }

    async fn close(&mut self) -> Result<()> {
        // The OS handle lives in the stream halves; dropping them closes it
        if self.opened {
            log_debug!("Serial port {} released", self.path);
            self.opened = false;
        }
        Ok(())
    }
}
