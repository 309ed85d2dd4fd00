// src/tests/fixtures.rs
// In-memory stand-ins for the serial capability

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::Notify;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::util::io::bus::Subscription;
use crate::util::io::transport::{ByteLink, DevicePort, PortSelector};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn fast_config() -> LinkConfig {
    LinkConfig {
        read_chunk_size: 64,
        teardown_step_timeout_ms: 200,
        npk_delay_ms: 20,
        ph_delay_ms: 5,
        tank_delay_ms: 5,
        ..LinkConfig::default()
    }
}

/// Engine end and device end of an in-memory serial cable.
pub fn cable() -> (DuplexStream, DuplexStream) {
    tokio::io::duplex(4096)
}

pub enum Outcome {
    Device(Box<dyn ByteLink>),
    OpenFails,
    Unavailable,
    Cancelled,
}

#[derive(Default)]
pub struct Counters {
    pub requests: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

/// Hands out scripted outcomes, one per `request_port` call.
pub struct ScriptedSelector {
    outcomes: Mutex<VecDeque<Outcome>>,
    pub counters: Arc<Counters>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedSelector {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            counters: Arc::new(Counters::default()),
            gate: None,
        }
    }

    /// Selection blocks until the returned `Notify` is signalled.
    pub fn gated(outcomes: Vec<Outcome>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let mut selector = Self::new(outcomes);
        selector.gate = Some(gate.clone());
        (selector, gate)
    }

    pub fn with_device(link: impl ByteLink + 'static) -> Self {
        Self::new(vec![Outcome::Device(Box::new(link))])
    }
}

#[async_trait]
impl PortSelector for ScriptedSelector {
    async fn request_port(&self) -> Result<Box<dyn DevicePort>> {
        self.counters.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(Outcome::Device(link)) => Ok(Box::new(FakePort {
                link: Some(link),
                counters: self.counters.clone(),
            })),
            Some(Outcome::OpenFails) => Ok(Box::new(FakePort {
                link: None,
                counters: self.counters.clone(),
            })),
            Some(Outcome::Cancelled) => Err(LinkError::SelectionCancelled),
            Some(Outcome::Unavailable) | None => Err(LinkError::CapabilityUnavailable(
                "no serial support".to_string(),
            )),
        }
    }
}

pub struct FakePort {
    link: Option<Box<dyn ByteLink>>,
    counters: Arc<Counters>,
}

#[async_trait]
impl DevicePort for FakePort {
    fn path(&self) -> &str {
        "/dev/ttyFAKE0"
    }

    async fn open(&mut self, _baud_rate: u32) -> Result<Box<dyn ByteLink>> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.link.take().ok_or_else(|| LinkError::OpenFailed {
            path: self.path().to_string(),
            reason: "device busy".to_string(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Serves `data` once, then fails every read.
pub struct FailingReadLink {
    data: Option<Vec<u8>>,
}

impl FailingReadLink {
    pub fn new(data: &[u8]) -> Self {
        Self { data: Some(data.to_vec()) }
    }
}

impl AsyncRead for FailingReadLink {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.data.take() {
            Some(mut data) => {
                let n = data.len().min(buf.remaining());
                buf.put_slice(&data[..n]);
                let rest = data.split_off(n);
                if !rest.is_empty() {
                    self.data = Some(rest);
                }
                Poll::Ready(Ok(()))
            }
            None => Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))),
        }
    }
}

impl AsyncWrite for FailingReadLink {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Reads never complete; writes always fail. Records whether shutdown ran.
pub struct BrokenWriteLink {
    pub shut_down: Arc<AtomicBool>,
}

impl AsyncRead for BrokenWriteLink {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for BrokenWriteLink {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "tx line cut")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shut_down.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Wait until `sub` reports `wanted`, collecting everything seen on the way.
pub async fn wait_for<T: PartialEq + std::fmt::Debug>(sub: &mut Subscription<T>, wanted: T) -> Vec<T> {
    let mut seen = Vec::new();
    let found = tokio::time::timeout(WAIT, async {
        while let Some(value) = sub.recv().await {
            let done = value == wanted;
            seen.push(value);
            if done {
                return true;
            }
        }
        false
    })
    .await;

    assert!(
        matches!(found, Ok(true)),
        "never saw {:?}; saw {:?}",
        wanted,
        seen
    );
    seen
}
