// src/link/mod.rs
//! Device link - the single serial session with the irrigation controller.
//!
//! `DeviceLink` is a cheap, cloneable handle. The owning process builds one
//! and passes clones to every consumer; all clones drive the same session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::LinkConfig;
use crate::readings::SpotReadingGenerator;
use crate::util::io::bus::EventBroadcaster;
use crate::util::io::transport::{ByteLink, DevicePort, PortSelector};

mod connect;
mod disconnect;
mod new;
mod read_loop;
mod send_command;
mod spot_reading;
mod subscribe;
mod teardown;
mod transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Connecting or connected: a new `connect()` is a no-op.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(label)
    }
}

/// What ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TeardownCause {
    Requested,
    EndOfStream,
    ReadFailed,
    WriteFailed,
}

impl fmt::Display for TeardownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownCause::Requested => write!(f, "disconnect requested"),
            TeardownCause::EndOfStream => write!(f, "stream ended"),
            TeardownCause::ReadFailed => write!(f, "read failed"),
            TeardownCause::WriteFailed => write!(f, "write failed"),
        }
    }
}

type LinkReader = ReadHalf<Box<dyn ByteLink>>;
type LinkWriter = WriteHalf<Box<dyn ByteLink>>;

/// Resources owned by one open connection.
struct Session {
    generation: u64,
    port: Box<dyn DevicePort>,
    cancel: CancellationToken,
    /// Hands the read half back when the task stops
    reader_task: JoinHandle<LinkReader>,
}

struct CommandWriter {
    generation: u64,
    /// Session token; an in-flight write gives up the lock when it fires
    cancel: CancellationToken,
    half: LinkWriter,
}

struct LinkInner {
    config: LinkConfig,
    selector: Arc<dyn PortSelector>,
    broadcaster: EventBroadcaster,
    readings: SpotReadingGenerator,

    /// Never held across an await
    state: Mutex<ConnectionState>,
    session: tokio::sync::Mutex<Option<Session>>,
    writer: tokio::sync::Mutex<Option<CommandWriter>>,
    /// Serializes session install and teardown
    lifecycle: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

#[derive(Clone)]
pub struct DeviceLink {
    inner: Arc<LinkInner>,
}

impl fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLink")
            .field("state", &self.current_state())
            .field("config", &self.inner.config)
            .field("broadcaster", &self.inner.broadcaster)
            .finish()
    }
}
