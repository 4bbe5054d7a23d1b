//! Core traits for the transport abstraction.
//!
//! A [`StreamConnector`] knows how to reach a dongle and hands back a split
//! duplex stream ([`StreamPair`]). The generic
//! [`TransportPort`](super::TransportPort) owns the buffering, timeout and
//! shutdown logic on top of it, and exposes the [`ZigBeePort`] contract to the
//! protocol stack.

use super::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

/// Integer form of "no data": timeout, closed port or dead link.
pub const NO_DATA: i32 = -1;

/// Default receive ring capacity in bytes.
pub const DEFAULT_RX_CAPACITY: usize = 512;

/// Default size of a single chunk read from the underlying stream.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Tunables shared by every port instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSettings {
    /// Ring buffer capacity. One slot is kept free to tell full from empty.
    pub rx_capacity: usize,

    /// Maximum number of bytes pulled from the stream per read call.
    pub chunk_size: usize,

    /// Upper bound on establishing a network connection.
    pub connect_timeout: Duration,

    /// Read timeout at the chunk layer; bounds how long the receive loop
    /// can go without re-checking whether it should stop.
    pub poll_interval: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            rx_capacity: DEFAULT_RX_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Flow control modes for serial dongles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    /// XON/XOFF.
    Software,
    /// RTS/CTS.
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

impl FromStr for FlowControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "software" | "xonxoff" => Ok(Self::Software),
            "hardware" | "rtscts" => Ok(Self::Hardware),
            other => Err(format!("unknown flow control mode '{other}'")),
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Software => "software",
            Self::Hardware => "hardware",
        };
        f.write_str(name)
    }
}

/// Per-open link overrides.
///
/// Serial connectors apply them; network connectors ignore them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkParams {
    pub baud_rate: Option<u32>,
    pub flow_control: Option<FlowControl>,
}

impl LinkParams {
    pub fn with_baud(baud_rate: u32) -> Self {
        Self {
            baud_rate: Some(baud_rate),
            flow_control: None,
        }
    }

    pub fn with_baud_and_flow(baud_rate: u32, flow_control: FlowControl) -> Self {
        Self {
            baud_rate: Some(baud_rate),
            flow_control: Some(flow_control),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.baud_rate.is_none() && self.flow_control.is_none()
    }
}

/// Receive half of a duplex stream, driven by the port's background loop.
pub trait StreamReader: Send {
    /// Read up to `buf.len()` bytes.
    ///
    /// `Ok(0)` means end-of-stream. Errors of kind `TimedOut`, `WouldBlock`
    /// or `Interrupted` mean "nothing yet"; the loop retries after checking
    /// whether it has been asked to stop. Implementations must return within
    /// roughly the poll interval they were connected with.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Transmit half of a duplex stream.
pub trait StreamWriter: Send {
    /// Write all of `data` and flush.
    fn write_all_flush(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Out-of-band teardown handle for a duplex stream.
///
/// Held apart from the writer so it can be used while a write is blocked.
/// After `shutdown` a pending `read_chunk` or `write_all_flush` on the same
/// stream must return promptly, with an error or end-of-stream.
pub trait StreamShutdown: Send {
    fn shutdown(&self) -> io::Result<()>;
}

/// An established duplex stream, split so reads and writes never contend.
pub struct StreamPair {
    pub reader: Box<dyn StreamReader>,
    pub writer: Box<dyn StreamWriter>,
    pub shutdown: Box<dyn StreamShutdown>,
}

impl fmt::Debug for StreamPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamPair").finish_non_exhaustive()
    }
}

/// Something that can establish a duplex byte stream to a dongle.
pub trait StreamConnector: Send + Sync + fmt::Debug + 'static {
    /// Establish a new stream.
    fn connect(
        &self,
        params: &LinkParams,
        settings: &PortSettings,
    ) -> Result<StreamPair, TransportError>;

    /// Human-readable description of the target, used in logs.
    fn target(&self) -> String;
}

/// The byte-level contract the ZigBee protocol stack programs against.
pub trait ZigBeePort: Send + Sync {
    /// Open with the target's configured link parameters.
    fn open(&self) -> Result<(), TransportError> {
        self.open_with(LinkParams::default())
    }

    /// Open, overriding baud rate and/or flow control for this session.
    fn open_with(&self, params: LinkParams) -> Result<(), TransportError>;

    /// Release the stream. Always succeeds and may be called repeatedly.
    fn close(&self);

    /// Send a single byte. Failures are logged, never returned.
    fn write_byte(&self, byte: u8) {
        self.write(&[byte]);
    }

    /// Send a byte array. Failures are logged, never returned.
    fn write(&self, data: &[u8]);

    /// Block until a byte arrives or the link goes down.
    fn read(&self) -> Option<u8>;

    /// Block for at most `timeout` waiting for a byte.
    fn read_timeout(&self, timeout: Duration) -> Option<u8>;

    /// [`read`](Self::read) in integer form: `0..=255`, or [`NO_DATA`].
    fn read_code(&self) -> i32 {
        self.read().map_or(NO_DATA, i32::from)
    }

    /// [`read_timeout`](Self::read_timeout) in integer form.
    fn read_code_timeout(&self, timeout_ms: u64) -> i32 {
        self.read_timeout(Duration::from_millis(timeout_ms))
            .map_or(NO_DATA, i32::from)
    }

    /// Discard everything received but not yet read.
    fn purge_rx_buffer(&self);
}
