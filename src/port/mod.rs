//! Byte-stream transport for ZigBee coordinator dongles.
//!
//! [`TransportPort`] turns a TCP socket or serial line into the blocking,
//! timeout-bounded single-byte interface ([`ZigBeePort`]) a ZigBee protocol
//! stack drives. The stream itself is supplied by a [`StreamConnector`]:
//! [`TcpConnector`], [`SerialConnector`], or [`MockConnector`] for tests.

pub mod error;
pub mod mock;
pub mod ring;
pub mod serial;
pub mod target;
pub mod tcp;
pub mod traits;
pub mod transport;

pub use error::{TransportError, TransportResult};
pub use mock::{ConnectFailure, MockConnector};
pub use ring::RxRingBuffer;
pub use serial::{SerialConnector, DEFAULT_BAUD_RATE};
pub use target::{DongleConnector, PortTarget, TargetDefaults};
pub use tcp::TcpConnector;
pub use traits::*;
pub use transport::{PortStats, TransportPort};
