//! ZigBee dongle transport library.
//!
//! Bridges TCP sockets and serial lines to the blocking, timeout-bounded
//! byte interface a ZigBee protocol stack expects.
//!
//! # Modules
//!
//! - `port`: transport port, receive ring buffer, stream connectors
//! - `config`: configuration management with TOML support

pub mod config;
pub mod port;

// Re-export commonly used types for convenience
pub use port::{
    DongleConnector, FlowControl, LinkParams, MockConnector, PortSettings, PortStats, PortTarget,
    RxRingBuffer, SerialConnector, StreamConnector, TcpConnector, TransportError, TransportPort,
    TransportResult, ZigBeePort, NO_DATA,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
