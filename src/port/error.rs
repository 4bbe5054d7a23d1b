//! Transport error types.
//!
//! Only connection establishment reports errors to callers. Everything that
//! happens after a successful open (write failures, peer disconnects, buffer
//! overruns) is logged and absorbed by the port.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while establishing or addressing a transport link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connect attempt did not complete within the configured timeout.
    #[error("Connection to {target} timed out after {timeout:?}")]
    ConnectTimeout { target: String, timeout: Duration },

    /// The remote end actively refused the connection.
    #[error("Connection refused by {0}")]
    Refused(String),

    /// The serial device does not exist.
    #[error("Serial device not found: {0}")]
    NotFound(String),

    /// The connection target could not be parsed or resolved.
    #[error("Invalid connection target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// `open` was called on a port that already owns a stream.
    #[error("Port is already open")]
    AlreadyOpen,

    /// An I/O error occurred while setting up the stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl TransportError {
    /// Create an InvalidTarget error.
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a NotFound error from a device path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a ConnectTimeout error.
    pub fn connect_timeout(target: impl Into<String>, timeout: Duration) -> Self {
        Self::ConnectTimeout {
            target: target.into(),
            timeout,
        }
    }
}

/// Result type for transport setup operations.
pub type TransportResult<T> = Result<T, TransportError>;
