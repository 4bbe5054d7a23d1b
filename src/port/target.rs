//! Connection targets.
//!
//! Accepted forms:
//!
//! - `tcp://host:port`, or bare `host:port`
//! - `serial:///dev/ttyUSB0`, `serial://COM3@57600`,
//!   `serial:///dev/ttyACM0@115200?flow=hardware`
//! - bare device paths (`/dev/...`, `COMn`), optionally with `@baud`

use super::error::TransportError;
use super::serial::{SerialConnector, DEFAULT_BAUD_RATE};
use super::tcp::TcpConnector;
use super::traits::{FlowControl, LinkParams, PortSettings, StreamConnector, StreamPair};
use std::fmt;
use std::str::FromStr;

/// Values filled in when a target string leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDefaults {
    pub baud_rate: u32,
    pub flow_control: FlowControl,
    pub tcp_port: Option<u16>,
}

impl Default for TargetDefaults {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            flow_control: FlowControl::None,
            tcp_port: None,
        }
    }
}

/// Where a dongle lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortTarget {
    Network {
        host: String,
        port: u16,
    },
    Serial {
        path: String,
        baud_rate: u32,
        flow_control: FlowControl,
    },
}

impl PortTarget {
    /// Parse a target string, filling gaps from `defaults`.
    pub fn parse(input: &str, defaults: &TargetDefaults) -> Result<Self, TransportError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TransportError::invalid_target(input, "empty target"));
        }

        if let Some(rest) = input.strip_prefix("tcp://") {
            return parse_network(input, rest, defaults);
        }
        if let Some(rest) = input.strip_prefix("serial://") {
            return parse_serial(input, rest, defaults);
        }
        if looks_like_device(input) {
            return parse_serial(input, input, defaults);
        }
        parse_network(input, input, defaults)
    }

    pub fn connector(&self) -> DongleConnector {
        match self {
            Self::Network { host, port } => DongleConnector::Tcp(TcpConnector::new(host, *port)),
            Self::Serial {
                path,
                baud_rate,
                flow_control,
            } => DongleConnector::Serial(SerialConnector::new(path, *baud_rate, *flow_control)),
        }
    }
}

impl FromStr for PortTarget {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, &TargetDefaults::default())
    }
}

impl fmt::Display for PortTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Serial {
                path,
                baud_rate,
                flow_control,
            } => write!(f, "serial://{path}@{baud_rate}?flow={flow_control}"),
        }
    }
}

fn looks_like_device(input: &str) -> bool {
    let upper = input.to_ascii_uppercase();
    input.starts_with('/')
        || (upper.starts_with("COM") && upper[3..].chars().next().is_some_and(|c| c.is_ascii_digit()))
}

fn parse_network(
    original: &str,
    rest: &str,
    defaults: &TargetDefaults,
) -> Result<PortTarget, TransportError> {
    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| TransportError::invalid_target(original, format!("invalid port '{port}'")))?;
            (host, port)
        }
        None => {
            let port = defaults
                .tcp_port
                .ok_or_else(|| TransportError::invalid_target(original, "missing port"))?;
            (rest, port)
        }
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(TransportError::invalid_target(original, "missing host"));
    }
    if port == 0 {
        return Err(TransportError::invalid_target(original, "port must be non-zero"));
    }

    Ok(PortTarget::Network {
        host: host.to_string(),
        port,
    })
}

fn parse_serial(
    original: &str,
    rest: &str,
    defaults: &TargetDefaults,
) -> Result<PortTarget, TransportError> {
    let (device, query) = match rest.split_once('?') {
        Some((device, query)) => (device, Some(query)),
        None => (rest, None),
    };

    let (path, baud_rate) = match device.rsplit_once('@') {
        Some((path, baud)) => {
            let baud = baud
                .parse::<u32>()
                .ok()
                .filter(|&b| b > 0)
                .ok_or_else(|| TransportError::invalid_target(original, format!("invalid baud rate '{baud}'")))?;
            (path, baud)
        }
        None => (device, defaults.baud_rate),
    };
    if path.is_empty() {
        return Err(TransportError::invalid_target(original, "missing device path"));
    }

    let mut flow_control = defaults.flow_control;
    for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some(("flow", value)) => {
                flow_control = value
                    .parse()
                    .map_err(|e: String| TransportError::invalid_target(original, e))?;
            }
            _ => {
                return Err(TransportError::invalid_target(
                    original,
                    format!("unknown option '{pair}'"),
                ))
            }
        }
    }

    Ok(PortTarget::Serial {
        path: path.to_string(),
        baud_rate,
        flow_control,
    })
}

/// Connector for either kind of dongle, so one concrete
/// `TransportPort<DongleConnector>` type covers both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DongleConnector {
    Tcp(TcpConnector),
    Serial(SerialConnector),
}

impl StreamConnector for DongleConnector {
    fn connect(
        &self,
        params: &LinkParams,
        settings: &PortSettings,
    ) -> Result<StreamPair, TransportError> {
        match self {
            Self::Tcp(c) => c.connect(params, settings),
            Self::Serial(c) => c.connect(params, settings),
        }
    }

    fn target(&self) -> String {
        match self {
            Self::Tcp(c) => c.target(),
            Self::Serial(c) => c.target(),
        }
    }
}
