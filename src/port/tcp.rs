//! TCP stream connector for network-attached dongles.

use super::error::TransportError;
use super::traits::{
    LinkParams, PortSettings, StreamConnector, StreamPair, StreamReader, StreamShutdown,
    StreamWriter,
};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use tracing::debug;

/// Connects to a dongle exposed as a raw TCP byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl StreamConnector for TcpConnector {
    fn connect(
        &self,
        params: &LinkParams,
        settings: &PortSettings,
    ) -> Result<StreamPair, TransportError> {
        let target = self.target();
        if !params.is_empty() {
            debug!(dongle = %target, ?params, "Link parameters do not apply to TCP targets");
        }

        let addrs: Vec<_> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::invalid_target(&target, e.to_string()))?
            .collect();
        if addrs.is_empty() {
            return Err(TransportError::invalid_target(&target, "host resolved to no addresses"));
        }

        let mut last_err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no address attempted");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, settings.connect_timeout) {
                Ok(stream) => return split(stream, settings),
                Err(e) => {
                    debug!(dongle = %target, %addr, "Connect attempt failed: {}", e);
                    last_err = e;
                }
            }
        }

        Err(match last_err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                TransportError::connect_timeout(target, settings.connect_timeout)
            }
            io::ErrorKind::ConnectionRefused => TransportError::Refused(target),
            _ => TransportError::Io(last_err),
        })
    }

    fn target(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

fn split(stream: TcpStream, settings: &PortSettings) -> Result<StreamPair, TransportError> {
    stream.set_nodelay(true)?;
    let reader = stream.try_clone()?;
    reader.set_read_timeout(Some(settings.poll_interval))?;
    let control = stream.try_clone()?;

    Ok(StreamPair {
        reader: Box::new(TcpReader { stream: reader }),
        writer: Box::new(TcpWriter { stream }),
        shutdown: Box::new(TcpShutdown { stream: control }),
    })
}

struct TcpReader {
    stream: TcpStream,
}

impl StreamReader for TcpReader {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

struct TcpWriter {
    stream: TcpStream,
}

impl StreamWriter for TcpWriter {
    fn write_all_flush(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()
    }
}

/// Shuts the socket down for every clone, failing blocked reads and writes.
struct TcpShutdown {
    stream: TcpStream,
}

impl StreamShutdown for TcpShutdown {
    fn shutdown(&self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            // Already torn down by the peer.
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
