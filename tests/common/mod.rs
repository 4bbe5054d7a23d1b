//! Shared test utilities for transport tests.
//!
//! - Mock-backed ports with short poll intervals
//! - A localhost TCP echo / scripted peer
//! - Polling helpers for asynchronous conditions

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use zigbee_port::port::{MockConnector, PortSettings, TransportPort, ZigBeePort};

/// Poll interval used by tests so shutdown paths are exercised quickly.
pub const TEST_POLL: Duration = Duration::from_millis(10);

/// Port settings with a short poll interval.
pub fn test_settings() -> PortSettings {
    PortSettings {
        poll_interval: TEST_POLL,
        connect_timeout: Duration::from_secs(2),
        ..PortSettings::default()
    }
}

/// Open a port over a fresh mock dongle; returns the dongle handle and the port.
pub fn open_mock_port(name: &str) -> (MockConnector, TransportPort<MockConnector>) {
    open_mock_port_with(name, test_settings())
}

pub fn open_mock_port_with(
    name: &str,
    settings: PortSettings,
) -> (MockConnector, TransportPort<MockConnector>) {
    let dongle = MockConnector::new(name);
    let port = TransportPort::with_settings(dongle.clone(), settings);
    port.open().expect("mock open should succeed");
    (dongle, port)
}

/// Wait until `cond` holds or `timeout` elapses. Returns whether it held.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Read `n` bytes, each with the given timeout; stops early on no-data.
pub fn read_n<P: ZigBeePort>(port: &P, n: usize, timeout: Duration) -> Vec<u8> {
    (0..n).map_while(|_| port.read_timeout(timeout)).collect()
}

/// Drain everything currently readable.
pub fn drain<P: ZigBeePort>(port: &P) -> Vec<u8> {
    std::iter::from_fn(|| port.read_timeout(Duration::from_millis(20))).collect()
}

/// A localhost TCP server that echoes every byte of its first connection.
pub struct EchoServer {
    pub port: u16,
    handle: Option<JoinHandle<()>>,
}

impl EchoServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind echo server");
        let port = listener.local_addr().expect("local addr").port();
        let handle = thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 256];
                loop {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });
        Self {
            port,
            handle: Some(handle),
        }
    }

    /// Wait for the server thread to finish (after the client disconnects).
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A localhost TCP peer whose accepted stream is handed to the test.
pub struct ScriptedPeer {
    pub port: u16,
    accepted: mpsc::Receiver<TcpStream>,
}

impl ScriptedPeer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind scripted peer");
        let port = listener.local_addr().expect("local addr").port();
        let (tx, accepted) = mpsc::channel();
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                let _ = tx.send(stream);
            }
        });
        Self { port, accepted }
    }

    /// The server side of the connection, once the port has connected.
    pub fn accept(&self) -> TcpStream {
        self.accepted
            .recv_timeout(Duration::from_secs(5))
            .expect("port never connected")
    }
}
