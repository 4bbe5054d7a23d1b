//! In-memory duplex stream for testing.
//!
//! `MockConnector` hands out a reader/writer pair backed by shared state, so a
//! test can keep a clone of the connector and act as the dongle: enqueue bytes
//! for the port to receive, inspect what the port wrote, echo writes back,
//! drop the link, or make connects and writes fail.

use super::error::TransportError;
use super::traits::{
    LinkParams, PortSettings, StreamConnector, StreamPair, StreamReader, StreamShutdown,
    StreamWriter,
};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Failure modes a mock connect can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    Refused,
    Timeout,
}

#[derive(Debug, Default)]
struct MockState {
    /// Bytes the port will receive.
    read_queue: VecDeque<u8>,
    /// Every successful write, one entry per call.
    write_log: Vec<Vec<u8>>,
    /// Loop writes back into the read queue.
    echo: bool,
    /// The simulated peer hung up; reads report end-of-stream.
    peer_closed: bool,
    /// The port shut the current stream down.
    shut_down: bool,
    fail_connect: Option<ConnectFailure>,
    fail_writes: bool,
    /// Writes block until the stream is shut down, like a peer that stopped reading.
    stall_writes: bool,
    /// Writers currently parked by `stall_writes`.
    blocked_writes: usize,
    connect_count: usize,
    last_params: Option<LinkParams>,
}

#[derive(Debug, Default)]
struct MockShared {
    state: Mutex<MockState>,
    readable: Condvar,
}

/// Mock stream connector for testing.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use zigbee_port::port::{MockConnector, TransportPort, ZigBeePort};
///
/// let dongle = MockConnector::new("MOCK0");
/// let port = TransportPort::new(dongle.clone());
/// port.open().unwrap();
///
/// dongle.enqueue_read(&[0x1A]);
/// assert_eq!(port.read_timeout(Duration::from_secs(1)), Some(0x1A));
///
/// port.write(&[0xC0]);
/// assert_eq!(dongle.written_bytes(), vec![0xC0]);
/// port.close();
/// ```
#[derive(Clone)]
pub struct MockConnector {
    name: String,
    shared: Arc<MockShared>,
}

impl MockConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(MockShared::default()),
        }
    }

    /// Create a connector that echoes every write back to the reader.
    pub fn loopback(name: impl Into<String>) -> Self {
        let mock = Self::new(name);
        mock.set_echo(true);
        mock
    }

    /// Queue bytes for the port to receive.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        drop(state);
        self.shared.readable.notify_all();
    }

    pub fn set_echo(&self, echo: bool) {
        self.shared.state.lock().echo = echo;
    }

    /// Simulate the peer dropping the connection.
    pub fn disconnect_peer(&self) {
        self.shared.state.lock().peer_closed = true;
        self.shared.readable.notify_all();
    }

    /// Make the next connect attempt fail.
    pub fn fail_next_connect(&self, failure: ConnectFailure) {
        self.shared.state.lock().fail_connect = Some(failure);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.state.lock().fail_writes = fail;
    }

    /// Make writes block until the stream is shut down or the peer hangs up.
    pub fn set_stall_writes(&self, stall: bool) {
        self.shared.state.lock().stall_writes = stall;
        self.shared.readable.notify_all();
    }

    /// Number of writes currently blocked by [`set_stall_writes`](Self::set_stall_writes).
    pub fn blocked_writes(&self) -> usize {
        self.shared.state.lock().blocked_writes
    }

    /// Copy of every write, one entry per call.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// All written bytes, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared.state.lock().write_log.concat()
    }

    pub fn clear_write_log(&self) {
        self.shared.state.lock().write_log.clear();
    }

    pub fn connect_count(&self) -> usize {
        self.shared.state.lock().connect_count
    }

    /// Link overrides passed to the most recent successful connect.
    pub fn last_params(&self) -> Option<LinkParams> {
        self.shared.state.lock().last_params
    }

    /// Whether the port shut the current stream down.
    pub fn was_shut_down(&self) -> bool {
        self.shared.state.lock().shut_down
    }

    /// Bytes queued but not yet pulled by the port.
    pub fn pending_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("name", &self.name)
            .field("pending_bytes", &self.pending_bytes())
            .finish()
    }
}

impl StreamConnector for MockConnector {
    fn connect(
        &self,
        params: &LinkParams,
        settings: &PortSettings,
    ) -> Result<StreamPair, TransportError> {
        let mut state = self.shared.state.lock();
        if let Some(failure) = state.fail_connect.take() {
            return Err(match failure {
                ConnectFailure::Refused => TransportError::Refused(self.name.clone()),
                ConnectFailure::Timeout => {
                    TransportError::connect_timeout(self.name.clone(), settings.connect_timeout)
                }
            });
        }

        state.connect_count += 1;
        state.last_params = Some(*params);
        state.peer_closed = false;
        state.shut_down = false;
        drop(state);

        Ok(StreamPair {
            reader: Box::new(MockReader {
                shared: Arc::clone(&self.shared),
                poll_interval: settings.poll_interval,
            }),
            writer: Box::new(MockWriter {
                shared: Arc::clone(&self.shared),
            }),
            shutdown: Box::new(MockShutdown {
                shared: Arc::clone(&self.shared),
            }),
        })
    }

    fn target(&self) -> String {
        format!("mock://{}", self.name)
    }
}

struct MockReader {
    shared: Arc<MockShared>,
    poll_interval: Duration,
}

impl StreamReader for MockReader {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.shared.state.lock();
        if state.read_queue.is_empty() && !state.peer_closed && !state.shut_down {
            let _ = self.shared.readable.wait_for(&mut state, self.poll_interval);
        }

        if !state.read_queue.is_empty() {
            let n = buf.len().min(state.read_queue.len());
            for (slot, byte) in buf.iter_mut().zip(state.read_queue.drain(..n)) {
                *slot = byte;
            }
            return Ok(n);
        }
        if state.peer_closed || state.shut_down {
            return Ok(0);
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "no data available"))
    }
}

struct MockWriter {
    shared: Arc<MockShared>,
}

impl StreamWriter for MockWriter {
    fn write_all_flush(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.shared.state.lock();
        if state.stall_writes && !state.shut_down && !state.peer_closed {
            state.blocked_writes += 1;
            while state.stall_writes && !state.shut_down && !state.peer_closed {
                self.shared.readable.wait(&mut state);
            }
            state.blocked_writes -= 1;
        }
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated write failure"));
        }
        if state.shut_down || state.peer_closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "stream is closed"));
        }
        state.write_log.push(data.to_vec());
        if state.echo {
            state.read_queue.extend(data);
            drop(state);
            self.shared.readable.notify_all();
        }
        Ok(())
    }
}

struct MockShutdown {
    shared: Arc<MockShared>,
}

impl StreamShutdown for MockShutdown {
    fn shutdown(&self) -> io::Result<()> {
        self.shared.state.lock().shut_down = true;
        self.shared.readable.notify_all();
        Ok(())
    }
}
