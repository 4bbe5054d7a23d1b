//! Generic byte-stream transport port.
//!
//! `TransportPort` bridges a chunk-oriented, blocking OS stream to the
//! single-byte, timeout-bounded contract of [`ZigBeePort`]. A background
//! thread drains the stream into a bounded [`RxRingBuffer`]; consumers block on
//! a condition variable until a byte arrives, the deadline passes, or the port
//! is closed.
//!
//! ```text
//!  stream ──read_chunk──> receive loop ──push──> RxRingBuffer ──pop──> read_timeout()
//!                                  └──notify_all──> Condvar <──wait_until──┘
//! ```

use super::error::TransportError;
use super::ring::RxRingBuffer;
use super::traits::{
    LinkParams, PortSettings, StreamConnector, StreamPair, StreamReader, StreamShutdown,
    StreamWriter, ZigBeePort,
};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Snapshot of a port's traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PortStats {
    pub bytes_received: u64,
    pub bytes_delivered: u64,
    pub bytes_written: u64,
    pub bytes_evicted: u64,
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    bytes_received: AtomicU64,
    bytes_delivered: AtomicU64,
    bytes_written: AtomicU64,
    bytes_evicted: AtomicU64,
    write_failures: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> PortStats {
        PortStats {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_evicted: self.bytes_evicted.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Everything guarded by the receive mutex.
#[derive(Debug)]
struct RxState {
    ring: RxRingBuffer,
    /// True while a stream is attached and its receive loop is alive.
    link_up: bool,
}

/// State shared between the consumer side and the receive loop.
#[derive(Debug)]
struct Shared {
    rx: Mutex<RxState>,
    data_ready: Condvar,
    running: AtomicBool,
    stats: StatsCounters,
}

impl Shared {
    fn ingest(&self, data: &[u8]) -> usize {
        let evicted = {
            let mut rx = self.rx.lock();
            rx.ring.push_slice(data)
        };
        self.data_ready.notify_all();

        if evicted > 0 {
            self.stats
                .bytes_evicted
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
        self.stats
            .bytes_received
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        evicted
    }

    fn mark_link_down(&self) {
        self.rx.lock().link_up = false;
        self.data_ready.notify_all();
    }

    /// Pop one byte, waiting until `deadline` (or forever when `None`).
    fn pop_until(&self, deadline: Option<Instant>) -> Option<u8> {
        let mut rx = self.rx.lock();
        loop {
            if let Some(byte) = rx.ring.pop() {
                drop(rx);
                self.stats.bytes_delivered.fetch_add(1, Ordering::Relaxed);
                return Some(byte);
            }
            if !rx.link_up {
                return None;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return None;
                    }
                    // Spurious and early wakeups fall through to the re-check above.
                    let _ = self.data_ready.wait_until(&mut rx, deadline);
                }
                None => self.data_ready.wait(&mut rx),
            }
        }
    }
}

/// Lifecycle half of an attached stream: the teardown handle plus the thread
/// draining the receive half. The transmit half lives apart in
/// `TransportPort::writer` so a blocked write never holds up `close`.
struct Session {
    shutdown: Box<dyn StreamShutdown>,
    reader_task: JoinHandle<()>,
}

/// Buffered, timeout-bounded byte port over any [`StreamConnector`].
///
/// All methods take `&self`; share the port through an `Arc` to read on one
/// thread while another closes it.
pub struct TransportPort<C: StreamConnector> {
    connector: C,
    settings: PortSettings,
    shared: Arc<Shared>,
    /// Serialises open and close. Never taken on the write path.
    session: Mutex<Option<Session>>,
    writer: Mutex<Option<Box<dyn StreamWriter>>>,
}

impl<C: StreamConnector> TransportPort<C> {
    /// Create a disconnected port with default settings.
    pub fn new(connector: C) -> Self {
        Self::with_settings(connector, PortSettings::default())
    }

    /// Create a disconnected port.
    ///
    /// # Panics
    /// Panics if `settings.rx_capacity < 2` or `settings.chunk_size == 0`.
    /// Settings built from a validated [`Config`](crate::config::Config)
    /// always satisfy both.
    pub fn with_settings(connector: C, settings: PortSettings) -> Self {
        assert!(settings.chunk_size > 0, "chunk size must be non-zero");
        let ring = RxRingBuffer::new(settings.rx_capacity);
        Self {
            connector,
            settings,
            shared: Arc::new(Shared {
                rx: Mutex::new(RxState {
                    ring,
                    link_up: false,
                }),
                data_ready: Condvar::new(),
                running: AtomicBool::new(false),
                stats: StatsCounters::default(),
            }),
            session: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn settings(&self) -> &PortSettings {
        &self.settings
    }

    /// True while a stream is attached and its receive loop is alive.
    pub fn is_open(&self) -> bool {
        self.shared.rx.lock().link_up
    }

    /// Number of received bytes waiting to be read.
    pub fn available(&self) -> usize {
        self.shared.rx.lock().ring.len()
    }

    pub fn stats(&self) -> PortStats {
        self.shared.stats.snapshot()
    }

    fn start(&self, params: LinkParams) -> Result<(), TransportError> {
        let mut session = self.session.lock();
        if session.is_some() {
            if self.shared.rx.lock().link_up {
                return Err(TransportError::AlreadyOpen);
            }
            // The peer hung up or the stream failed; drop the dead link and reconnect.
            debug!(dongle = %self.connector.target(), "Replacing dead link");
            self.teardown(session.take());
        }

        let target = self.connector.target();
        if !params.is_empty() {
            debug!(dongle = %target, ?params, "Opening with link overrides");
        }
        let StreamPair {
            reader,
            writer,
            shutdown,
        } = self.connector.connect(&params, &self.settings)?;

        {
            let mut rx = self.shared.rx.lock();
            rx.ring.clear();
            rx.link_up = true;
        }
        self.shared.running.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let chunk_size = self.settings.chunk_size;
        let loop_target = target.clone();
        let spawned = thread::Builder::new()
            .name(format!("zigbee-rx {target}"))
            .spawn(move || receive_loop(shared, reader, chunk_size, loop_target));

        let reader_task = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared.mark_link_down();
                let _ = shutdown.shutdown();
                return Err(TransportError::Io(e));
            }
        };

        *self.writer.lock() = Some(writer);
        *session = Some(Session {
            shutdown,
            reader_task,
        });
        info!(dongle = %target, "Transport port opened");
        Ok(())
    }

    fn stop(&self) {
        let mut session = self.session.lock();
        let Some(current) = session.take() else {
            self.teardown(None);
            debug!(dongle = %self.connector.target(), "Close on a port that is not open");
            return;
        };
        self.teardown(Some(current));
        info!(dongle = %self.connector.target(), "Transport port closed");
    }

    /// Stop the receive loop and release the stream. Caller holds `session`.
    fn teardown(&self, session: Option<Session>) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.mark_link_down();

        let Some(Session {
            shutdown,
            reader_task,
        }) = session
        else {
            return;
        };

        // Shut down before touching the writer lock: this fails any write
        // blocked on a peer that stopped reading.
        if let Err(e) = shutdown.shutdown() {
            warn!(dongle = %self.connector.target(), "Error shutting down stream: {}", e);
        }
        if reader_task.join().is_err() {
            error!(dongle = %self.connector.target(), "Receive loop panicked");
        }
        drop(self.writer.lock().take());
    }

    fn send(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut guard = self.writer.lock();
        let writer = match guard.as_mut() {
            Some(writer) if self.shared.running.load(Ordering::Acquire) => writer,
            _ => {
                warn!(
                    dongle = %self.connector.target(),
                    len = data.len(),
                    "Write on closed port ignored"
                );
                return;
            }
        };
        match writer.write_all_flush(data) {
            Ok(()) => {
                self.shared
                    .stats
                    .bytes_written
                    .fetch_add(data.len() as u64, Ordering::Relaxed);
            }
            Err(e) => {
                self.shared.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!(dongle = %self.connector.target(), "Write failed: {}", e);
            }
        }
    }
}

impl<C: StreamConnector> ZigBeePort for TransportPort<C> {
    fn open_with(&self, params: LinkParams) -> Result<(), TransportError> {
        self.start(params)
    }

    fn close(&self) {
        self.stop();
    }

    fn write(&self, data: &[u8]) {
        self.send(data);
    }

    fn read(&self) -> Option<u8> {
        self.shared.pop_until(None)
    }

    fn read_timeout(&self, timeout: Duration) -> Option<u8> {
        // A timeout too large to represent behaves like no timeout at all.
        self.shared.pop_until(Instant::now().checked_add(timeout))
    }

    fn purge_rx_buffer(&self) {
        let discarded = {
            let mut rx = self.shared.rx.lock();
            let pending = rx.ring.len();
            rx.ring.clear();
            pending
        };
        if discarded > 0 {
            debug!(dongle = %self.connector.target(), discarded, "Receive buffer purged");
        }
    }
}

impl<C: StreamConnector> Drop for TransportPort<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<C: StreamConnector> std::fmt::Debug for TransportPort<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportPort")
            .field("target", &self.connector.target())
            .field("open", &self.is_open())
            .field("available", &self.available())
            .finish()
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn receive_loop(
    shared: Arc<Shared>,
    mut reader: Box<dyn StreamReader>,
    chunk_size: usize,
    target: String,
) {
    debug!(dongle = %target, "Receive loop started");
    let mut chunk = vec![0u8; chunk_size];

    while shared.running.load(Ordering::Acquire) {
        match reader.read_chunk(&mut chunk) {
            Ok(0) => {
                if shared.running.load(Ordering::Acquire) {
                    warn!(dongle = %target, "Stream closed by peer");
                }
                break;
            }
            Ok(n) => {
                let evicted = shared.ingest(&chunk[..n]);
                if evicted > 0 {
                    warn!(dongle = %target, evicted, "Receive buffer overrun, oldest bytes dropped");
                }
            }
            Err(e) if is_transient(&e) => continue,
            Err(e) => {
                if shared.running.load(Ordering::Acquire) {
                    warn!(dongle = %target, "Stream read failed: {}", e);
                }
                break;
            }
        }
    }

    shared.mark_link_down();
    debug!(dongle = %target, "Receive loop finished");
}
