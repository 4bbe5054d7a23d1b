//! Serial stream connector for USB/UART dongles.
//!
//! Wraps the `serialport` crate. The port is opened with the poll interval as
//! its read timeout, so the receive loop wakes up regularly even though a
//! serial handle offers no reliable way to interrupt a pending read from
//! another thread.

use super::error::TransportError;
use super::traits::{
    FlowControl, LinkParams, PortSettings, StreamConnector, StreamPair, StreamReader, StreamShutdown,
    StreamWriter,
};
use std::io::{self, Read, Write};
use tracing::debug;

/// Default baud rate for ZigBee coordinator dongles.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Opens a serial device as a duplex byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConnector {
    path: String,
    baud_rate: u32,
    flow_control: FlowControl,
}

impl SerialConnector {
    /// # Example
    /// ```no_run
    /// use zigbee_port::port::{FlowControl, SerialConnector, TransportPort, ZigBeePort};
    ///
    /// let connector = SerialConnector::new("/dev/ttyUSB0", 115200, FlowControl::Hardware);
    /// let port = TransportPort::new(connector);
    /// port.open()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(path: impl Into<String>, baud_rate: u32, flow_control: FlowControl) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            flow_control,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn flow_control(&self) -> FlowControl {
        self.flow_control
    }
}

impl StreamConnector for SerialConnector {
    fn connect(
        &self,
        params: &LinkParams,
        settings: &PortSettings,
    ) -> Result<StreamPair, TransportError> {
        let baud_rate = params.baud_rate.unwrap_or(self.baud_rate);
        let flow_control = params.flow_control.unwrap_or(self.flow_control);
        debug!(path = %self.path, baud_rate, %flow_control, "Opening serial device");

        let port = serialport::new(&self.path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(flow_control.into())
            .timeout(settings.poll_interval)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::not_found(&self.path),
                serialport::ErrorKind::InvalidInput => {
                    TransportError::invalid_target(&self.path, e.to_string())
                }
                _ => TransportError::Serial(e),
            })?;

        // Stale bytes from a previous session would desynchronise the stack's framer.
        if let Err(e) = port.clear(serialport::ClearBuffer::Input) {
            debug!(path = %self.path, "Could not clear input buffer: {}", e);
        }

        let reader = port.try_clone()?;
        Ok(StreamPair {
            reader: Box::new(SerialReader { port: reader }),
            writer: Box::new(SerialWriter { port }),
            shutdown: Box::new(SerialShutdown),
        })
    }

    fn target(&self) -> String {
        format!("serial://{}@{}", self.path, self.baud_rate)
    }
}

struct SerialReader {
    port: Box<dyn serialport::SerialPort>,
}

impl StreamReader for SerialReader {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

struct SerialWriter {
    port: Box<dyn serialport::SerialPort>,
}

impl StreamWriter for SerialWriter {
    fn write_all_flush(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }
}

/// Serial handles have no cross-handle shutdown. Reads and writes both carry
/// the poll timeout, so pending calls end on their own and the handles close
/// on drop.
struct SerialShutdown;

impl StreamShutdown for SerialShutdown {
    fn shutdown(&self) -> io::Result<()> {
        Ok(())
    }
}
