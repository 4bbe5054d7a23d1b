use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use zigbee_port::config::{Config, ConfigLoader, LogFormat, LoggingConfig};
use zigbee_port::port::{DongleConnector, PortTarget, TransportPort, ZigBeePort};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Raw byte-stream access to ZigBee coordinator dongles.",
    long_about = "Opens a serial or network-attached ZigBee dongle through the same buffered transport port a protocol stack would use, and lets an operator watch or poke the raw byte stream."
)]
struct Args {
    /// Configuration file (overrides the standard search locations).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports present on this machine.
    List,

    /// Print every byte received from a dongle as hex.
    Monitor {
        /// Target: tcp://host:port, serial:///dev/ttyUSB0@115200, or an alias.
        target: String,

        /// Stop after this many milliseconds (runs until the link drops if unset).
        #[arg(long)]
        duration_ms: Option<u64>,
    },

    /// Send a hex payload, then print whatever comes back.
    Send {
        /// Target: tcp://host:port, serial:///dev/ttyUSB0@115200, or an alias.
        target: String,

        /// Payload as hex, e.g. "1AC038BC7E" or "1a c0 38 bc 7e".
        payload: String,

        /// How long to collect the response.
        #[arg(long, default_value_t = 1000)]
        wait_ms: u64,
    },
}

const BYTES_PER_LINE: usize = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?.into_config(),
        None => ConfigLoader::load()?.into_config(),
    };
    init_logging(&config.logging);

    match args.command {
        Command::List => list_ports(),
        Command::Monitor {
            target,
            duration_ms,
        } => {
            let port = open_port(&config, &target)?;
            let deadline = duration_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
            dump_until(&port, deadline)?;
            port.close();
            info!(stats = ?port.stats(), "Monitor finished");
            Ok(())
        }
        Command::Send {
            target,
            payload,
            wait_ms,
        } => {
            let bytes = parse_hex(&payload)?;
            let port = open_port(&config, &target)?;
            port.write(&bytes);
            debug!(len = bytes.len(), "Payload sent");
            dump_until(&port, Some(Instant::now() + Duration::from_millis(wait_ms)))?;
            port.close();
            Ok(())
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr; stdout carries data.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

fn list_ports() -> Result<(), Box<dyn std::error::Error>> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        let kind = match port.port_type {
            serialport::SerialPortType::UsbPort(info) => format!(
                "USB {:04x}:{:04x} {}",
                info.vid,
                info.pid,
                info.product.unwrap_or_default()
            ),
            serialport::SerialPortType::PciPort => "PCI".to_string(),
            serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            serialport::SerialPortType::Unknown => "Unknown".to_string(),
        };
        println!("{:<24} {}", port.port_name, kind);
    }
    Ok(())
}

fn open_port(
    config: &Config,
    target: &str,
) -> Result<TransportPort<DongleConnector>, Box<dyn std::error::Error>> {
    let resolved = config.serial.resolve_port(target);
    let target = PortTarget::parse(&resolved, &config.target_defaults())?;
    let port = TransportPort::with_settings(target.connector(), config.port_settings());
    port.open()?;
    Ok(port)
}

/// Print received bytes as hex lines until `deadline` or until the link drops.
fn dump_until(
    port: &TransportPort<DongleConnector>,
    deadline: Option<Instant>,
) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut line = Vec::with_capacity(BYTES_PER_LINE);

    loop {
        let wait = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                remaining.min(Duration::from_millis(250))
            }
            None => Duration::from_millis(250),
        };

        match port.read_timeout(wait) {
            Some(byte) => {
                line.push(byte);
                if line.len() == BYTES_PER_LINE {
                    writeln!(out, "{}", format_hex(&line))?;
                    line.clear();
                }
            }
            None => {
                if !line.is_empty() {
                    writeln!(out, "{}", format_hex(&line))?;
                    line.clear();
                }
                if !port.is_open() {
                    info!("Link closed");
                    break;
                }
            }
        }
    }

    if !line.is_empty() {
        writeln!(out, "{}", format_hex(&line))?;
    }
    out.flush()
}

fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("'{input}' contains non-hex characters"));
    }
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(format!("'{input}' is not an even number of hex digits"));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}
