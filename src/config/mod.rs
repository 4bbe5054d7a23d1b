//! Configuration module for zigbee-port.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `ZIGBEE_PORT_CONFIG` environment variable (explicit path)
//! 2. `./zigbee-port.toml` (current directory)
//! 3. `~/.config/zigbee-port/config.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\zigbee-port\config.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `ZIGBEE_PORT_<SECTION>_<KEY>`
//!
//! Examples:
//! - `ZIGBEE_PORT_TRANSPORT_RX_BUFFER_CAPACITY=1024`
//! - `ZIGBEE_PORT_SERIAL_DEFAULT_BAUD=57600`
//! - `ZIGBEE_PORT_LOGGING_FORMAT=json`
//!
//! # Example
//!
//! ```rust,ignore
//! use zigbee_port::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Receive buffer: {} bytes", config.transport.rx_buffer_capacity);
//! println!("Default baud: {}", config.serial.default_baud);
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{
    Config, LogFormat, LoggingConfig, NetworkConfig, SerialConfig, TransportConfig,
};
