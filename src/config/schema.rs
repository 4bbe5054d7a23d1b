//! Configuration schema definitions.
//!
//! All sections use `#[serde(default)]`, so a file only needs the keys it
//! changes.

use crate::port::{FlowControl, PortSettings, TargetDefaults};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Receive buffer and stream timing
    pub transport: TransportConfig,
    /// Serial dongle defaults
    pub serial: SerialConfig,
    /// Network dongle defaults
    pub network: NetworkConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the transport cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let transport = &self.transport;
        let minimums: [(&'static str, u64, u64); 5] = [
            ("transport.rx_buffer_capacity", transport.rx_buffer_capacity as u64, 2),
            ("transport.chunk_size", transport.chunk_size as u64, 1),
            ("transport.poll_interval_ms", transport.poll_interval_ms, 1),
            ("transport.connect_timeout_ms", transport.connect_timeout_ms, 1),
            ("serial.default_baud", u64::from(self.serial.default_baud), 1),
        ];
        for (key, value, min) in minimums {
            if value < min {
                return Err(ConfigError::below_minimum(key, value, min));
            }
        }

        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::InvalidLogLevel {
                level: self.logging.level.clone(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    /// Port tunables derived from the `[transport]` section.
    pub fn port_settings(&self) -> PortSettings {
        self.transport.port_settings()
    }

    /// Defaults applied when parsing target strings.
    pub fn target_defaults(&self) -> TargetDefaults {
        TargetDefaults {
            baud_rate: self.serial.default_baud,
            flow_control: self.serial.flow_control,
            tcp_port: self.network.default_port,
        }
    }
}

/// Transport configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Receive ring capacity in bytes
    pub rx_buffer_capacity: usize,
    /// Bytes requested per read from the stream
    pub chunk_size: usize,
    /// Network connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Stream read timeout in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        let settings = PortSettings::default();
        Self {
            rx_buffer_capacity: settings.rx_capacity,
            chunk_size: settings.chunk_size,
            connect_timeout_ms: settings.connect_timeout.as_millis() as u64,
            poll_interval_ms: settings.poll_interval.as_millis() as u64,
        }
    }
}

impl TransportConfig {
    pub fn port_settings(&self) -> PortSettings {
        PortSettings {
            rx_capacity: self.rx_buffer_capacity,
            chunk_size: self.chunk_size,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Serial dongle configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate when a target does not name one
    pub default_baud: u32,
    /// Flow control when a target does not name one
    pub flow_control: FlowControl,
    /// Short names for device paths
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_baud: crate::port::DEFAULT_BAUD_RATE,
            flow_control: FlowControl::None,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Resolve a target through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Network dongle configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP port when a target names only a host
    pub default_port: Option<u16>,
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport.rx_buffer_capacity, 512);
        assert_eq!(config.transport.chunk_size, 1024);
        assert_eq!(config.serial.default_baud, 115200);
        assert_eq!(config.network.default_port, None);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_settings_from_config() {
        let mut config = Config::default();
        config.transport.rx_buffer_capacity = 2048;
        config.transport.poll_interval_ms = 25;

        let settings = config.port_settings();
        assert_eq!(settings.rx_capacity, 2048);
        assert_eq!(settings.poll_interval, Duration::from_millis(25));
        assert_eq!(settings.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validation_rejects_degenerate_values() {
        let mut config = Config::default();
        config.transport.rx_buffer_capacity = 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BelowMinimum {
                key: "transport.rx_buffer_capacity",
                value: 1,
                min: 2
            }
        ));

        let mut config = Config::default();
        config.transport.chunk_size = 0;
        assert_eq!(config.validate().unwrap_err().key(), Some("transport.chunk_size"));

        let mut config = Config::default();
        config.transport.poll_interval_ms = 0;
        assert_eq!(config.validate().unwrap_err().key(), Some("transport.poll_interval_ms"));

        let mut config = Config::default();
        config.serial.default_baud = 0;
        assert_eq!(config.validate().unwrap_err().key(), Some("serial.default_baud"));
    }

    #[test]
    fn test_validation_checks_log_filter() {
        let mut config = Config::default();
        config.logging.level = "zigbee_port=debug,warn".to_string();
        assert!(config.validate().is_ok());

        config.logging.level = "zigbee_port=loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel { .. }));
        assert_eq!(err.key(), Some("logging.level"));
    }

    #[test]
    fn test_port_alias_resolution() {
        let mut config = SerialConfig::default();
        config
            .port_aliases
            .insert("coordinator".to_string(), "/dev/ttyACM0".to_string());

        assert_eq!(config.resolve_port("coordinator"), "/dev/ttyACM0");
        assert_eq!(config.resolve_port("/dev/ttyUSB0"), "/dev/ttyUSB0");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[transport]"));
        assert!(toml_str.contains("[serial]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [transport]
            rx_buffer_capacity = 4096

            [serial]
            default_baud = 57600
            flow_control = "hardware"

            [network]
            default_port = 6638
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.transport.rx_buffer_capacity, 4096);
        assert_eq!(config.serial.flow_control, FlowControl::Hardware);
        assert_eq!(config.target_defaults().tcp_port, Some(6638));
        assert_eq!(config.target_defaults().baud_rate, 57600);
        // Defaults should still work
        assert_eq!(config.transport.chunk_size, 1024);
        assert_eq!(config.logging.level, "info");
    }
}
