//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "ZIGBEE_PORT";

/// Config file name in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "zigbee-port.toml";

/// Config file name inside the per-user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory under the platform config directory
const APP_DIR_NAME: &str = "zigbee-port";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "ZIGBEE_PORT_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `ZIGBEE_PORT_CONFIG` environment variable (explicit path)
    /// 2. `./zigbee-port.toml` (current directory)
    /// 3. `~/.config/zigbee-port/config.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\zigbee-port\config.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    ///
    /// Environment overrides that fail to parse or validate are ignored.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        let mut candidate = config.clone();
        if apply_env_overrides(&mut candidate).is_ok() && candidate.validate().is_ok() {
            config = candidate;
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read `ZIGBEE_PORT_<suffix>` and parse it, if set.
fn env_value<T: FromStr>(suffix: &str, expected: &'static str) -> ConfigResult<Option<T>> {
    let var = format!("{}_{}", ENV_PREFIX, suffix);
    match std::env::var(&var) {
        Ok(val) => match val.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::env_override(var, val, expected)),
        },
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `ZIGBEE_PORT_<SECTION>_<KEY>`
/// For example:
/// - `ZIGBEE_PORT_TRANSPORT_RX_BUFFER_CAPACITY=1024`
/// - `ZIGBEE_PORT_SERIAL_DEFAULT_BAUD=57600`
/// - `ZIGBEE_PORT_NETWORK_DEFAULT_PORT=6638`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Transport overrides
    if let Some(val) = env_value("TRANSPORT_RX_BUFFER_CAPACITY", "buffer capacity")? {
        config.transport.rx_buffer_capacity = val;
    }
    if let Some(val) = env_value("TRANSPORT_CHUNK_SIZE", "chunk size")? {
        config.transport.chunk_size = val;
    }
    if let Some(val) = env_value("TRANSPORT_CONNECT_TIMEOUT_MS", "timeout")? {
        config.transport.connect_timeout_ms = val;
    }
    if let Some(val) = env_value("TRANSPORT_POLL_INTERVAL_MS", "interval")? {
        config.transport.poll_interval_ms = val;
    }

    // Serial overrides
    if let Some(val) = env_value("SERIAL_DEFAULT_BAUD", "baud rate")? {
        config.serial.default_baud = val;
    }
    if let Some(val) = env_value("SERIAL_FLOW_CONTROL", "flow control mode")? {
        config.serial.flow_control = val;
    }

    // Network overrides
    if let Some(val) = env_value::<u16>("NETWORK_DEFAULT_PORT", "port number")? {
        config.network.default_port = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var(format!("{}_LOGGING_LEVEL", ENV_PREFIX)) {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var(format!("{}_LOGGING_FORMAT", ENV_PREFIX)) {
        config.logging.format = match val.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => {
                return Err(ConfigError::env_override(
                    format!("{}_LOGGING_FORMAT", ENV_PREFIX),
                    val,
                    "log format (json, pretty, compact)",
                ))
            }
        };
    }

    Ok(())
}
