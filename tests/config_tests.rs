//! Configuration file loading and its effect on ports and targets.

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;
use zigbee_port::config::{ConfigError, ConfigLoader, LogFormat};
use zigbee_port::port::{FlowControl, MockConnector, PortTarget, TransportPort, ZigBeePort};

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("zigbee-port.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
            [transport]
            rx_buffer_capacity = 64
            poll_interval_ms = 20

            [serial]
            default_baud = 57600
            flow_control = "hardware"

            [serial.port_aliases]
            coordinator = "/dev/ttyACM0"

            [logging]
            level = "debug"
            format = "json"
        "#,
    );

    let loader = ConfigLoader::load_from(&path).unwrap();
    let config = loader.config();
    assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
    assert_eq!(config.transport.rx_buffer_capacity, 64);
    assert_eq!(config.port_settings().poll_interval, Duration::from_millis(20));
    assert_eq!(config.logging.format, LogFormat::Json);

    let resolved = config.serial.resolve_port("coordinator");
    let target = PortTarget::parse(&resolved, &config.target_defaults()).unwrap();
    assert_eq!(
        target,
        PortTarget::Serial {
            path: "/dev/ttyACM0".to_string(),
            baud_rate: 57600,
            flow_control: FlowControl::Hardware,
        }
    );
}

#[test]
#[serial]
fn test_configured_capacity_bounds_port_buffer() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[transport]\nrx_buffer_capacity = 8\npoll_interval_ms = 10\n");
    let config = ConfigLoader::load_from(&path).unwrap().into_config();

    let dongle = MockConnector::new("MOCK0");
    let port = TransportPort::with_settings(dongle.clone(), config.port_settings());
    port.open().unwrap();
    dongle.enqueue_read(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while port.stats().bytes_received < 10 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(port.available(), 7);
    port.close();
}

#[test]
#[serial]
fn test_invalid_file_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[transport]\nrx_buffer_capacity = 1\n");

    let err = ConfigLoader::load_from(&path).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::BelowMinimum {
            key: "transport.rx_buffer_capacity",
            value: 1,
            min: 2
        }
    ));
}

#[test]
#[serial]
fn test_malformed_toml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[transport\nrx_buffer_capacity = ");

    let err = ConfigLoader::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
#[serial]
fn test_missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let err = ConfigLoader::load_from(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[network]\ndefault_port = 6638\n");

    std::env::set_var("ZIGBEE_PORT_NETWORK_DEFAULT_PORT", "9999");
    let config = ConfigLoader::load_from(&path).map(|l| l.into_config());
    std::env::remove_var("ZIGBEE_PORT_NETWORK_DEFAULT_PORT");

    assert_eq!(config.unwrap().network.default_port, Some(9999));
}

#[test]
#[serial]
fn test_explicit_config_path_env() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[serial]\ndefault_baud = 38400\n");

    std::env::set_var("ZIGBEE_PORT_CONFIG", &path);
    let loaded = ConfigLoader::load();
    std::env::remove_var("ZIGBEE_PORT_CONFIG");

    let loader = loaded.unwrap();
    assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
    assert_eq!(loader.config().serial.default_baud, 38400);
}

#[test]
#[serial]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut loader = ConfigLoader::with_defaults();
    loader.config.transport.chunk_size = 256;
    loader.config.serial.flow_control = FlowControl::Software;
    loader.save_to(&path).unwrap();

    let reloaded = ConfigLoader::load_from(&path).unwrap();
    assert_eq!(reloaded.config().transport.chunk_size, 256);
    assert_eq!(reloaded.config().serial.flow_control, FlowControl::Software);
}

#[test]
#[serial]
fn test_bad_log_filter_in_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[logging]\nlevel = \"zigbee_port=chatty\"\n");

    let err = ConfigLoader::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLogLevel { ref level, .. } if level == "zigbee_port=chatty"));
}

#[test]
#[serial]
fn test_unparsable_env_override_names_value() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    std::env::set_var("ZIGBEE_PORT_SERIAL_DEFAULT_BAUD", "fast");
    let result = ConfigLoader::load_from(&path);
    std::env::remove_var("ZIGBEE_PORT_SERIAL_DEFAULT_BAUD");

    match result.unwrap_err() {
        ConfigError::EnvOverride { var, value, expected } => {
            assert_eq!(var, "ZIGBEE_PORT_SERIAL_DEFAULT_BAUD");
            assert_eq!(value, "fast");
            assert_eq!(expected, "baud rate");
        }
        other => panic!("unexpected error: {other}"),
    }
}
