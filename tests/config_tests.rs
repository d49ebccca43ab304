//! Tests for configuration loading

use beatbridge::config::{Config, MAX_UDP_PAYLOAD};
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_defaults_match_deployment() {
    let config = Config::default();
    assert_eq!(config.server.listen_addr.port(), 8088);
    assert_eq!(config.backend.host, "127.0.0.1");
    assert_eq!(config.backend.port, 12345);
    assert_eq!(config.backend.max_datagram_size, MAX_UDP_PAYLOAD);
    assert_eq!(config.pacing.short_delay(), Duration::from_millis(50));
    assert_eq!(config.pacing.long_delay(), Duration::from_secs(1));
    assert_eq!(config.pacing.poll_command, "get_status");
    assert!(config.pacing.poll_on_connect);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.backend.port, 12345);
}

#[test]
fn test_partial_file_keeps_other_defaults() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[backend]
host = "beaglebone.local"
port = 9000

[pacing]
short_delay_ms = 75
"#,
    )?;

    let config = Config::load_from(&path)?;
    assert_eq!(config.backend.host, "beaglebone.local");
    assert_eq!(config.backend.port, 9000);
    assert_eq!(config.pacing.short_delay_ms, 75);
    assert_eq!(config.pacing.long_delay_ms, 1000);
    assert_eq!(config.server.listen_addr.port(), 8088);
    assert_eq!(config.server.client_buffer, 256);

    Ok(())
}

#[test]
fn test_invalid_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nlisten_addr = \"not an address\"\n").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Invalid config"));
}

#[test]
fn test_config_path_is_namespaced() {
    let path = Config::config_path();
    assert!(path.ends_with("beatbridge/config.toml"));
}

#[test]
fn test_command_line_overrides_file_values() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
listen_addr = "127.0.0.1:9090"

[backend]
host = "beaglebone.local"
port = 9000
"#,
    )?;

    let mut config = Config::load_from(&path)?;
    config.apply_overrides(None, None, Some(7000));

    assert_eq!(config.backend.port, 7000);
    assert_eq!(config.backend.host, "beaglebone.local");
    assert_eq!(config.server.listen_addr, "127.0.0.1:9090".parse::<SocketAddr>()?);

    config.apply_overrides(
        Some("0.0.0.0:8000".parse()?),
        Some("10.0.0.2".to_string()),
        None,
    );
    assert_eq!(config.server.listen_addr.port(), 8000);
    assert_eq!(config.backend.host, "10.0.0.2");
    assert_eq!(config.backend.port, 7000);

    Ok(())
}
