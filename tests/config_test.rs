//! Configuration layering tests
//!
//! Defaults < file < environment < command line.

use std::env;
use std::io::Write;
use std::time::Duration;

use serial_test::serial;
use sniff_mux::config::{load_config, ConfigError, ConfigOverrides, ConfigValidator, MuxConfig};
use tempfile::NamedTempFile;

const ENV_VARS: &[&str] = &[
    "SNIFF_MUX_LISTEN",
    "SNIFF_MUX_PLAINTEXT_BACKEND",
    "SNIFF_MUX_TLS_BACKEND",
    "SNIFF_MUX_CLASSIFY_TIMEOUT_MS",
    "SNIFF_MUX_BUFFER_SIZE",
    "SNIFF_MUX_BACKLOG",
    "SNIFF_MUX_SHUTDOWN_TIMEOUT",
];

fn clear_env() {
    for name in ENV_VARS {
        env::remove_var(name);
    }
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
#[serial]
fn test_defaults_without_sources() {
    clear_env();

    let file = config_file("{}");
    let config = load_config(Some(file.path()), &ConfigOverrides::default()).unwrap();

    assert_eq!(config, MuxConfig::default());
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    clear_env();

    let file = config_file(r#"{
        "listen": "127.0.0.1:9080",
        "tls_backend": "127.0.0.1:9443",
        "classify_timeout_ms": 250
    }"#);
    let config = load_config(Some(file.path()), &ConfigOverrides::default()).unwrap();

    assert_eq!(config.listen.port(), 9080);
    assert_eq!(config.tls_backend.port(), 9443);
    assert_eq!(config.classify_timeout_ms, 250);
    assert_eq!(config.plaintext_backend.port(), 8081);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    env::set_var("SNIFF_MUX_TLS_BACKEND", "127.0.0.1:7443");
    env::set_var("SNIFF_MUX_BUFFER_SIZE", "4096");

    let file = config_file(r#"{ "tls_backend": "127.0.0.1:9443", "buffer_size": 1024 }"#);
    let result = load_config(Some(file.path()), &ConfigOverrides::default());
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.tls_backend.port(), 7443);
    assert_eq!(config.buffer_size, 4096);
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var("SNIFF_MUX_PLAINTEXT_BACKEND", "127.0.0.1:7080");

    let overrides = ConfigOverrides {
        plaintext_backend: Some("127.0.0.1:6080".to_string()),
        classify_timeout_ms: Some(1500),
        ..Default::default()
    };
    let file = config_file("{}");
    let result = load_config(Some(file.path()), &overrides);
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.plaintext_backend.port(), 6080);
    assert_eq!(config.classify_timeout_ms, 1500);
}

#[test]
#[serial]
fn test_cli_overrides_backlog_and_shutdown_timeout() {
    clear_env();
    env::set_var("SNIFF_MUX_BACKLOG", "64");
    env::set_var("SNIFF_MUX_SHUTDOWN_TIMEOUT", "10");

    let overrides = ConfigOverrides {
        backlog: Some(16),
        shutdown_timeout: Some(2),
        ..Default::default()
    };
    let file = config_file(r#"{ "backlog": 256 }"#);
    let result = load_config(Some(file.path()), &overrides);
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.backlog, 16);
    assert_eq!(config.shutdown_timeout(), Duration::from_secs(2));
}

#[test]
#[serial]
fn test_malformed_file() {
    clear_env();

    let file = config_file(r#"{ "listen": "#);
    let result = load_config(Some(file.path()), &ConfigOverrides::default());

    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
#[serial]
fn test_self_routing_is_invalid() {
    clear_env();

    let file = config_file(r#"{ "listen": "127.0.0.1:8081", "plaintext_backend": "127.0.0.1:8081" }"#);
    let config = load_config(Some(file.path()), &ConfigOverrides::default()).unwrap();

    assert!(matches!(config.validate(), Err(ConfigError::InvalidCombination(_))));
}
