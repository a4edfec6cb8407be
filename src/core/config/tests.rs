use super::data::{path_display, Config, DEFAULT_BASE_URL};
use super::io::ConfigError;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config
        .set_value("base-url", "http://chat.internal:8080")
        .expect("set base-url");
    config
        .set_value("heartbeat-interval", "15")
        .expect("set heartbeat");
    config.save_to_path(&config_path).expect("save");

    let mut loaded = Config::load_from_path(&config_path).expect("load");
    assert_eq!(loaded.base_url.as_deref(), Some("http://chat.internal:8080"));
    assert_eq!(loaded.heartbeat_interval(), Duration::from_secs(15));

    loaded.unset_value("heartbeat-interval").expect("unset");
    loaded.save_to_path(&config_path).expect("save again");
    let reloaded = Config::load_from_path(&config_path).expect("reload");
    assert_eq!(reloaded.heartbeat_interval_secs, None);
    assert_eq!(reloaded.heartbeat_interval(), Duration::from_secs(60));
}

#[test]
fn test_invalid_toml_reports_parse_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "base_url = [").expect("write");

    let err = Config::load_from_path(&config_path).expect_err("parse should fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at"));
}

#[test]
fn test_save_into_missing_directory_reports_write_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let blocker = temp_dir.path().join("not_a_dir");
    std::fs::write(&blocker, "").expect("write");

    let err = Config::default()
        .save_to_path(&blocker.join("config.toml"))
        .expect_err("parent is a file");
    assert!(matches!(err, ConfigError::Write { .. }));
}

#[test]
fn test_exchange_config_defaults_and_overrides() {
    let defaults = Config::default().exchange_config();
    assert_eq!(defaults.heartbeat_interval, Duration::from_secs(60));
    assert_eq!(defaults.session_name_limit, 50);

    let config = Config {
        heartbeat_interval_secs: Some(5),
        session_name_limit: Some(20),
        ..Default::default()
    };
    let resolved = config.exchange_config();
    assert_eq!(resolved.heartbeat_interval, Duration::from_secs(5));
    assert_eq!(resolved.session_name_limit, 20);

    let zeroes = Config {
        heartbeat_interval_secs: Some(0),
        session_name_limit: Some(0),
        ..Default::default()
    };
    assert_eq!(zeroes.exchange_config(), defaults);
}

#[test]
fn test_set_value_rejects_bad_input() {
    let mut config = Config::default();
    assert!(config.set_value("heartbeat-interval", "soon").is_err());
    assert!(config.set_value("session-name-limit", "0").is_err());
    assert!(config.set_value("base-url", "  ").is_err());
    assert!(config.set_value("theme", "dark").is_err());
    assert!(config.unset_value("theme").is_err());
    assert_eq!(config, Config::default());
}

#[test]
fn test_override_url_wins() {
    let config = Config {
        base_url: Some("http://configured".into()),
        ..Default::default()
    };
    assert_eq!(
        config.resolve_base_url(Some("http://flag")),
        "http://flag"
    );
    assert_ne!(DEFAULT_BASE_URL, "http://flag");
}

#[test]
fn test_path_display_keeps_non_home_paths() {
    assert_eq!(path_display("/etc/chatstream.toml"), "/etc/chatstream.toml");
}
