use dirwatch_core::config::{Config, MonitorConfig, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
use dirwatch_core::Filter;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn test_monitor_config_defaults() {
    let config = MonitorConfig::default();
    assert_eq!(config.buffer_size, 16 * 1024);
    assert_eq!(config.default_filters, vec![Filter::All]);
    assert!(config.teardown_watches);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_buffer_size() {
    let mut config = Config::default();

    config.monitor.buffer_size = MIN_BUFFER_SIZE;
    assert!(config.validate().is_ok());

    config.monitor.buffer_size = MAX_BUFFER_SIZE;
    assert!(config.validate().is_ok());

    config.monitor.buffer_size = MIN_BUFFER_SIZE - 1;
    let result = config.validate();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Invalid buffer size"));

    config.monitor.buffer_size = MAX_BUFFER_SIZE + 1;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_empty_filters() {
    let mut config = Config::default();
    config.monitor.default_filters.clear();

    let result = config.validate();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("default_filters must not be empty"));
}

#[test]
fn test_config_from_toml_str() {
    let config = Config::from_toml_str(
        r#"
        [monitor]
        buffer_size = 4096
        default_filters = ["create", "delete", "moved"]
        "#,
    )
    .unwrap();

    assert_eq!(config.monitor.buffer_size, 4096);
    assert_eq!(
        config.monitor.default_filters,
        vec![Filter::Create, Filter::Delete, Filter::Moved]
    );
    // Unspecified fields fall back to defaults
    assert!(config.monitor.teardown_watches);
}

#[test]
fn test_config_from_toml_str_missing_section() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config.monitor, MonitorConfig::default());
}

#[test]
fn test_config_rejects_unknown_filter() {
    let result = Config::from_toml_str(
        r#"
        [monitor]
        default_filters = ["create", "teleport"]
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_config_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dirwatch.toml");

    let mut config = Config::default();
    config.monitor.buffer_size = 8192;
    config.monitor.default_filters = vec![Filter::CloseWrite, Filter::Moved];
    config.monitor.teardown_watches = false;
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.monitor, config.monitor);
}

#[test]
fn test_config_from_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let loaded = Config::from_file(&temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(loaded.monitor.default_filters, vec![Filter::All]);
}

#[test]
fn test_config_from_file_rejects_invalid_buffer_size() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dirwatch.toml");
    std::fs::write(&path, "[monitor]\nbuffer_size = 64\n").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, dirwatch_core::Error::Config(_)));
    assert!(err.to_string().contains("Invalid buffer size 64"), "{err}");
}

#[test]
fn test_monitor_config_builder() {
    let config = MonitorConfig::builder()
        .buffer_size(65536)
        .default_filters(vec![Filter::Create, Filter::Moved])
        .teardown_watches(false)
        .build()
        .unwrap();

    assert_eq!(config.buffer_size, 65536);
    assert_eq!(config.default_filters, vec![Filter::Create, Filter::Moved]);
    assert!(!config.teardown_watches);
}

#[test]
fn test_monitor_config_builder_validates() {
    let result = MonitorConfig::builder().buffer_size(16).build();
    assert!(result.is_err());
}
