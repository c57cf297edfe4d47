use tempfile::TempDir;
use upnpconfig::Config;

#[test]
fn test_load_creates_config_file_with_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

    assert!(dir.path().join("config.yaml").exists());
    assert_eq!(config.get_http_port(), 8080);
    assert_eq!(config.get_log_min_level().unwrap(), "INFO");
    assert!(config.get_log_enable_console().unwrap());
}

#[test]
fn test_values_persist_across_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap();

    let config = Config::load_config(path).unwrap();
    config.set_http_port(9321).unwrap();
    let udn = config.get_device_udn("basic", "kitchen").unwrap();

    let reloaded = Config::load_config(path).unwrap();
    assert_eq!(reloaded.get_http_port(), 9321);
    assert_eq!(reloaded.get_device_udn("basic", "kitchen").unwrap(), udn);
}

#[test]
fn test_udn_prefix_is_stripped() {
    let config = Config::from_yaml_str("devices: {basic: {lamp: {udn: 'uuid:1234'}}}").unwrap();
    assert_eq!(config.get_device_udn("basic", "lamp").unwrap(), "1234");
}

#[test]
fn test_in_memory_config_has_no_directory() {
    let config = Config::from_yaml_str("host: {base_url: 'http://10.0.0.2:8080/'}").unwrap();
    assert!(config.directory().is_none());
    assert_eq!(config.get_base_url(), "http://10.0.0.2:8080");
    config.save().unwrap();
}

#[test]
fn test_numeric_values_accept_strings() {
    let config = Config::from_yaml_str("tuning: {a: 12, b: ' 40 ', c: -3, d: abc}").unwrap();
    assert_eq!(config.get_u64_or(&["tuning", "a"], 7), 12);
    assert_eq!(config.get_u64_or(&["tuning", "b"], 7), 40);
    assert_eq!(config.get_u64_or(&["tuning", "c"], 7), 7);
    assert_eq!(config.get_u64_or(&["tuning", "d"], 7), 7);
    assert_eq!(config.get_u64_or(&["tuning", "missing"], 7), 7);
}
