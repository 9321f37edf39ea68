use kopia_exporter::config::Config;
use secrecy::ExposeSecret;
use std::io::Write;

fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_load_without_file_uses_defaults() {
    let config = Config::load(None).expect("Failed to load defaults");
    assert_eq!(config.job, "kopia");
    assert_eq!(config.server.port, 8123);
}

#[test]
fn test_config_load_from_yaml() {
    // Given: A YAML file with push and kopia settings
    let file = yaml_file(
        r#"
pushgateway: http://pushgateway.local:9091
job: nightly
pushgateway_username: prom
pushgateway_password: s3cret
group_by_source: true
kopia:
  config_file: /etc/kopia/repository.config
  timeout_seconds: 120
server:
  port: 9999
  refresh_interval_seconds: 30
"#,
    );

    // When: Loading it
    let config = Config::load(file.path().to_str()).expect("Failed to load config");

    // Then: File values override defaults and the rest keep their defaults
    assert_eq!(config.pushgateway, "http://pushgateway.local:9091");
    assert_eq!(config.job, "nightly");
    assert_eq!(config.pushgateway_username.as_deref(), Some("prom"));
    assert_eq!(
        config
            .pushgateway_password
            .as_ref()
            .map(|p| p.expose_secret().to_string()),
        Some("s3cret".to_string())
    );
    assert!(config.group_by_source);
    assert_eq!(
        config.kopia.config_file.as_deref(),
        Some("/etc/kopia/repository.config")
    );
    assert_eq!(config.kopia.timeout_seconds, 120);
    assert_eq!(config.kopia.binary, "kopia");
    assert_eq!(config.server.port, 9999);
    assert_eq!(config.server.addr, "0.0.0.0");
    assert_eq!(config.server.refresh_interval_seconds, 30);
    assert!(config.validate().is_ok());
}

#[test]
fn test_password_is_redacted_in_debug_output() {
    let file = yaml_file("pushgateway_password: s3cret\n");

    let config = Config::load(file.path().to_str()).unwrap();

    assert!(!format!("{:?}", config).contains("s3cret"));
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");

    let result = Config::load(missing.to_str());

    assert!(result.is_err());
}

#[test]
fn test_environment_overrides_file() {
    // Given: A file and an environment variable for the same nested key
    let file = yaml_file("zfs:\n  binary: /usr/sbin/zfs\n");
    std::env::set_var("KOPIA_EXPORTER__ZFS__BINARY", "/sbin/zfs");

    // When: Loading
    let config = Config::load(file.path().to_str());
    std::env::remove_var("KOPIA_EXPORTER__ZFS__BINARY");

    // Then: The environment wins
    assert_eq!(config.unwrap().zfs.binary, "/sbin/zfs");
}
