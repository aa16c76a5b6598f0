//! Configuration loading tests
//!
//! Run with: cargo test --test config_tests

use std::io::Write;
use tempfile::NamedTempFile;

use matterdesk::config::{
    apply_env_overrides, load_config_from_path, AuthBackend, Config, StoreKind,
};
use matterdesk::error::Error;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"
[server]
host = "127.0.0.1"
port = 8080
protocol = "https"
trust_proxy = false

[auth]
mount_prefix = "/auth-api/"
secret = "file-secret"
trusted_origins = ["https://app.example.com", "https://admin.example.com"]
provider = "remote"
remote_url = "http://auth.internal:3001/api/auth"

[database]
url = "postgres://db/matterdesk"
store = "memory"
"#,
    );

    let config = load_config_from_path(file.path()).unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.protocol, "https");
    assert!(!config.server.trust_proxy);
    assert_eq!(config.mount_prefix(), "/auth-api");
    assert_eq!(config.auth.provider, AuthBackend::Remote);
    assert_eq!(config.auth.trusted_origins.len(), 2);
    assert_eq!(config.database.store, StoreKind::Memory);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_config_uses_defaults() {
    let file = write_config(
        r#"
[database]
url = "postgres://localhost/matterdesk"
"#,
    );

    let config = load_config_from_path(file.path()).unwrap();

    assert_eq!(config.server.port, 3000);
    assert_eq!(config.mount_prefix(), "/ba");
    assert_eq!(config.auth.provider, AuthBackend::Local);
    assert_eq!(config.auth.cookie_name, "matterdesk.session_token");
    assert_eq!(config.database.store, StoreKind::Postgres);

    // no secret configured
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("AUTH_SECRET"));
}

#[test]
fn test_interpolation_in_file() {
    std::env::set_var("MATTERDESK_CFG_TEST_SECRET", "from-env");
    let file = write_config(
        r#"
[auth]
secret = "${MATTERDESK_CFG_TEST_SECRET}"
base_url = "${MATTERDESK_CFG_TEST_UNSET:-http://localhost:4000}"
"#,
    );

    let config = load_config_from_path(file.path()).unwrap();

    assert_eq!(config.auth.secret, "from-env");
    assert_eq!(config.auth.base_url, "http://localhost:4000");
    std::env::remove_var("MATTERDESK_CFG_TEST_SECRET");
}

#[test]
fn test_missing_file_is_config_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_config_from_path(&dir.path().join("matterdesk.toml"));

    assert!(matches!(result, Err(Error::ConfigNotFound)));
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let file = write_config("[server\nport = ");

    let result = load_config_from_path(file.path());

    assert!(matches!(result, Err(Error::TomlParse(_))));
}

#[test]
fn test_env_overrides() {
    std::env::set_var("DATABASE_URL", "postgres://env/matterdesk");
    std::env::remove_var("AUTH_SECRET");
    std::env::set_var("BETTER_AUTH_SECRET", "legacy-secret");
    std::env::set_var("AUTH_URL", "https://desk.example.com");
    std::env::set_var("PORT", "not-a-port");

    let mut config = Config::default();
    apply_env_overrides(&mut config);

    assert_eq!(config.database.url, "postgres://env/matterdesk");
    assert_eq!(config.auth.secret, "legacy-secret");
    assert_eq!(config.auth.base_url, "https://desk.example.com");
    assert_eq!(config.auth.trusted_origins, vec!["https://desk.example.com"]);
    assert_eq!(config.server.port, 3000);

    std::env::set_var("PORT", "4100");
    apply_env_overrides(&mut config);
    assert_eq!(config.server.port, 4100);

    for var in ["DATABASE_URL", "BETTER_AUTH_SECRET", "AUTH_URL", "PORT"] {
        std::env::remove_var(var);
    }
}

#[test]
fn test_remote_provider_requires_url() {
    let mut config = Config::default();
    config.database.url = "postgres://localhost/matterdesk".to_string();
    config.auth.secret = "s3cret".to_string();
    config.auth.provider = AuthBackend::Remote;

    assert!(config.validate().is_err());

    config.auth.remote_url = Some("http://auth.internal".to_string());
    assert!(config.validate().is_ok());
}
