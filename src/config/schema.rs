//! Configuration schema definitions

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Server configuration for the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Protocol used to rebuild absolute URLs when no forwarded header is present
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Honour `X-Forwarded-Proto` from a reverse proxy
    #[serde(default = "default_trust_proxy")]
    pub trust_proxy: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_trust_proxy() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            protocol: default_protocol(),
            trust_proxy: default_trust_proxy(),
        }
    }
}

/// Which collaborator answers requests under the mount prefix
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AuthBackend {
    /// In-process handler backed by the configured store
    #[default]
    Local,
    /// External auth service reached over HTTP
    Remote,
}

/// Auth bridge and session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Path prefix under which every request is forwarded to the auth handler
    #[serde(default = "default_mount_prefix")]
    pub mount_prefix: String,

    /// Shared secret used to sign session cookies
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Origins allowed to call the API with credentials
    #[serde(default = "default_trusted_origins")]
    pub trusted_origins: Vec<String>,

    #[serde(default)]
    pub provider: AuthBackend,

    /// Base URL of the external auth service when `provider = "remote"`
    #[serde(default)]
    pub remote_url: Option<String>,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default)]
    pub cookie_secure: bool,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    /// bcrypt cost factor
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

fn default_mount_prefix() -> String {
    "/ba".to_string()
}

fn default_base_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_trusted_origins() -> Vec<String> {
    vec![default_base_url()]
}

fn default_cookie_name() -> String {
    "matterdesk.session_token".to_string()
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

fn default_password_cost() -> u32 {
    10
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mount_prefix: default_mount_prefix(),
            secret: String::new(),
            base_url: default_base_url(),
            trusted_origins: default_trusted_origins(),
            provider: AuthBackend::default(),
            remote_url: None,
            cookie_name: default_cookie_name(),
            cookie_secure: false,
            session_ttl_hours: default_session_ttl_hours(),
            password_cost: default_password_cost(),
        }
    }
}

/// Where the local auth handler keeps users and sessions
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub store: StoreKind,
}

impl Config {
    /// Check the settings that must be present before the server can start
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(Error::Config(
                "DATABASE_URL environment variable is required".to_string(),
            ));
        }

        if self.auth.secret.trim().is_empty() {
            return Err(Error::Config(
                "AUTH_SECRET environment variable is required".to_string(),
            ));
        }

        if self.auth.provider == AuthBackend::Remote && self.auth.remote_url.is_none() {
            return Err(Error::Config(
                "auth.remote_url is required when auth.provider is \"remote\"".to_string(),
            ));
        }

        if self.mount_prefix() == "/" {
            return Err(Error::Config(
                "auth.mount_prefix must name a path such as \"/ba\", not the root".to_string(),
            ));
        }

        if self.auth.trusted_origins.is_empty() {
            return Err(Error::Config(
                "auth.trusted_origins must list at least one origin".to_string(),
            ));
        }

        Ok(())
    }

    /// Mount prefix normalised to a leading slash and no trailing slash
    pub fn mount_prefix(&self) -> String {
        let trimmed = self.auth.mount_prefix.trim().trim_end_matches('/');
        if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.database.url = "postgres://localhost/matterdesk".to_string();
        config.auth.secret = "s3cret".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_database_url_is_fatal() {
        let mut config = valid_config();
        config.database.url = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let mut config = valid_config();
        config.auth.secret = "   ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AUTH_SECRET"));
    }

    #[test]
    fn test_remote_provider_requires_url() {
        let mut config = valid_config();
        config.auth.provider = AuthBackend::Remote;
        assert!(config.validate().is_err());

        config.auth.remote_url = Some("http://auth:3001".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mount_prefix_normalised() {
        let mut config = Config::default();
        assert_eq!(config.mount_prefix(), "/ba");

        config.auth.mount_prefix = "auth/".to_string();
        assert_eq!(config.mount_prefix(), "/auth");
    }

    #[test]
    fn test_root_mount_prefix_is_rejected() {
        for prefix in ["/", "", "  ", "//"] {
            let mut config = valid_config();
            config.auth.mount_prefix = prefix.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("auth.mount_prefix"), "{:?}", prefix);
        }
    }
}
