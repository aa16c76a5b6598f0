//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;

use super::Config;

const CONFIG_FILENAME: &str = "matterdesk.toml";

/// Load configuration from matterdesk.toml, falling back to defaults,
/// then apply environment overrides
pub fn load_config() -> Result<Config> {
    let mut config = match find_config_file() {
        Ok(path) => load_config_from_path(&path)?,
        Err(Error::ConfigNotFound) => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Config::default()
        }
        Err(e) => return Err(e),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<std::path::PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// First non-empty value among the given environment variables
fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Override config values with process environment variables
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(url) = env_any(&["DATABASE_URL"]) {
        config.database.url = url;
    }

    if let Some(secret) = env_any(&["AUTH_SECRET", "BETTER_AUTH_SECRET"]) {
        config.auth.secret = secret;
    }

    if let Some(base_url) = env_any(&["AUTH_URL", "BETTER_AUTH_URL"]) {
        config.auth.trusted_origins = vec![base_url.clone()];
        config.auth.base_url = base_url;
    }

    if let Some(port) = env_any(&["PORT"]) {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // Constant pattern
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# Matterdesk Configuration

[server]
host = "0.0.0.0"
port = 3000
protocol = "http"
trust_proxy = true

[auth]
# Requests under this prefix are forwarded to the auth handler
mount_prefix = "/ba"
secret = "${AUTH_SECRET}"
base_url = "${AUTH_URL:-http://localhost:5173}"
trusted_origins = ["${AUTH_URL:-http://localhost:5173}"]
provider = "local"  # or "remote"
# remote_url = "http://localhost:3001/api/auth"
cookie_name = "matterdesk.session_token"
cookie_secure = false
session_ttl_hours = 168
password_cost = 10

[database]
url = "${DATABASE_URL}"
store = "postgres"  # or "memory" for local development
"#
}
