//! Authentication models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User projection surfaced by the auth handler.
///
/// Only `id` and `email` are required. Everything else the handler sends
/// (`name`, `image`, `emailVerified`, timestamps, plugin fields) is kept in
/// `extra` exactly as received, explicit `null`s included, so serializing
/// the user back out reproduces the handler's object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Set a field, replacing any previous value
    pub fn set(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.extra.insert(key.to_string(), value.into());
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set("name", name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(serde_json::Value::as_str)
    }

    pub fn image(&self) -> Option<&str> {
        self.extra.get("image").and_then(serde_json::Value::as_str)
    }

    pub fn email_verified(&self) -> Option<bool> {
        self.extra
            .get("emailVerified")
            .and_then(serde_json::Value::as_bool)
    }

    /// Name if set, otherwise the email address
    pub fn display_name(&self) -> &str {
        self.name()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.email)
    }
}

/// Server-issued session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub token: String,
}

impl Session {
    /// Check if the session has passed its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Identity attached to a request once the session guard accepts it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    pub session: Session,
    pub user: SessionUser,
}

/// Sign-up body accepted by `/sign-up/email`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

/// Sign-in body accepted by `/sign-in/email`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}
