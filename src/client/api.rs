//! HTTP calls made by the client session state

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::SessionUser;

/// Failure of a single client call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Non-2xx answer; `message` is the text the server sent back
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message suitable for display in a form, with a fallback for empty bodies
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status { message, .. } if !message.trim().is_empty() => message.clone(),
            ApiError::Status { .. } => fallback.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Server endpoints the client session state depends on.
///
/// Every call includes credentials (the session cookie).
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// "Who am I": the authoritative user for the current session
    async fn who_am_i(&self) -> Result<SessionUser, ApiError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError>;

    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError>;

    async fn sign_out(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Error text from a failure body: the `message` field of a JSON error,
/// a bare JSON string unquoted, otherwise the body as-is
pub fn error_text(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    match serde_json::from_str::<String>(body) {
        Ok(text) => text,
        Err(_) => body.trim().to_string(),
    }
}

/// [`AuthApi`] over HTTP with a cookie store shared by all calls
#[derive(Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    server: String,
    prefix: String,
}

impl HttpAuthApi {
    pub fn new(server: &str, prefix: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(ApiError::from)?;

        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}{}{}", self.server, self.prefix, path)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    /// Greeting from the guarded dashboard endpoint
    pub async fn protected_message(&self) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct Message {
            message: String,
        }

        let response = check(self.client.get(self.url("/api/protected")).send().await?).await?;
        let message: Message = response.json().await?;
        Ok(message.message)
    }
}

/// Turn a non-2xx response into `ApiError::Status` carrying the body text
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_text(&body),
    })
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn who_am_i(&self) -> Result<SessionUser, ApiError> {
        let response = check(self.client.get(self.url("/auth/me")).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError> {
        check(
            self.client
                .post(self.auth_url("/sign-in/email"))
                .json(&serde_json::json!({ "email": email, "password": password }))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        check(
            self.client
                .post(self.auth_url("/sign-up/email"))
                .json(&serde_json::json!({ "name": name, "email": email, "password": password }))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        check(self.client.post(self.auth_url("/sign-out")).send().await?).await?;
        Ok(())
    }
}
