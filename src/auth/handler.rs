//! Contract between the bridge and the embedded auth handler

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use reqwest::Url;
use serde::Serialize;

use crate::error::Result;

/// Protocol-neutral request handed to the auth handler
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub method: Method,
    /// Absolute URL; handlers derive behaviour from the full URL, not just the path
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl AuthRequest {
    /// Path component of the request URL
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// Response produced by the auth handler.
///
/// `headers` may carry several `set-cookie` entries; read them with
/// `headers.get_all(SET_COOKIE)`.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl AuthResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// JSON response with the given status
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        let mut response = Self::new(status);
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response.body = Bytes::from(body);
        Ok(response)
    }

    /// Append a `set-cookie` entry without touching existing ones
    pub fn append_cookie(mut self, cookie: HeaderValue) -> Self {
        self.headers.append(header::SET_COOKIE, cookie);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// All `set-cookie` values in the order the handler emitted them
    pub fn set_cookies(&self) -> Vec<&HeaderValue> {
        self.headers.get_all(header::SET_COOKIE).iter().collect()
    }
}

/// Entry point of the identity library mounted behind the bridge
#[async_trait]
pub trait AuthHandler: Send + Sync {
    async fn handle(&self, request: AuthRequest) -> Result<AuthResponse>;
}
