//! Auth handler that forwards to an external auth service over HTTP

use async_trait::async_trait;
use axum::http::header;

use crate::auth::handler::{AuthHandler, AuthRequest, AuthResponse};
use crate::error::{Error, Result};

/// Forwards every request to `base_url` + the request's sub-path
pub struct RemoteAuthHandler {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteAuthHandler {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid auth.remote_url {}: {}", base_url, e)))?;

        // Redirects and cookies belong to the caller, not to this hop
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Target URL for a request, keeping its query string
    pub fn target_url(&self, request: &AuthRequest) -> String {
        match request.url.query() {
            Some(query) => format!("{}{}?{}", self.base_url, request.url.path(), query),
            None => format!("{}{}", self.base_url, request.url.path()),
        }
    }
}

#[async_trait]
impl AuthHandler for RemoteAuthHandler {
    async fn handle(&self, request: AuthRequest) -> Result<AuthResponse> {
        let target = self.target_url(&request);

        let mut headers = request.headers;
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        let mut builder = self
            .client
            .request(request.method, target.as_str())
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!("Remote auth handler {} -> {}", target, status.as_u16());

        Ok(AuthResponse {
            status,
            headers,
            body,
        })
    }
}
