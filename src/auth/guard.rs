//! Session guard middleware and extractor

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, Method, Uri},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::bridge::{absolute_url, collect_headers, group_headers, OriginPolicy};
use crate::auth::handler::{AuthHandler, AuthRequest};
use crate::auth::models::AuthContext;
use crate::error::{Error, Result};

/// Session introspection route of the auth handler
pub const SESSION_PATH: &str = "/get-session";

/// Resolves the caller's identity through the auth handler.
///
/// Every call performs a fresh lookup; nothing is cached between requests.
#[derive(Clone)]
pub struct SessionGuard {
    handler: Arc<dyn AuthHandler>,
    origin: OriginPolicy,
}

impl SessionGuard {
    pub fn new(handler: Arc<dyn AuthHandler>, origin: OriginPolicy) -> Self {
        Self { handler, origin }
    }

    /// Resolve the session for the given request headers.
    ///
    /// A missing session, an expired one, a non-2xx answer and a handler
    /// failure all end in `Error::Unauthorized`.
    pub async fn resolve(&self, headers: &HeaderMap, uri: &Uri) -> Result<AuthContext> {
        match self.lookup(headers, uri).await {
            Ok(Some(context)) if !context.session.is_expired() => Ok(context),
            Ok(_) => Err(Error::Unauthorized),
            Err(e) => {
                tracing::debug!("Session lookup failed: {}", e);
                Err(Error::Unauthorized)
            }
        }
    }

    async fn lookup(&self, headers: &HeaderMap, uri: &Uri) -> Result<Option<AuthContext>> {
        let protocol = self.origin.protocol(headers);
        let host = self.origin.host(headers, uri)?;

        let request = AuthRequest {
            method: Method::GET,
            url: absolute_url(&protocol, &host, SESSION_PATH)?,
            headers: collect_headers(&group_headers(headers))?,
            body: None,
        };

        let response = self.handler.handle(request).await?;
        if !response.is_success() {
            return Ok(None);
        }

        Ok(serde_json::from_slice::<Option<AuthContext>>(&response.body)?)
    }
}

/// Middleware rejecting requests without a valid session.
///
/// On success the resolved [`AuthContext`] is stored in the request
/// extensions for [`CurrentUser`].
pub async fn require_session(
    State(guard): State<SessionGuard>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, Error> {
    let context = guard.resolve(request.headers(), request.uri()).await?;
    tracing::debug!(user_id = %context.user.id, "Session resolved");

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Identity of the caller on a guarded route
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or(Error::Unauthorized)
    }
}
