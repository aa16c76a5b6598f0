//! API route handlers

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{AuthBridge, CurrentUser, SessionUser};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// Health check

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// Auth bridge

/// Forward anything under the mount prefix to the auth handler
pub async fn auth_bridge(State(bridge): State<AuthBridge>, request: Request) -> Response {
    match bridge.inbound_from_http(request).await {
        Ok(inbound) => bridge.forward(inbound).await,
        Err(e) => e.into_response(),
    }
}

// Guarded routes

/// `GET /auth/me` - the caller's user projection
pub async fn me(CurrentUser(context): CurrentUser) -> Json<SessionUser> {
    Json(context.user)
}

/// `GET /api/protected` - greeting shown on the dashboard
pub async fn protected(CurrentUser(context): CurrentUser) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("Hello, {}", context.user.display_name()),
    })
}
