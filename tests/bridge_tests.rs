//! Auth bridge tests driven through the full router
//!
//! Run with: cargo test --test bridge_tests

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderValue, Method, Request, StatusCode},
    Router,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use matterdesk::api::{create_router, AppState};
use matterdesk::auth::bridge::MAX_BODY_BYTES;
use matterdesk::auth::{AuthHandler, AuthRequest, AuthResponse};
use matterdesk::config::Config;
use matterdesk::error::{Error, Result};

/// Handler that records the last request and answers with a canned response
struct RecordingHandler {
    last: Mutex<Option<AuthRequest>>,
    response: AuthResponse,
}

impl RecordingHandler {
    fn new(response: AuthResponse) -> Arc<Self> {
        Arc::new(Self {
            last: Mutex::new(None),
            response,
        })
    }

    fn last(&self) -> AuthRequest {
        self.last
            .lock()
            .unwrap()
            .clone()
            .expect("handler was not called")
    }
}

#[async_trait]
impl AuthHandler for RecordingHandler {
    async fn handle(&self, request: AuthRequest) -> Result<AuthResponse> {
        *self.last.lock().unwrap() = Some(request);
        Ok(self.response.clone())
    }
}

/// Handler that always fails
struct FailingHandler;

#[async_trait]
impl AuthHandler for FailingHandler {
    async fn handle(&self, _request: AuthRequest) -> Result<AuthResponse> {
        Err(Error::Other("database password is hunter2".to_string()))
    }
}

fn router(handler: Arc<dyn AuthHandler>) -> Router {
    let mut config = Config::default();
    config.auth.mount_prefix = "/ba".to_string();
    create_router(Arc::new(AppState::new(config, handler)))
}

fn ok_response() -> AuthResponse {
    AuthResponse::json(StatusCode::OK, &serde_json::json!({ "ok": true })).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_prefix_is_stripped_and_query_kept() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ba/get-session?disableCookieCache=true")
                .header(header::HOST, "app.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let request = handler.last();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.url.path(), "/get-session");
    assert_eq!(request.url.query(), Some("disableCookieCache=true"));
    assert_eq!(request.url.host_str(), Some("app.example.com"));
    assert_eq!(request.url.scheme(), "http");
    assert!(request.body.is_none());
}

#[tokio::test]
async fn test_bare_prefix_maps_to_root() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    app.oneshot(
        Request::builder()
            .uri("/ba")
            .header(header::HOST, "localhost:3000")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(handler.last().url.path(), "/");
}

#[tokio::test]
async fn test_prefix_with_trailing_slash_maps_to_root() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ba/?fresh=1")
                .header(header::HOST, "localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let request = handler.last();
    assert_eq!(request.url.path(), "/");
    assert_eq!(request.url.query(), Some("fresh=1"));
}

#[tokio::test]
async fn test_forwarded_proto_is_honoured() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    app.oneshot(
        Request::builder()
            .uri("/ba/ok")
            .header(header::HOST, "app.example.com")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(handler.last().url.scheme(), "https");
}

#[tokio::test]
async fn test_json_body_is_reencoded() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    let payload = r#"{ "email": "a@b.com", "password": "pw123456" }"#;
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri("/ba/sign-in/email")
            .header(header::HOST, "localhost:3000")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(payload))
            .unwrap(),
    )
    .await
    .unwrap();

    let request = handler.last();
    assert_eq!(request.url.path(), "/sign-in/email");
    assert_eq!(
        request.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(request.headers.get(header::CONTENT_LENGTH).is_none());

    let body: serde_json::Value = serde_json::from_slice(&request.body.unwrap()).unwrap();
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["password"], "pw123456");
}

#[tokio::test]
async fn test_empty_json_object_sends_no_body() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri("/ba/sign-out")
            .header(header::HOST, "localhost:3000")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await
    .unwrap();

    let request = handler.last();
    assert_eq!(request.method, Method::POST);
    assert!(request.body.is_none());
}

#[tokio::test]
async fn test_invalid_json_is_rejected_before_handler() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/ba/sign-in/email")
                .header(header::HOST, "localhost:3000")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(handler.last.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_non_utf8_text_body_is_rejected() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/ba/sign-in/email")
                .header(header::HOST, "localhost:3000")
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(Body::from(vec![0xffu8, 0xfe, 0x00, 0x61]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(handler.last.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/ba/sign-in/email")
                .header(header::HOST, "localhost:3000")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(vec![b'a'; MAX_BODY_BYTES + 1]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "message": "Request body too large" })
    );
    assert!(handler.last.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_body_at_limit_is_forwarded() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/ba/sign-in/email")
                .header(header::HOST, "localhost:3000")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(vec![b'a'; MAX_BODY_BYTES]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(handler.last().body.unwrap().len(), MAX_BODY_BYTES);
}

#[tokio::test]
async fn test_multiple_set_cookie_headers_survive() {
    let upstream = AuthResponse::json(StatusCode::OK, &serde_json::json!({ "ok": true }))
        .unwrap()
        .append_cookie(HeaderValue::from_static("a=1; Path=/; HttpOnly"))
        .append_cookie(HeaderValue::from_static("b=2; Path=/; HttpOnly"));
    let app = router(RecordingHandler::new(upstream));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/ba/sign-in/email")
                .header(header::HOST, "localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(
        cookies,
        vec!["a=1; Path=/; HttpOnly", "b=2; Path=/; HttpOnly"]
    );
}

#[tokio::test]
async fn test_status_and_body_pass_through() {
    let mut upstream =
        AuthResponse::json(StatusCode::UNAUTHORIZED, &serde_json::json!({ "code": "NOPE" }))
            .unwrap();
    upstream
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from_static("9999"));
    let app = router(RecordingHandler::new(upstream));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ba/get-session")
                .header(header::HOST, "localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_ne!(
        response.headers().get(header::CONTENT_LENGTH),
        Some(&HeaderValue::from_static("9999"))
    );
    assert_eq!(body_json(response).await["code"], "NOPE");
}

#[tokio::test]
async fn test_handler_failure_is_generic_500() {
    let app = router(Arc::new(FailingHandler));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ba/get-session")
                .header(header::HOST, "localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({ "message": "Auth handler error" }));
}

#[tokio::test]
async fn test_paths_outside_prefix_are_not_forwarded() {
    let handler = RecordingHandler::new(ok_response());
    let app = router(handler.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/bad/get-session")
                .header(header::HOST, "localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(handler.last.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_cors_preflight_allows_trusted_origin_with_credentials() {
    let app = router(RecordingHandler::new(ok_response()));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/ba/sign-in/email")
                .header(header::HOST, "localhost:3000")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_ignores_untrusted_origin() {
    let app = router(RecordingHandler::new(ok_response()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::HOST, "localhost:3000")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
