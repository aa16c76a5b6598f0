//! Bridge between axum requests and the embedded auth handler
//!
//! Every request under the mount prefix is rebuilt as an [`AuthRequest`]
//! with an absolute URL, handed to the [`AuthHandler`], and its
//! [`AuthResponse`] is copied back onto the outgoing response. Repeated
//! `set-cookie` headers are kept as separate entries; any other repeated
//! header is joined with `", "`.

use axum::{
    body::Body,
    extract::{OriginalUri, Request},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use reqwest::Url;
use std::sync::Arc;

use crate::auth::handler::{AuthHandler, AuthRequest, AuthResponse};
use crate::error::{Error, Result};

/// Largest inbound body the bridge will buffer
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Request headers the outbound transport computes itself
const RECOMPUTED_REQUEST_HEADERS: [HeaderName; 2] =
    [header::CONTENT_LENGTH, header::TRANSFER_ENCODING];

/// Inbound body after content-type based decoding
#[derive(Debug, Clone, PartialEq)]
pub enum InboundBody {
    Json(serde_json::Value),
    Text(String),
    Empty,
}

impl InboundBody {
    /// Decode raw bytes: JSON when the content type says so, UTF-8 text otherwise
    pub fn decode(headers: &HeaderMap, bytes: Bytes) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(InboundBody::Empty);
        }

        if is_json_content_type(headers) {
            return serde_json::from_slice(&bytes)
                .map(InboundBody::Json)
                .map_err(|_| Error::BadRequest("Invalid JSON body".to_string()));
        }

        String::from_utf8(bytes.to_vec())
            .map(InboundBody::Text)
            .map_err(|_| Error::BadRequest("Request body is not valid UTF-8".to_string()))
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Values of one inbound header name
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValues {
    Single(String),
    Many(Vec<String>),
}

impl HeaderValues {
    /// Single string form expected by the auth handler
    pub fn joined(&self) -> String {
        match self {
            HeaderValues::Single(value) => value.clone(),
            HeaderValues::Many(values) => values.join(", "),
        }
    }
}

/// Group a header map by name, one entry per distinct name
pub fn group_headers(headers: &HeaderMap) -> Vec<(HeaderName, HeaderValues)> {
    headers
        .keys()
        .map(|name| {
            let mut values: Vec<String> = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();

            let grouped = if values.len() == 1 {
                HeaderValues::Single(values.remove(0))
            } else {
                HeaderValues::Many(values)
            };
            (name.clone(), grouped)
        })
        .collect()
}

/// Build the single-valued header map handed to the auth handler
pub fn collect_headers(grouped: &[(HeaderName, HeaderValues)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, values) in grouped {
        if RECOMPUTED_REQUEST_HEADERS.contains(name) {
            continue;
        }

        let value = HeaderValue::from_str(&values.joined())
            .map_err(|e| Error::Bridge(format!("invalid value for header {}: {}", name, e)))?;
        headers.insert(name.clone(), value);
    }
    Ok(headers)
}

/// Remove the mount prefix from a path (query included), defaulting to `/`
pub fn strip_mount_prefix(path: &str, prefix: &str) -> String {
    match path.strip_prefix(prefix) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('?') => format!("/{}", rest),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

/// Rebuild an absolute URL from protocol, host and path
pub fn absolute_url(protocol: &str, host: &str, path: &str) -> Result<Url> {
    let raw = format!("{}://{}{}", protocol, host, path);
    Url::parse(&raw).map_err(|e| Error::Bridge(format!("invalid url {}: {}", raw, e)))
}

/// Body forwarded to the auth handler
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    /// Re-serialized JSON; the content type is forced to `application/json`
    Json(Bytes),
    Raw(Bytes),
}

/// Decide which body, if any, accompanies the outbound request.
///
/// GET and HEAD never carry a body. Empty JSON objects and arrays are
/// treated as no body at all.
pub fn outbound_body(method: &Method, body: &InboundBody) -> Result<Option<OutboundBody>> {
    if *method == Method::GET || *method == Method::HEAD {
        return Ok(None);
    }

    match body {
        InboundBody::Json(value) => {
            let non_empty = match value {
                serde_json::Value::Object(map) => !map.is_empty(),
                serde_json::Value::Array(items) => !items.is_empty(),
                serde_json::Value::Null => false,
                _ => true,
            };
            if !non_empty {
                return Ok(None);
            }
            Ok(Some(OutboundBody::Json(Bytes::from(serde_json::to_vec(value)?))))
        }
        InboundBody::Text(text) => Ok(Some(OutboundBody::Raw(Bytes::from(text.clone())))),
        InboundBody::Empty => Ok(None),
    }
}

/// Inbound request as seen by the bridge
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Full original path including the mount prefix and query string
    pub original_path: String,
    pub protocol: String,
    pub host: String,
    pub headers: Vec<(HeaderName, HeaderValues)>,
    pub body: InboundBody,
}

/// Reconstruct the handler request for an inbound request
pub fn build_auth_request(inbound: &InboundRequest, prefix: &str) -> Result<AuthRequest> {
    let sub_path = strip_mount_prefix(&inbound.original_path, prefix);
    let url = absolute_url(&inbound.protocol, &inbound.host, &sub_path)?;
    let mut headers = collect_headers(&inbound.headers)?;

    let body = match outbound_body(&inbound.method, &inbound.body)? {
        Some(OutboundBody::Json(bytes)) => {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            Some(bytes)
        }
        Some(OutboundBody::Raw(bytes)) => Some(bytes),
        None => None,
    };

    Ok(AuthRequest {
        method: inbound.method.clone(),
        url,
        headers,
        body,
    })
}

/// Copy a handler response onto an axum response.
///
/// `content-length` is left to the transport. Every `set-cookie` entry is
/// appended separately; other repeated headers are joined with `", "`.
pub fn write_response(response: AuthResponse) -> Response {
    let AuthResponse {
        status,
        headers: upstream,
        body,
    } = response;

    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    let headers = out.headers_mut();

    for name in upstream.keys() {
        if *name == header::CONTENT_LENGTH {
            continue;
        }

        if *name == header::SET_COOKIE {
            for cookie in upstream.get_all(name) {
                headers.append(header::SET_COOKIE, cookie.clone());
            }
            continue;
        }

        let values: Vec<&[u8]> = upstream.get_all(name).iter().map(|v| v.as_bytes()).collect();
        match HeaderValue::from_bytes(&values.join(&b", "[..])) {
            Ok(value) => {
                headers.insert(name.clone(), value);
            }
            Err(e) => tracing::warn!("Dropping upstream header {}: {}", name, e),
        }
    }

    out
}

/// Generic 500 answered whenever forwarding fails
pub fn auth_handler_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "message": "Auth handler error" })),
    )
        .into_response()
}

/// How the public origin of a request is derived
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    /// Protocol used when no forwarded header applies
    pub protocol: String,
    /// Honour `X-Forwarded-Proto`
    pub trust_proxy: bool,
}

impl OriginPolicy {
    pub fn protocol(&self, headers: &HeaderMap) -> String {
        if self.trust_proxy {
            let forwarded = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|p| !p.is_empty());
            if let Some(proto) = forwarded {
                return proto.to_string();
            }
        }
        self.protocol.clone()
    }

    pub fn host(&self, headers: &HeaderMap, uri: &Uri) -> Result<String> {
        headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .ok_or_else(|| Error::Bridge("request has no host".to_string()))
    }
}

/// Forwards requests under the mount prefix to the auth handler
#[derive(Clone)]
pub struct AuthBridge {
    handler: Arc<dyn AuthHandler>,
    prefix: String,
    origin: OriginPolicy,
}

impl AuthBridge {
    pub fn new(handler: Arc<dyn AuthHandler>, prefix: impl Into<String>, origin: OriginPolicy) -> Self {
        Self {
            handler,
            prefix: prefix.into(),
            origin,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Read an axum request into the bridge's inbound form
    pub async fn inbound_from_http(&self, request: Request) -> Result<InboundRequest> {
        let (parts, body) = request.into_parts();

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let original_path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        let protocol = self.origin.protocol(&parts.headers);
        let host = self.origin.host(&parts.headers, &uri)?;

        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|err| {
                if err.into_inner().is::<LengthLimitError>() {
                    Error::PayloadTooLarge
                } else {
                    Error::BadRequest("Failed to read request body".to_string())
                }
            })?;
        let body = InboundBody::decode(&parts.headers, bytes)?;

        Ok(InboundRequest {
            method: parts.method,
            original_path,
            protocol,
            host,
            headers: group_headers(&parts.headers),
            body,
        })
    }

    /// Forward one request and translate the handler's answer.
    /// Failures become a generic 500; details only reach the log.
    pub async fn forward(&self, inbound: InboundRequest) -> Response {
        let sub_path = strip_mount_prefix(&inbound.original_path, &self.prefix);
        tracing::info!(
            "[bridge] Incoming {} {} -> {}",
            inbound.method,
            inbound.original_path,
            sub_path
        );

        let result = match build_auth_request(&inbound, &self.prefix) {
            Ok(request) => self.handler.handle(request).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => {
                tracing::info!(
                    "[bridge] {} {} -> {}",
                    inbound.method,
                    sub_path,
                    response.status.as_u16()
                );
                write_response(response)
            }
            Err(e) => {
                tracing::error!("Auth handler error: {}", e);
                auth_handler_error()
            }
        }
    }
}
