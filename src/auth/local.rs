//! In-process email/password auth handler

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::handler::{AuthHandler, AuthRequest, AuthResponse};
use crate::auth::models::{AuthContext, SignInRequest, SignUpRequest};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::store::{normalize_email, AuthStore, NewUser, SessionRecord, UserRecord};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Claims carried by the signed session cookie
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Session token in the store
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

/// Settings for the local handler
#[derive(Debug, Clone)]
pub struct LocalAuthSettings {
    pub secret: String,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub session_ttl: chrono::Duration,
    pub password_cost: u32,
}

impl From<&AuthConfig> for LocalAuthSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            cookie_name: config.cookie_name.clone(),
            cookie_secure: config.cookie_secure,
            session_ttl: chrono::Duration::hours(config.session_ttl_hours),
            password_cost: config.password_cost,
        }
    }
}

/// Generate a random 32-byte hex token
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Auth handler answering sign-up, sign-in, session and sign-out routes
pub struct LocalAuthHandler {
    store: Arc<dyn AuthStore>,
    settings: LocalAuthSettings,
}

impl LocalAuthHandler {
    pub fn new(store: Arc<dyn AuthStore>, settings: LocalAuthSettings) -> Self {
        Self { store, settings }
    }

    async fn sign_up(&self, request: &AuthRequest) -> Result<AuthResponse> {
        let Some(body) = parse_body::<SignUpRequest>(request) else {
            return error_response(StatusCode::BAD_REQUEST, "INVALID_REQUEST_BODY", "Invalid request body");
        };

        let email = normalize_email(&body.email);
        if !is_plausible_email(&email) {
            return error_response(StatusCode::BAD_REQUEST, "INVALID_EMAIL", "Invalid email");
        }
        if body.password.len() < MIN_PASSWORD_LENGTH {
            return error_response(StatusCode::BAD_REQUEST, "PASSWORD_TOO_SHORT", "Password too short");
        }
        if body.password.len() > MAX_PASSWORD_LENGTH {
            return error_response(StatusCode::BAD_REQUEST, "PASSWORD_TOO_LONG", "Password too long");
        }

        let password_hash = hash_password(body.password, self.settings.password_cost).await?;
        let name = body.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let user = match self
            .store
            .create_user(NewUser {
                name,
                email,
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            Err(Error::UserAlreadyExists(_)) => {
                return error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "USER_ALREADY_EXISTS",
                    "User already exists",
                );
            }
            Err(e) => return Err(e),
        };

        tracing::info!("Created user {}", user.id);
        self.start_session(&user).await
    }

    async fn sign_in(&self, request: &AuthRequest) -> Result<AuthResponse> {
        let Some(body) = parse_body::<SignInRequest>(request) else {
            return error_response(StatusCode::BAD_REQUEST, "INVALID_REQUEST_BODY", "Invalid request body");
        };

        let Some(credential) = self.store.find_credential_by_email(&body.email).await? else {
            tracing::debug!("Sign-in for unknown email");
            return invalid_credentials();
        };

        if !verify_password(body.password, credential.password_hash).await? {
            tracing::debug!("Sign-in with wrong password for user {}", credential.user.id);
            return invalid_credentials();
        }

        self.start_session(&credential.user).await
    }

    async fn get_session(&self, request: &AuthRequest) -> Result<AuthResponse> {
        let Some(claims) = self.session_claims(&request.headers) else {
            return null_response();
        };

        let Some(session) = self.store.find_session_by_token(&claims.sid).await? else {
            return null_response();
        };
        if session.is_expired() || session.user_id != claims.sub {
            return null_response();
        }

        let Some(user) = self.store.find_user(&session.user_id).await? else {
            return null_response();
        };

        AuthResponse::json(
            StatusCode::OK,
            &AuthContext {
                session: session.to_session(),
                user: user.to_session_user(),
            },
        )
    }

    async fn sign_out(&self, request: &AuthRequest) -> Result<AuthResponse> {
        if let Some(claims) = self.session_claims(&request.headers) {
            self.store.delete_session_by_token(&claims.sid).await?;
            tracing::info!("Signed out user {}", claims.sub);
        }

        let expired = Cookie::build((self.settings.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.settings.cookie_secure)
            .max_age(time::Duration::ZERO)
            .build();

        Ok(
            AuthResponse::json(StatusCode::OK, &serde_json::json!({ "success": true }))?
                .append_cookie(cookie_header(&expired)?),
        )
    }

    /// Create a session for the user and answer with its cookie
    async fn start_session(&self, user: &UserRecord) -> Result<AuthResponse> {
        let now = Utc::now();
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            token: generate_token(),
            expires_at: now + self.settings.session_ttl,
            created_at: now,
        };
        self.store.insert_session(record.clone()).await?;

        let signed = self.sign_session(&record)?;
        let cookie = Cookie::build((self.settings.cookie_name.clone(), signed.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.settings.cookie_secure)
            .max_age(time::Duration::seconds(self.settings.session_ttl.num_seconds()))
            .build();

        Ok(AuthResponse::json(
            StatusCode::OK,
            &serde_json::json!({
                "token": signed,
                "user": user.to_session_user(),
            }),
        )?
        .append_cookie(cookie_header(&cookie)?))
    }

    fn sign_session(&self, session: &SessionRecord) -> Result<String> {
        let claims = SessionClaims {
            sub: session.user_id.clone(),
            sid: session.token.clone(),
            iat: session.created_at.timestamp(),
            exp: session.expires_at.timestamp(),
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )?)
    }

    /// Validated claims from the bearer token or the session cookie
    fn session_claims(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        let token = bearer_token(headers).or_else(|| {
            CookieJar::from_headers(headers)
                .get(&self.settings.cookie_name)
                .map(|c| c.value().to_string())
        })?;

        match decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl AuthHandler for LocalAuthHandler {
    async fn handle(&self, request: AuthRequest) -> Result<AuthResponse> {
        match request.path() {
            "/sign-up/email" if request.method == Method::POST => self.sign_up(&request).await,
            "/sign-in/email" if request.method == Method::POST => self.sign_in(&request).await,
            "/get-session" if request.method == Method::GET => self.get_session(&request).await,
            "/sign-out" if request.method == Method::POST => self.sign_out(&request).await,
            _ => error_response(StatusCode::NOT_FOUND, "NOT_FOUND", "Not found"),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_body<T: DeserializeOwned>(request: &AuthRequest) -> Option<T> {
    request
        .body
        .as_ref()
        .and_then(|body| serde_json::from_slice(body).ok())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn cookie_header(cookie: &Cookie<'_>) -> Result<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| Error::Other(format!("invalid cookie header: {}", e)))
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Result<AuthResponse> {
    AuthResponse::json(status, &serde_json::json!({ "code": code, "message": message }))
}

fn invalid_credentials() -> Result<AuthResponse> {
    error_response(
        StatusCode::UNAUTHORIZED,
        "INVALID_EMAIL_OR_PASSWORD",
        "Invalid email or password",
    )
}

fn null_response() -> Result<AuthResponse> {
    AuthResponse::json(StatusCode::OK, &serde_json::Value::Null)
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| Error::Other(format!("password hashing task failed: {}", e)))?
        .map_err(Error::from)
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::Other(format!("password check task failed: {}", e)))?
        .map_err(Error::from)
}
