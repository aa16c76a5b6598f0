//! Client-side session state
//!
//! [`AuthProvider`] is created once at the application root and cloned
//! into every view that needs it. Clones share one state, published over a
//! `watch` channel so views can re-render on change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use super::api::{ApiError, AuthApi};
use crate::auth::SessionUser;

const DEFAULT_LOGIN_ERROR: &str = "Login failed";
const DEFAULT_SIGN_UP_ERROR: &str = "Sign up failed";

/// Snapshot of the client's auth state
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<SessionUser>,
    /// True only while the initial check or a login attempt is in flight
    pub loading: bool,
    /// Last login error, ready for display
    pub error: Option<String>,
}

/// Coarse phase derived from an [`AuthState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unknown,
    Authenticated,
    Unauthenticated,
}

impl AuthState {
    /// State before the initial session check has finished
    pub fn initial() -> Self {
        Self {
            user: None,
            loading: true,
            error: None,
        }
    }

    /// Computed from `user` on every call
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn status(&self) -> AuthStatus {
        match (&self.user, self.loading) {
            (Some(_), _) => AuthStatus::Authenticated,
            (None, true) => AuthStatus::Unknown,
            (None, false) => AuthStatus::Unauthenticated,
        }
    }
}

/// Why a login or sign-up did not produce a signed-in user
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoginError {
    /// The server refused the credentials; carries its message
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Network(String),

    /// Credentials were accepted but the session endpoint did not confirm a user
    #[error("Signed in, but the session could not be loaded")]
    SessionUnavailable,
}

impl LoginError {
    fn from_api(err: ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Status { .. } => LoginError::Rejected(err.display_message(fallback)),
            other => LoginError::Network(other.to_string()),
        }
    }
}

/// Single source of truth for "am I logged in, as whom"
#[derive(Clone)]
pub struct AuthProvider {
    api: Arc<dyn AuthApi>,
    state: Arc<watch::Sender<AuthState>>,
    mounted: Arc<AtomicBool>,
}

impl AuthProvider {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        let (state, _) = watch::channel(AuthState::initial());
        Self {
            api,
            state: Arc::new(state),
            mounted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Run the initial session check once per provider; later calls do nothing
    pub async fn mount(&self) {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.initial_check().await;
    }

    /// Ask the server who we are. Any failure means "not logged in" and is
    /// not reported as an error.
    pub async fn initial_check(&self) {
        let user = self.fetch_user().await;
        self.state.send_modify(|state| {
            state.user = user;
            state.loading = false;
        });
    }

    /// Sign in, then load the user from the session endpoint.
    ///
    /// The error is recorded in the state and also returned.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, LoginError> {
        self.begin_attempt();
        let result = match self.api.sign_in(email, password).await {
            Ok(()) => self.load_session_user().await,
            Err(e) => Err(LoginError::from_api(e, DEFAULT_LOGIN_ERROR)),
        };
        self.finish_attempt(&result);
        result
    }

    /// Create an account; the server signs the new user in
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionUser, LoginError> {
        self.begin_attempt();
        let result = match self.api.sign_up(name, email, password).await {
            Ok(()) => self.load_session_user().await,
            Err(e) => Err(LoginError::from_api(e, DEFAULT_SIGN_UP_ERROR)),
        };
        self.finish_attempt(&result);
        result
    }

    /// Forget the user locally. The server-side session stays valid;
    /// use [`AuthProvider::sign_out`] to end it as well.
    pub fn logout(&self) {
        self.state.send_modify(|state| {
            state.user = None;
            state.error = None;
        });
    }

    /// End the server session, then clear local state
    pub async fn sign_out(&self) -> Result<(), ApiError> {
        let result = self.api.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!("Sign-out request failed: {}", e);
        }
        self.logout();
        result
    }

    /// Re-fetch the user; a failure silently clears it
    pub async fn refresh_user(&self) {
        let user = self.fetch_user().await;
        self.state.send_modify(|state| state.user = user);
    }

    async fn fetch_user(&self) -> Option<SessionUser> {
        match self.api.who_am_i().await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!("No active session: {}", e);
                None
            }
        }
    }

    async fn load_session_user(&self) -> Result<SessionUser, LoginError> {
        self.fetch_user().await.ok_or(LoginError::SessionUnavailable)
    }

    fn begin_attempt(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn finish_attempt(&self, result: &Result<SessionUser, LoginError>) {
        self.state.send_modify(|state| {
            match result {
                Ok(user) => state.user = Some(user.clone()),
                Err(e) => {
                    state.user = None;
                    state.error = Some(e.to_string());
                }
            }
            state.loading = false;
        });
    }
}
