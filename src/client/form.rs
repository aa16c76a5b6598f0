//! Login form behaviour

use super::state::{AuthProvider, AuthState};
use crate::auth::SessionUser;

/// Result of pressing the submit button
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A login attempt or session check is already in flight
    Ignored,
    LoggedIn(SessionUser),
    Failed(String),
}

/// Fields and error line of the login page
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub form_error: Option<String>,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            form_error: None,
        }
    }

    /// Submit is disabled while `loading`
    pub fn can_submit(state: &AuthState) -> bool {
        !state.loading
    }

    pub fn button_label(state: &AuthState) -> &'static str {
        if state.loading {
            "Signing in..."
        } else {
            "Sign In"
        }
    }

    /// Error shown under the form: the form's own first, then the provider's
    pub fn visible_error<'a>(&'a self, state: &'a AuthState) -> Option<&'a str> {
        self.form_error.as_deref().or(state.error.as_deref())
    }

    pub async fn submit(&mut self, provider: &AuthProvider) -> SubmitOutcome {
        if !Self::can_submit(&provider.snapshot()) {
            return SubmitOutcome::Ignored;
        }

        self.form_error = None;
        match provider.login(&self.email, &self.password).await {
            Ok(user) => SubmitOutcome::LoggedIn(user),
            Err(e) => {
                let message = e.to_string();
                self.form_error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }
}
