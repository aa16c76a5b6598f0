//! Auth-gated navigation

use super::state::AuthState;

/// Views of the client application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    SignUp,
    Dashboard,
}

impl View {
    pub fn path(&self) -> &'static str {
        match self {
            View::Login => "/login",
            View::SignUp => "/signup",
            View::Dashboard => "/dashboard",
        }
    }
}

/// What a protected route does for a given auth state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Initial check or login still running; render a placeholder
    Pending,
    Render,
    Redirect(View),
}

/// Decide for a protected view. While `loading` the answer is always
/// `Pending`, whatever `user` holds.
pub fn route_guard(state: &AuthState) -> GuardDecision {
    if state.loading {
        GuardDecision::Pending
    } else if state.is_authenticated() {
        GuardDecision::Render
    } else {
        GuardDecision::Redirect(View::Login)
    }
}

/// Outcome of navigating to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Pending,
    Render(View),
    Redirect(View),
}

/// Resolve a path against the application's routes
pub fn navigate(path: &str, state: &AuthState) -> Navigation {
    let path = path.split('?').next().unwrap_or(path).trim_end_matches('/');
    match path {
        "/login" | "/signup" if state.is_authenticated() => Navigation::Redirect(View::Dashboard),
        "/login" => Navigation::Render(View::Login),
        "/signup" => Navigation::Render(View::SignUp),
        "/dashboard" => match route_guard(state) {
            GuardDecision::Pending => Navigation::Pending,
            GuardDecision::Render => Navigation::Render(View::Dashboard),
            GuardDecision::Redirect(view) => Navigation::Redirect(view),
        },
        _ => Navigation::Redirect(View::Dashboard),
    }
}
