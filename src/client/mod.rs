//! Client side of the auth flow: session state, login form and
//! auth-gated navigation

pub mod api;
pub mod form;
pub mod router;
pub mod state;

pub use api::{ApiError, AuthApi, HttpAuthApi};
pub use form::{LoginForm, SubmitOutcome};
pub use router::{navigate, route_guard, GuardDecision, Navigation, View};
pub use state::{AuthProvider, AuthState, AuthStatus, LoginError};
