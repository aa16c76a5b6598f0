//! Authentication: the auth handler contract, the bridge that forwards to
//! it, and the session guard built on top of it

pub mod bridge;
pub mod guard;
pub mod handler;
pub mod local;
pub mod models;
pub mod remote;

pub use bridge::{AuthBridge, OriginPolicy};
pub use guard::{require_session, CurrentUser, SessionGuard};
pub use handler::{AuthHandler, AuthRequest, AuthResponse};
pub use local::{LocalAuthHandler, LocalAuthSettings};
pub use models::{AuthContext, Session, SessionUser};
pub use remote::RemoteAuthHandler;
