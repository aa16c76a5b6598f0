//! User and session persistence for the local auth handler

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::{Session, SessionUser};
use crate::error::Result;

/// Stored user row
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Project the row into the shape returned to callers
    pub fn to_session_user(&self) -> SessionUser {
        let mut user = SessionUser::new(self.id.clone(), self.email.clone());
        user.set("name", self.name.clone());
        user.set("image", self.image.clone());
        user.set("emailVerified", self.email_verified);
        user.set("createdAt", self.created_at.to_rfc3339());
        user.set("updatedAt", self.updated_at.to_rfc3339());
        user
    }
}

/// A user together with the password hash of its credential account
#[derive(Debug, Clone)]
pub struct Credential {
    pub user: UserRecord,
    pub password_hash: String,
}

/// Values needed to create a user with an email/password credential
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password_hash: String,
}

/// Stored session row
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn to_session(&self) -> Session {
        Session {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            expires_at: self.expires_at,
            token: self.token.clone(),
        }
    }
}

/// Persistence used by the local auth handler
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Create a user and its credential account.
    /// Fails with `Error::UserAlreadyExists` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord>;

    async fn find_credential_by_email(&self, email: &str) -> Result<Option<Credential>>;

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>>;

    async fn insert_session(&self, session: SessionRecord) -> Result<()>;

    async fn find_session_by_token(&self, token: &str) -> Result<Option<SessionRecord>>;

    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
}

/// Canonical form used for email uniqueness
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
