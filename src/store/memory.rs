//! In-memory store

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{normalize_email, AuthStore, Credential, NewUser, SessionRecord, UserRecord};
use crate::error::{Error, Result};

/// Store keeping users and sessions in process memory.
/// Clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    credentials: Arc<RwLock<HashMap<String, Credential>>>,
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let email = normalize_email(&user.email);
        let mut credentials = self.credentials.write().await;
        if credentials.contains_key(&email) {
            return Err(Error::UserAlreadyExists(email));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: user.name,
            email: email.clone(),
            email_verified: false,
            image: None,
            created_at: now,
            updated_at: now,
        };

        credentials.insert(
            email,
            Credential {
                user: record.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(record)
    }

    async fn find_credential_by_email(&self, email: &str) -> Result<Option<Credential>> {
        let email = normalize_email(email);
        Ok(self.credentials.read().await.get(&email).cloned())
    }

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .credentials
            .read()
            .await
            .values()
            .find(|c| c.user.id == id)
            .map(|c| c.user.clone()))
    }

    async fn insert_session(&self, session: SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, existing| !existing.is_expired());
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} expired sessions", pruned);
        }

        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<SessionRecord>> {
        let mut sessions = self.sessions.write().await;
        let expired = match sessions.get(token) {
            Some(session) => session.is_expired(),
            None => return Ok(None),
        };

        if expired {
            sessions.remove(token);
            return Ok(None);
        }
        Ok(sessions.get(token).cloned())
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }
}
