use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthStore, NewRefreshToken, RefreshToken, User};
use crate::error::StoreError;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// In-process `AuthStore`; every mutation holds the write lock for its
/// whole row update.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a refresh token row as-is.
    pub async fn put_refresh_token(&self, token: RefreshToken) {
        self.tables
            .write()
            .await
            .refresh_tokens
            .insert(token.token.clone(), token);
    }

    pub async fn refresh_token_count(&self) -> usize {
        self.tables.read().await.refresh_tokens.len()
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let tables = self.tables.read().await;
        tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.emails.contains_key(email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.emails.contains_key(email))
    }

    async fn store_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<RefreshToken, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.refresh_tokens.contains_key(&token.token) {
            return Err(StoreError::Conflict("refresh_tokens_pkey".to_string()));
        }

        let row = RefreshToken::from(token);
        tables.refresh_tokens.insert(row.token.clone(), row.clone());
        Ok(row)
    }

    async fn lookup_refresh_token(&self, token: &str) -> Result<RefreshToken, StoreError> {
        self.tables
            .read()
            .await
            .refresh_tokens
            .get(token)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .refresh_tokens
            .get_mut(token)
            .ok_or(StoreError::NotFound)?;

        if row.revoked_at.is_none() {
            row.revoked_at = Some(revoked_at);
            row.updated_at = revoked_at;
        }
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        *self.tables.write().await = Tables::default();
        Ok(())
    }
}
