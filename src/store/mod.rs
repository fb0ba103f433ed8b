/// Persistence collaborator
///
/// Users and refresh tokens live behind `AuthStore`. `PgStore` is the
/// production backend; `MemoryStore` serves tests and local runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;

/// A registered user as persisted
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
}

/// A newly minted refresh token, before it is persisted
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A persisted refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Usability of a refresh token at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Expired,
    Revoked,
}

impl RefreshToken {
    /// Revocation wins over expiry.
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if now >= self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }
}

impl From<NewRefreshToken> for RefreshToken {
    fn from(new: NewRefreshToken) -> Self {
        Self {
            token: new.token,
            user_id: new.user_id,
            created_at: new.created_at,
            updated_at: new.created_at,
            expires_at: new.expires_at,
            revoked_at: None,
        }
    }
}

/// Storage operations the credential subsystem depends on.
///
/// Implementations must give a concurrent revoke and lookup of the same
/// token a consistent view of the row.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// `Conflict` if the email is already registered.
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    async fn store_refresh_token(&self, token: NewRefreshToken)
        -> Result<RefreshToken, StoreError>;

    async fn lookup_refresh_token(&self, token: &str) -> Result<RefreshToken, StoreError>;

    /// Sets `revoked_at` if it is not already set. Revoking an already
    /// revoked token succeeds and keeps the original timestamp.
    async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Delete every user and refresh token.
    async fn reset(&self) -> Result<(), StoreError>;
}
