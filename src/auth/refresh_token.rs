/// Refresh Token Management
///
/// Refresh tokens are 32 random bytes from the OS generator, hex encoded, and
/// persisted through the `AuthStore`. A token is usable until it expires or is
/// revoked; neither state is ever left.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RefreshTokenError;
use crate::store::{AuthStore, NewRefreshToken, RefreshToken, RefreshTokenState};

pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a new cryptographically secure refresh token (64 hex chars)
pub fn generate_refresh_token() -> Result<String, RefreshTokenError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(RefreshTokenError::Generation)?;
    Ok(hex::encode(bytes))
}

/// What a successful refresh token check yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshGrant {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Issues, authenticates, and revokes refresh tokens
#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn AuthStore>,
    lifetime: Duration,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn AuthStore>, lifetime: Duration) -> Self {
        Self { store, lifetime }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub async fn issue(&self, owner: Uuid) -> Result<RefreshToken, RefreshTokenError> {
        self.issue_at(owner, Utc::now()).await
    }

    /// Mint and persist a token for `owner` created at `now`
    pub async fn issue_at(
        &self,
        owner: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RefreshToken, RefreshTokenError> {
        let token = NewRefreshToken {
            token: generate_refresh_token()?,
            user_id: owner,
            created_at: now,
            expires_at: now + self.lifetime,
        };

        let stored = self.store.store_refresh_token(token).await?;
        tracing::debug!(user_id = %owner, expires_at = %stored.expires_at, "Refresh token issued");
        Ok(stored)
    }

    pub async fn authenticate(&self, token: &str) -> Result<RefreshGrant, RefreshTokenError> {
        self.authenticate_at(token, Utc::now()).await
    }

    /// Check existence, then revocation, then expiry. Rejections are left
    /// to the caller to log.
    pub async fn authenticate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshGrant, RefreshTokenError> {
        let record = self.store.lookup_refresh_token(token).await?;

        match record.state_at(now) {
            RefreshTokenState::Revoked => Err(RefreshTokenError::Revoked),
            RefreshTokenState::Expired => Err(RefreshTokenError::Expired),
            RefreshTokenState::Active => Ok(RefreshGrant {
                user_id: record.user_id,
                expires_at: record.expires_at,
            }),
        }
    }

    pub async fn revoke(&self, token: &str) -> Result<(), RefreshTokenError> {
        self.revoke_at(token, Utc::now()).await
    }

    /// Revoke a refresh token; repeating the call is a no-op
    pub async fn revoke_at(&self, token: &str, now: DateTime<Utc>) -> Result<(), RefreshTokenError> {
        self.store.mark_refresh_token_revoked(token, now).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager(store: Arc<MemoryStore>) -> RefreshTokenManager {
        RefreshTokenManager::new(store, Duration::days(60))
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token().unwrap();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_distinct() {
        let first = generate_refresh_token().unwrap();
        let second = generate_refresh_token().unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn issue_sets_sixty_day_expiry() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let now = Utc::now();

        let token = manager(store.clone()).issue_at(owner, now).await.unwrap();

        assert_eq!(token.user_id, owner);
        assert_eq!(token.expires_at - token.created_at, Duration::days(60));
        assert!(token.revoked_at.is_none());
        assert_eq!(store.refresh_token_count().await, 1);
    }

    #[tokio::test]
    async fn authenticate_active_token() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let owner = Uuid::new_v4();
        let token = manager.issue(owner).await.unwrap();

        let grant = manager.authenticate(&token.token).await.unwrap();
        assert_eq!(grant.user_id, owner);
        assert_eq!(grant.expires_at, token.expires_at);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let result = manager.authenticate(&"0".repeat(64)).await;

        assert!(matches!(result, Err(RefreshTokenError::NotFound)));
    }

    #[tokio::test]
    async fn token_expires_after_lifetime() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        let token = manager.issue_at(Uuid::new_v4(), now).await.unwrap();

        let before = manager
            .authenticate_at(&token.token, now + Duration::days(60) - Duration::seconds(1))
            .await;
        let at = manager
            .authenticate_at(&token.token, now + Duration::days(60))
            .await;

        assert!(before.is_ok());
        assert!(matches!(at, Err(RefreshTokenError::Expired)));
    }

    #[tokio::test]
    async fn revoked_token_stays_revoked() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        let token = manager.issue_at(Uuid::new_v4(), now).await.unwrap();

        manager.revoke_at(&token.token, now).await.unwrap();
        manager.revoke(&token.token).await.unwrap();

        for later in [now, now + Duration::days(1), now + Duration::days(365)] {
            let result = manager.authenticate_at(&token.token, later).await;
            assert!(matches!(result, Err(RefreshTokenError::Revoked)));
        }
    }

    #[tokio::test]
    async fn revoked_wins_over_expired() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store
            .put_refresh_token(RefreshToken {
                token: "stale".to_string(),
                user_id: Uuid::new_v4(),
                created_at: now - Duration::days(90),
                updated_at: now - Duration::days(70),
                expires_at: now - Duration::days(30),
                revoked_at: Some(now - Duration::days(70)),
            })
            .await;

        let result = manager(store).authenticate_at("stale", now).await;
        assert!(matches!(result, Err(RefreshTokenError::Revoked)));
    }

    #[tokio::test]
    async fn revoke_unknown_token_is_not_found() {
        let manager = manager(Arc::new(MemoryStore::new()));
        let result = manager.revoke("missing").await;

        assert!(matches!(result, Err(RefreshTokenError::NotFound)));
    }
}
