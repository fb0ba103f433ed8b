/// Session use cases: signup, login, refresh, revoke, and request
/// authentication.
///
/// Internal failure causes are logged here and collapsed into the
/// `SessionError` kinds callers see.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::bearer::extract_bearer_token;
use crate::auth::jwt::{issue_access_token, validate_access_token, SigningKey};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::RefreshTokenManager;
use crate::configuration::AuthSettings;
use crate::error::{RefreshTokenError, SessionError, StoreError};
use crate::store::{AuthStore, RefreshToken, User};

/// Public view of a user; the password hash is not part of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Token pair returned by signup and login
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: RefreshToken,
}

pub struct SessionService {
    store: Arc<dyn AuthStore>,
    refresh_tokens: RefreshTokenManager,
    signing_key: SigningKey,
    access_token_ttl: Duration,
    hash_cost: u32,
    /// Verified against on unknown emails so both login failures cost one
    /// bcrypt run at the configured cost
    decoy_hash: Option<String>,
}

const DECOY_PASSWORD: &str = "chirpy-decoy-password";

impl SessionService {
    pub fn new(store: Arc<dyn AuthStore>, settings: &AuthSettings) -> Self {
        let decoy_hash = hash_password(DECOY_PASSWORD, settings.hash_cost)
            .map_err(|e| tracing::error!(error = %e, "Failed to prepare decoy hash"))
            .ok();

        Self {
            refresh_tokens: RefreshTokenManager::new(store.clone(), settings.refresh_token_ttl()),
            store,
            signing_key: settings.signing_secret.clone(),
            access_token_ttl: settings.access_token_ttl(),
            hash_cost: settings.hash_cost,
            decoy_hash,
        }
    }

    /// Register a new user and start a session for them
    ///
    /// # Errors
    /// - `Conflict` if the email is already registered
    /// - `CredentialFailure` if hashing fails
    /// - `Persistence` for any other storage failure
    pub async fn signup(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        if self.store.email_exists(email).await? {
            return Err(SessionError::Conflict);
        }

        let hashed = hash_password(password, self.hash_cost).map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            SessionError::CredentialFailure(e)
        })?;

        let user = self.store.create_user(email, &hashed).await?;
        let session = self.start_session(user).await?;

        tracing::info!(user_id = %session.user.id, "User registered successfully");
        Ok(session)
    }

    /// Authenticate with email and password
    ///
    /// An unknown email and a wrong password both yield `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let user = match self.store.find_user_by_email(email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                if let Some(decoy) = &self.decoy_hash {
                    let _ = verify_password(password, decoy);
                }
                tracing::warn!(reason = "unknown_email", "Login rejected");
                return Err(SessionError::InvalidCredentials);
            }
            Err(e) => return Err(SessionError::Persistence(e)),
        };

        if let Err(e) = verify_password(password, &user.hashed_password) {
            tracing::warn!(user_id = %user.id, reason = %e, "Login rejected");
            return Err(SessionError::InvalidCredentials);
        }

        let session = self.start_session(user).await?;
        tracing::info!(user_id = %session.user.id, "User logged in successfully");
        Ok(session)
    }

    /// Mint a new access token from the refresh token in `authorization`.
    /// The refresh token itself is left as is.
    pub async fn refresh_access_token(&self, authorization: &str) -> Result<String, SessionError> {
        let token = self.bearer(authorization)?;

        let grant = self
            .refresh_tokens
            .authenticate(token)
            .await
            .map_err(refresh_failure)?;

        let access_token = self.issue_access_token(grant.user_id)?;
        tracing::info!(user_id = %grant.user_id, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the refresh token in `authorization`
    pub async fn revoke_refresh_token(&self, authorization: &str) -> Result<(), SessionError> {
        let token = self.bearer(authorization)?;

        self.refresh_tokens
            .revoke(token)
            .await
            .map_err(refresh_failure)?;

        tracing::info!("Refresh token revoked");
        Ok(())
    }

    /// Resolve the acting user from an access token in `authorization`
    pub fn authenticate_request(&self, authorization: &str) -> Result<Uuid, SessionError> {
        let token = self.bearer(authorization)?;

        validate_access_token(token, &self.signing_key).map_err(|e| {
            tracing::warn!(reason = %e, "Access token rejected");
            SessionError::Unauthorized
        })
    }

    async fn start_session(&self, user: User) -> Result<Session, SessionError> {
        let access_token = self.issue_access_token(user.id)?;
        let refresh_token = self
            .refresh_tokens
            .issue(user.id)
            .await
            .map_err(|e| match e {
                RefreshTokenError::Store(store) => SessionError::Persistence(store),
                other => SessionError::TokenIssuance(other.to_string()),
            })?;

        Ok(Session {
            user: user.into(),
            access_token,
            refresh_token,
        })
    }

    fn issue_access_token(&self, user_id: Uuid) -> Result<String, SessionError> {
        issue_access_token(user_id, &self.signing_key, self.access_token_ttl)
            .map_err(|e| SessionError::TokenIssuance(e.to_string()))
    }

    fn bearer<'a>(&self, authorization: &'a str) -> Result<&'a str, SessionError> {
        extract_bearer_token(authorization).map_err(|e| {
            tracing::warn!(reason = %e, "Authorization header rejected");
            SessionError::Unauthorized
        })
    }
}

fn refresh_failure(err: RefreshTokenError) -> SessionError {
    match err {
        RefreshTokenError::Store(store) => SessionError::Persistence(store),
        other => {
            tracing::warn!(reason = other.reason(), "Refresh token rejected");
            SessionError::Unauthorized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::decode_access_token_at;
    use crate::auth::password::MIN_HASH_COST;
    use crate::store::{MemoryStore, NewRefreshToken};
    use async_trait::async_trait;

    /// Delegates to `MemoryStore` but reports every refresh token key as taken
    struct CollidingStore(MemoryStore);

    #[async_trait]
    impl AuthStore for CollidingStore {
        async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
            self.0.find_user_by_email(email).await
        }

        async fn create_user(&self, email: &str, hashed: &str) -> Result<User, StoreError> {
            self.0.create_user(email, hashed).await
        }

        async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
            self.0.email_exists(email).await
        }

        async fn store_refresh_token(
            &self,
            _token: NewRefreshToken,
        ) -> Result<RefreshToken, StoreError> {
            Err(StoreError::Conflict("refresh_tokens_pkey".to_string()))
        }

        async fn lookup_refresh_token(&self, token: &str) -> Result<RefreshToken, StoreError> {
            self.0.lookup_refresh_token(token).await
        }

        async fn mark_refresh_token_revoked(
            &self,
            token: &str,
            revoked_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.0.mark_refresh_token_revoked(token, revoked_at).await
        }

        async fn reset(&self) -> Result<(), StoreError> {
            self.0.reset().await
        }
    }

    fn settings() -> AuthSettings {
        let key = SigningKey::new("test-secret-key-at-least-32-characters-long");
        let mut settings = AuthSettings::new(key);
        settings.hash_cost = MIN_HASH_COST;
        settings
    }

    fn service() -> (SessionService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionService::new(store.clone(), &settings()), store)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[tokio::test]
    async fn signup_returns_token_pair_for_new_user() {
        let (service, _) = service();
        let session = service.signup("a@x.com", "pw").await.unwrap();

        let claims = decode_access_token_at(
            &session.access_token,
            &settings().signing_secret,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.user_id().unwrap(), session.user.id);

        let refresh = &session.refresh_token;
        assert_eq!(refresh.user_id, session.user.id);
        assert_eq!(refresh.expires_at - refresh.created_at, Duration::days(60));
        assert_eq!(refresh.token.len(), 64);
        assert_eq!(session.user.email, "a@x.com");
    }

    #[tokio::test]
    async fn signup_then_refresh_keeps_subject() {
        let (service, _) = service();
        let session = service.signup("a@x.com", "pw").await.unwrap();

        let access = service
            .refresh_access_token(&bearer(&session.refresh_token.token))
            .await
            .unwrap();

        assert_eq!(
            service.authenticate_request(&bearer(&access)).unwrap(),
            session.user.id
        );
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_conflict() {
        let (service, _) = service();
        service.signup("a@x.com", "pw").await.unwrap();

        let result = service.signup("a@x.com", "other").await;
        assert!(matches!(result, Err(SessionError::Conflict)));
    }

    #[tokio::test]
    async fn login_with_correct_password() {
        let (service, _) = service();
        let created = service.signup("a@x.com", "pw").await.unwrap();

        let session = service.login("a@x.com", "pw").await.unwrap();
        assert_eq!(session.user.id, created.user.id);
        assert_ne!(session.refresh_token.token, created.refresh_token.token);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (service, _) = service();
        service.signup("a@x.com", "pw").await.unwrap();

        let wrong_password = service.login("a@x.com", "nope").await;
        let unknown_email = service.login("b@x.com", "pw").await;

        assert!(matches!(wrong_password, Err(SessionError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(SessionError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_unauthorized() {
        let (service, _) = service();
        let session = service.signup("a@x.com", "pw").await.unwrap();
        let header = bearer(&session.refresh_token.token);

        service.revoke_refresh_token(&header).await.unwrap();
        service.revoke_refresh_token(&header).await.unwrap();

        let result = service.refresh_access_token(&header).await;
        assert!(matches!(result, Err(SessionError::Unauthorized)));
    }

    #[tokio::test]
    async fn refresh_rejects_bad_headers() {
        let (service, _) = service();

        let unknown = bearer(&"0".repeat(64));
        for header in ["", "Basic abc", unknown.as_str()] {
            let result = service.refresh_access_token(header).await;
            assert!(matches!(result, Err(SessionError::Unauthorized)), "{:?}", header);
        }
        assert!(matches!(
            service.revoke_refresh_token(&bearer("missing")).await,
            Err(SessionError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() {
        let (service, _) = service();
        let session = service.signup("a@x.com", "pw").await.unwrap();

        let result = service
            .refresh_access_token(&bearer(&session.access_token))
            .await;
        assert!(matches!(result, Err(SessionError::Unauthorized)));
    }

    #[tokio::test]
    async fn authenticate_request_rejects_foreign_tokens() {
        let (service, store) = service();
        let session = service.signup("a@x.com", "pw").await.unwrap();

        let mut other_settings = settings();
        other_settings.signing_secret = SigningKey::new("another-secret");
        let other = SessionService::new(store, &other_settings);

        assert!(matches!(
            other.authenticate_request(&bearer(&session.access_token)),
            Err(SessionError::Unauthorized)
        ));
        assert!(matches!(
            service.authenticate_request(""),
            Err(SessionError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn refresh_token_key_collision_is_not_an_email_conflict() {
        let store = Arc::new(CollidingStore(MemoryStore::new()));
        let service = SessionService::new(store, &settings());

        let result = service.signup("a@x.com", "pw").await;
        assert!(matches!(
            result,
            Err(SessionError::Persistence(StoreError::Conflict(_)))
        ));
    }

    #[test]
    fn decoy_hash_uses_configured_cost() {
        let (service, _) = service();
        let decoy = service.decoy_hash.as_deref().unwrap();

        assert!(decoy.starts_with("$2b$04$"));
        assert!(verify_password(DECOY_PASSWORD, decoy).is_ok());
    }
}
