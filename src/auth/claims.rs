/// JWT Claims structure
///
/// Registered claims (RFC 7519) carried by an access token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AccessTokenError;

/// Issuer written into, and required from, every access token
pub const ISSUER: &str = "chirpy";

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            iss: ISSUER.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `Malformed` if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AccessTokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| AccessTokenError::Malformed)
    }

    /// A token is expired from the second its `exp` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
