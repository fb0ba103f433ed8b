/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed and stateless. Validation checks the
/// signature before any claim is trusted, then applies expiry against the
/// supplied clock.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use std::fmt;
use uuid::Uuid;

use crate::auth::claims::{Claims, ISSUER};
use crate::error::AccessTokenError;

/// Symmetric key used to sign access tokens.
///
/// `Debug` never prints the key material.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// Issue a new access token for `subject`, valid for `ttl` from now
pub fn issue_access_token(
    subject: Uuid,
    key: &SigningKey,
    ttl: Duration,
) -> Result<String, AccessTokenError> {
    issue_access_token_at(subject, key, ttl, Utc::now())
}

pub fn issue_access_token_at(
    subject: Uuid,
    key: &SigningKey,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AccessTokenError> {
    let claims = Claims::new(subject, now, ttl);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )
    .map_err(|e| AccessTokenError::Encoding(e.to_string()))
}

/// Validate an access token and return its subject
///
/// # Errors
/// - `InvalidSignature` if the token was not signed with `key`
/// - `Expired` if the current time has reached `exp`
/// - `Malformed` for anything structurally wrong
pub fn validate_access_token(token: &str, key: &SigningKey) -> Result<Uuid, AccessTokenError> {
    validate_access_token_at(token, key, Utc::now())
}

pub fn validate_access_token_at(
    token: &str,
    key: &SigningKey,
    now: DateTime<Utc>,
) -> Result<Uuid, AccessTokenError> {
    decode_access_token_at(token, key, now)?.user_id()
}

/// Verify the signature and expiry of `token` and return its full claims
pub fn decode_access_token_at(
    token: &str,
    key: &SigningKey,
    now: DateTime<Utc>,
) -> Result<Claims, AccessTokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked below against `now`, with no leeway.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(key.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            let kind = classify(e.kind());
            tracing::debug!(reason = %kind, "Access token rejected");
            kind
        })?;

    if claims.is_expired_at(now) {
        return Err(AccessTokenError::Expired);
    }

    Ok(claims)
}

fn classify(kind: &ErrorKind) -> AccessTokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            AccessTokenError::InvalidSignature
        }
        ErrorKind::ExpiredSignature => AccessTokenError::Expired,
        _ => AccessTokenError::Malformed,
    }
}
