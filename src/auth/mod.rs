/// Authentication module
///
/// Password hashing, access token issuance and validation, bearer header
/// parsing, the refresh token lifecycle, and the session use cases built
/// from them.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use bearer::{authorization_header, extract_bearer_token};
pub use claims::{Claims, ISSUER};
pub use jwt::{
    decode_access_token_at, issue_access_token, issue_access_token_at, validate_access_token,
    validate_access_token_at, SigningKey,
};
pub use password::{hash_password, verify_password, MAX_HASH_COST, MIN_HASH_COST};
pub use refresh_token::{generate_refresh_token, RefreshGrant, RefreshTokenManager};
pub use session::{Session, SessionService, UserProfile};
