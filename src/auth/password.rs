/// Password Hashing and Verification
///
/// bcrypt with a cost factor fixed at startup. Any password, including the
/// empty string, is accepted for hashing.

use bcrypt::{hash, verify};

use crate::error::PasswordError;

pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns `PasswordError::Hashing` if the bcrypt backend fails (for
/// example, a cost outside 4..=31).
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    hash(password, cost).map_err(PasswordError::Hashing)
}

/// Verify a password against its stored hash
///
/// A malformed hash yields the same `Mismatch` as a wrong password.
pub fn verify_password(password: &str, hashed: &str) -> Result<(), PasswordError> {
    match verify(password, hashed) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(PasswordError::Mismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = MIN_HASH_COST;

    #[test]
    fn test_hash_password() {
        let password = "testpassword123";
        let hashed = hash_password(password, COST).expect("Failed to hash password");

        assert_ne!(password, hashed);
        assert!(hashed.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hashed = hash_password("testpassword123", COST).expect("Failed to hash password");
        assert!(verify_password("testpassword123", &hashed).is_ok());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hashed = hash_password("testpassword123", COST).expect("Failed to hash password");
        let result = verify_password("nottherightpassword", &hashed);

        assert!(matches!(result, Err(PasswordError::Mismatch)));
    }

    #[test]
    fn test_empty_password() {
        let hashed = hash_password("", COST).expect("Empty password must hash");

        assert!(verify_password("", &hashed).is_ok());
        assert!(matches!(verify_password("x", &hashed), Err(PasswordError::Mismatch)));
    }

    #[test]
    fn test_same_password_different_salts() {
        let first = hash_password("pw", COST).unwrap();
        let second = hash_password("pw", COST).unwrap();

        assert_ne!(first, second);
        assert!(verify_password("pw", &first).is_ok());
        assert!(verify_password("pw", &second).is_ok());
    }

    #[test]
    fn test_malformed_hash_is_a_mismatch() {
        let result = verify_password("pw", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(PasswordError::Mismatch)));
    }

    #[test]
    fn test_cost_out_of_range() {
        let result = hash_password("pw", MAX_HASH_COST + 1);
        assert!(matches!(result, Err(PasswordError::Hashing(_))));
    }
}
