//! One-way password hashing.
//!
//! bcrypt embeds a fresh random salt in every encoded hash, so hashing the
//! same password twice never produces the same output, and verification is
//! deliberately expensive. Callers on the request path should run both
//! operations under `tokio::task::spawn_blocking`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("stored hash is not a valid bcrypt encoding: {0}")]
    InvalidHash(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against its stored hash.
///
/// A wrong or empty password yields `Ok(false)`; only a structurally
/// unreadable stored hash is an error.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hashed).map_err(|e| PasswordError::InvalidHash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrips() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently_each_time() {
        let first = hash_password("secret123").unwrap();
        let second = hash_password("secret123").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("secret123", &first).unwrap());
        assert!(verify_password("secret123", &second).unwrap());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = hash_password("secret123").unwrap();
        assert!(!verify_password("secret124", &hash).unwrap());
    }

    #[test]
    fn empty_password_fails_verification_without_error() {
        let hash = hash_password("secret123").unwrap();
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn malformed_stored_hash_is_a_format_error() {
        let result = verify_password("secret123", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(PasswordError::InvalidHash(_))));
    }
}
