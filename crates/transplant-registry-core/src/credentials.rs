//! Password hashing.
//!
//! Every stored password goes through bcrypt, on registration and on
//! password change alike.

use bcrypt::{hash, verify};

/// Hash a plaintext password with the given bcrypt cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Check a plaintext password against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match verify(password, stored_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be parsed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("s3cret", 4).unwrap();
        assert_ne!(hashed, "s3cret");
        assert!(verify_password("s3cret", &hashed));
        assert!(!verify_password("wrong", &hashed));
    }

    #[test]
    fn test_salted() {
        let a = hash_password("same", 4).unwrap();
        let b = hash_password("same", 4).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_mismatch() {
        assert!(!verify_password("x", "plaintext-password"));
    }
}
