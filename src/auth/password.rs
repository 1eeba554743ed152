use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash a plaintext password with bcrypt at the given cost. The salt is
/// generated per call, so hashing the same input twice yields different
/// digests.
pub fn hash_password(plaintext: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(plaintext, cost).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a plaintext password against a stored digest. Returns false on
/// mismatch and also on a malformed digest - callers only ever branch on
/// the boolean.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    match bcrypt::verify(plaintext, digest) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password digest could not be verified: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt's minimum cost keeps the adaptive work factor out of the test
    // runtime (the crate does not export it as a constant)
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_and_verify_round_trip() {
        let digest = hash_password("secret1", TEST_COST).unwrap();
        assert!(verify_password("secret1", &digest));
        assert!(!verify_password("secret2", &digest));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("secret1", TEST_COST).unwrap();
        let b = hash_password("secret1", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("secret1", &a));
        assert!(verify_password("secret1", &b));
    }

    #[test]
    fn malformed_digest_verifies_false() {
        assert!(!verify_password("secret1", "not-a-bcrypt-digest"));
        assert!(!verify_password("secret1", ""));
    }
}
