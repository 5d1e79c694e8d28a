//! Password hashing (bcrypt).
//!
//! Hashing is CPU-bound; async callers should run these on a blocking thread.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt cost must be between 4 and 31, got {0}")]
    InvalidCost(u32),

    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

/// A bcrypt hash as stored alongside the user record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(4..=31).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn hash(&self, password: &str) -> Result<PasswordHash, PasswordError> {
        Ok(PasswordHash(bcrypt::hash(password, self.cost)?))
    }

    /// Returns `Ok(false)` on mismatch; errors only for unreadable hashes.
    pub fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, PasswordError> {
        Ok(bcrypt::verify(password, hash.as_str())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let hash = h.hash("123456").unwrap();
        assert!(h.verify("123456", &hash).unwrap());
        assert!(!h.verify("654321", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let h = hasher();
        assert_ne!(h.hash("123456").unwrap(), h.hash("123456").unwrap());
    }

    #[test]
    fn cost_out_of_range_is_rejected() {
        assert!(matches!(PasswordHasher::new(3), Err(PasswordError::InvalidCost(3))));
        assert!(matches!(PasswordHasher::new(32), Err(PasswordError::InvalidCost(32))));
    }

    #[test]
    fn debug_output_hides_the_hash() {
        let hash = hasher().hash("123456").unwrap();
        assert_eq!(format!("{hash:?}"), "PasswordHash(<redacted>)");
    }

    #[test]
    fn garbage_hash_is_an_error() {
        let err = hasher().verify("123456", &PasswordHash::from_stored("nope"));
        assert!(err.is_err());
    }
}
