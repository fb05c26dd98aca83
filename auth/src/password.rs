//! Password hashing.

use crate::error::{AuthError, Result};
use async_trait::async_trait;

/// One-way password hashing.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if hashing fails.
    async fn hash(&self, password: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if the hash is malformed.
    async fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// bcrypt password hasher.
///
/// Hashing runs on the blocking thread pool.
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    /// Create a hasher with the given work factor (4..=31).
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Work factor in use.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = BcryptPasswordHasher::new(4);
        let hash = hasher.hash("Passw0rd!").await.unwrap();
        assert_ne!(hash, "Passw0rd!");
        assert!(hasher.verify("Passw0rd!", &hash).await.unwrap());
        assert!(!hasher.verify("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let hasher = BcryptPasswordHasher::new(4);
        assert!(matches!(
            hasher.verify("x", "not-a-hash").await,
            Err(AuthError::Hashing(_))
        ));
    }
}
