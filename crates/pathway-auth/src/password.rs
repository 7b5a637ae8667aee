//! Password hashing.

use crate::error::{AuthError, AuthResult};

/// Default bcrypt cost.
pub const DEFAULT_COST: u32 = 12;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Bcrypt hasher.
///
/// Hashing is CPU-bound, so both operations run on the blocking pool and
/// never stall the request executor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given cost.
    pub fn new(cost: u32) -> AuthResult<Self> {
        if (MIN_COST..=MAX_COST).contains(&cost) {
            Ok(Self { cost })
        } else {
            Err(AuthError::InvalidCost(cost))
        }
    }

    /// Returns the configured cost.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hashes a password with a fresh salt.
    pub async fn hash(&self, password: &str) -> AuthResult<String> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Worker(e.to_string()))?
            .map_err(AuthError::from)
    }

    /// Checks a password against a stored hash.
    pub async fn verify(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Worker(e.to_string()))?
            .map_err(AuthError::from)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}
