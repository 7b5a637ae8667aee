//! Error types for identity operations.

use pathway_core::Fault;
use pathway_store::StoreError;
use thiserror::Error;

/// Result type for identity operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while verifying or establishing an identity.
///
/// A wrong password is not an error; it is an
/// [`AuthOutcome::Fail`](crate::AuthOutcome::Fail).
#[derive(Debug, Error)]
pub enum AuthError {
    /// Hashing or verifying a password failed.
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// The bcrypt cost is outside the supported range.
    #[error("bcrypt cost {0} is outside 4..=31")]
    InvalidCost(u32),

    /// The blocking worker running a hash did not complete.
    #[error("hashing worker failed: {0}")]
    Worker(String),

    /// The user store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The OAuth provider rejected or failed the exchange.
    #[error("oauth exchange failed: {0}")]
    Token(String),

    /// Transport failure talking to the OAuth provider.
    #[error("oauth transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// No OAuth provider is configured.
    #[error("oauth provider `{0}` is not configured")]
    NotConfigured(&'static str),
}

impl AuthError {
    /// Create a token error.
    pub fn token(reason: impl Into<String>) -> Self {
        Self::Token(reason.into())
    }
}

impl From<AuthError> for Fault {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => e.into(),
            AuthError::Token(reason) => Fault::auth_token(reason),
            AuthError::Http(e) => Fault::auth_token(e.to_string()),
            AuthError::NotConfigured(provider) => Fault::not_found(format!("{provider} login")),
            e @ (AuthError::Hash(_) | AuthError::InvalidCost(_) | AuthError::Worker(_)) => {
                Fault::unclassified_with_source("identity operation failed", e)
            }
        }
    }
}
