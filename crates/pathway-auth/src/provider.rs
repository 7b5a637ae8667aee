//! Local credential provider.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pathway_store::{Repository, User};
use serde_json::Value;
use tracing::debug;

use crate::error::AuthResult;
use crate::password::PasswordHasher;

/// A username and password pair from a login form.
#[derive(Clone)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Why a login was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No user has this username.
    UnknownUser,
    /// The account has no password (Google sign-in only).
    NoPassword,
    /// The password does not match.
    WrongPassword,
}

impl AuthFailure {
    /// Short reason for logs.
    pub const fn reason(self) -> &'static str {
        match self {
            Self::UnknownUser => "Incorrect username",
            Self::NoPassword => "Account has no password",
            Self::WrongPassword => "Incorrect password",
        }
    }
}

/// The result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The credentials identify this user.
    Ok(User),
    /// The credentials were refused.
    Fail(AuthFailure),
}

/// Verifies credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Checks the credentials. Infrastructure failures are errors; refused
    /// credentials are an [`AuthOutcome::Fail`].
    async fn authenticate(&self, credentials: Credentials) -> AuthResult<AuthOutcome>;
}

/// Checks a username and password against the users collection.
pub struct LocalProvider {
    users: Arc<dyn Repository<User>>,
    hasher: PasswordHasher,
}

impl LocalProvider {
    /// Create a provider over a users repository.
    pub fn new(users: Arc<dyn Repository<User>>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }
}

#[async_trait]
impl IdentityProvider for LocalProvider {
    async fn authenticate(&self, credentials: Credentials) -> AuthResult<AuthOutcome> {
        let Some(user) = self
            .users
            .find_one("username", &Value::String(credentials.username.clone()))
            .await?
        else {
            debug!(username = %credentials.username, "login for unknown user");
            return Ok(AuthOutcome::Fail(AuthFailure::UnknownUser));
        };

        let Some(hash) = user.password.as_deref() else {
            return Ok(AuthOutcome::Fail(AuthFailure::NoPassword));
        };

        if self.hasher.verify(&credentials.password, hash).await? {
            Ok(AuthOutcome::Ok(user))
        } else {
            Ok(AuthOutcome::Fail(AuthFailure::WrongPassword))
        }
    }
}

impl fmt::Debug for LocalProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalProvider")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}
