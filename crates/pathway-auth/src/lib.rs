//! # Pathway Auth
//!
//! Identity-provider collaborators of the Pathway backend. The request
//! pipeline never verifies credentials itself; the login controllers call
//! into this crate and turn its results into sessions.
//!
//! - [`PasswordHasher`] - bcrypt on the blocking pool
//! - [`IdentityProvider`] / [`LocalProvider`] - username and password login
//!   returning an explicit [`AuthOutcome`]
//! - [`OAuthProvider`] / [`GoogleProvider`] - authorization-code sign-in
//!
//! Errors convert into request faults: provider rejections and transport
//! failures become `AuthToken` (401 "Authentication Error"), store errors
//! keep their own classification.

#![doc(html_root_url = "https://docs.rs/pathway-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod oauth;
mod password;
mod provider;

pub use error::{AuthError, AuthResult};
pub use oauth::{link_profile, ExternalProfile, GoogleConfig, GoogleProvider, OAuthProvider, PendingStates};
pub use password::{PasswordHasher, DEFAULT_COST};
pub use provider::{AuthFailure, AuthOutcome, Credentials, IdentityProvider, LocalProvider};
