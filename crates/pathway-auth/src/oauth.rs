//! Third-party OAuth sign-in.
//!
//! The flow is the standard authorization-code grant:
//!
//! 1. `GET /auth/google` redirects to [`OAuthProvider::authorize_url`] with a
//!    one-time `state` issued by [`PendingStates`]
//! 2. the provider redirects back with `code` and `state`
//! 3. the state is consumed, the code is exchanged for a profile, and
//!    [`link_profile`] finds or creates the local user

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use pathway_store::{Repository, User};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// A user profile returned by an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    /// The provider's stable subject identifier.
    pub subject: String,
    /// Verified email, if shared.
    pub email: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub picture: Option<String>,
}

/// An OAuth authorization-code provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider name for logs and routes.
    fn name(&self) -> &'static str;

    /// The consent URL to redirect the browser to.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for the user's profile.
    async fn exchange(&self, code: &str) -> AuthResult<ExternalProfile>;
}

/// Google OAuth client settings.
#[derive(Clone)]
pub struct GoogleConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Callback URL registered with Google.
    pub redirect_url: String,
    /// Consent endpoint.
    pub auth_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// User-info endpoint.
    pub userinfo_url: String,
}

impl GoogleConfig {
    /// Settings against Google's public endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        }
    }

    /// Points the token and user-info calls somewhere else.
    pub fn with_endpoints(mut self, token_url: impl Into<String>, userinfo_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish_non_exhaustive()
    }
}

const GOOGLE_SCOPES: &str =
    "https://www.googleapis.com/auth/userinfo.profile https://www.googleapis.com/auth/userinfo.email";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Google sign-in.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    config: GoogleConfig,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a provider with its own HTTP client.
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_url),
            urlencoding::encode(GOOGLE_SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn exchange(&self, code: &str) -> AuthResult<ExternalProfile> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::token(format!("token endpoint returned {}", response.status())));
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::token(format!("userinfo endpoint returned {}", response.status())));
        }
        let info: GoogleUserInfo = response.json().await?;
        debug!(subject = %info.sub, "google profile received");

        Ok(ExternalProfile {
            subject: info.sub,
            email: info.email,
            name: info.name,
            picture: info.picture,
        })
    }
}

/// Finds the user linked to `profile`, creating one on first sign-in.
///
/// New users take their email as username, or `google-<subject>` when the
/// provider shares no email.
pub async fn link_profile(users: &dyn Repository<User>, profile: &ExternalProfile) -> AuthResult<User> {
    if let Some(user) = users
        .find_one("googleId", &Value::String(profile.subject.clone()))
        .await?
    {
        return Ok(user);
    }

    let username = profile
        .email
        .clone()
        .unwrap_or_else(|| format!("google-{}", profile.subject));
    let mut fields = Map::new();
    fields.insert("username".into(), Value::String(username));
    fields.insert("googleId".into(), Value::String(profile.subject.clone()));
    if let Some(email) = &profile.email {
        fields.insert("email".into(), Value::String(email.clone()));
    }
    if let Some(name) = &profile.name {
        fields.insert("name".into(), Value::String(name.clone()));
    }
    if let Some(picture) = &profile.picture {
        fields.insert("image".into(), Value::String(picture.clone()));
    }

    let user = users.create(fields).await?;
    info!(user_id = %user.id, "user created from google profile");
    Ok(user)
}

/// One-time `state` values for in-flight authorization requests.
#[derive(Debug)]
pub struct PendingStates {
    states: DashMap<String, Instant>,
    ttl: Duration,
}

impl PendingStates {
    /// Create an empty set whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Issues a fresh state value.
    pub fn issue(&self) -> String {
        let now = Instant::now();
        self.states.retain(|_, issued| now.duration_since(*issued) < self.ttl);
        let state = Uuid::new_v4().simple().to_string();
        self.states.insert(state.clone(), now);
        state
    }

    /// Consumes a state value. Fails when it was never issued, was already
    /// used or has expired.
    pub fn consume(&self, state: &str) -> AuthResult<()> {
        match self.states.remove(state) {
            Some((_, issued)) if issued.elapsed() < self.ttl => Ok(()),
            Some(_) => Err(AuthError::token("oauth state expired")),
            None => Err(AuthError::token("unknown oauth state")),
        }
    }
}

impl Default for PendingStates {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}
