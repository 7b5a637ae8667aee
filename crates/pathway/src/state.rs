//! Shared state injected into every controller.

use std::fmt;
use std::sync::Arc;

use pathway_auth::{
    GoogleConfig, GoogleProvider, IdentityProvider, LocalProvider, OAuthProvider, PasswordHasher, PendingStates,
};
use pathway_config::PathwayConfig;
use pathway_store::{Favorite, LearningPath, MemoryStore, Repository, Subscription, Topic, User};

use crate::error::BuildError;

/// Handles to the store and the identity providers.
///
/// Built once before the server accepts connections and shared by every
/// route through an `Arc`.
pub struct AppState {
    pub(crate) users: Arc<dyn Repository<User>>,
    pub(crate) paths: Arc<dyn Repository<LearningPath>>,
    pub(crate) topics: Arc<dyn Repository<Topic>>,
    pub(crate) subscriptions: Arc<dyn Repository<Subscription>>,
    pub(crate) favorites: Arc<dyn Repository<Favorite>>,
    pub(crate) hasher: PasswordHasher,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) google: Option<Arc<dyn OAuthProvider>>,
    pub(crate) oauth_states: PendingStates,
}

impl AppState {
    /// State over an open store, with local login only.
    #[must_use]
    pub fn new(store: &MemoryStore, hasher: PasswordHasher) -> Self {
        let users: Arc<dyn Repository<User>> = store.users();
        Self {
            identity: Arc::new(LocalProvider::new(Arc::clone(&users), hasher)),
            users,
            paths: store.paths(),
            topics: store.topics(),
            subscriptions: store.subscriptions(),
            favorites: store.favorites(),
            hasher,
            google: None,
            oauth_states: PendingStates::default(),
        }
    }

    /// State as configured: bcrypt cost and, when present, Google sign-in.
    pub fn from_config(config: &PathwayConfig, store: &MemoryStore) -> Result<Self, BuildError> {
        let state = Self::new(store, PasswordHasher::new(config.auth.bcrypt_cost)?);
        Ok(match &config.auth.google {
            Some(google) => state.with_google(Arc::new(GoogleProvider::new(GoogleConfig::new(
                google.client_id.clone(),
                google.client_secret.clone(),
                google.redirect_url.clone(),
            )))),
            None => state,
        })
    }

    /// Enables OAuth sign-in through `provider`.
    #[must_use]
    pub fn with_google(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.google = Some(provider);
        self
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("hasher", &self.hasher)
            .field("google", &self.google.as_ref().map(|p| p.name()))
            .finish_non_exhaustive()
    }
}
