//! Cookie sessions and flash messages.
//!
//! The session stage restores the principal and pending flash messages
//! before the request is dispatched, and applies whatever the controller
//! asked for ([`SessionChange`]) on the way out:
//!
//! - `Establish` issues a fresh session id (the previous one is destroyed)
//! - `End` destroys the session and clears the cookie
//! - no change keeps the session, rolling its expiry forward
//!
//! An unknown, expired or unreadable session id resolves to "no principal".
//! The Auth Gate cannot tell the difference.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use http::header::SET_COOKIE;
use http::HeaderValue;
use pathway_core::Principal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::context::{MiddlewareContext, SessionChange};
use crate::cookie::{self, SessionCookie};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "pathway.sid";

/// Random identifier of a server-side session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a cookie value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

/// A one-shot message carried to the next request in the same session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// Category, e.g. `error` or `info`.
    pub kind: String,
    /// The message text.
    pub message: String,
}

impl FlashMessage {
    /// Creates a flash message.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates an `error` flash message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", message)
    }
}

/// What the store keeps per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// The logged-in user, if any.
    pub principal: Option<Principal>,
    /// Flash messages waiting for the next request.
    pub flash: Vec<FlashMessage>,
    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Creates a record that expires `ttl` from now.
    #[must_use]
    pub fn new(principal: Option<Principal>, flash: Vec<FlashMessage>, ttl: Duration) -> Self {
        Self {
            principal,
            flash,
            expires_at: expiry_after(ttl),
        }
    }

    /// Returns true once the expiry has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

fn expiry_after(ttl: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::days(1))
}

/// Session backend failure.
#[derive(Debug, Error)]
#[error("session store error: {0}")]
pub struct SessionError(pub String);

/// Server-side session storage.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Loads a live session. Expired sessions are `None`.
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError>;

    /// Inserts or replaces a session.
    async fn save(&self, id: &SessionId, record: SessionRecord) -> Result<(), SessionError>;

    /// Rolls a live session's expiry forward and replaces its pending flash
    /// messages, leaving the principal as stored.
    ///
    /// Returns `false`, writing nothing, when the session no longer exists.
    async fn refresh(
        &self,
        id: &SessionId,
        flash: Vec<FlashMessage>,
        ttl: Duration,
    ) -> Result<bool, SessionError>;

    /// Removes a session. Removing an unknown id is not an error.
    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError>;
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every expired session and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| !record.is_expired());
        before.saturating_sub(self.sessions.len())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
        let record = self.sessions.get(id).map(|entry| entry.value().clone());
        match record {
            Some(record) if record.is_expired() => {
                self.sessions.remove(id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, id: &SessionId, record: SessionRecord) -> Result<(), SessionError> {
        self.sessions.insert(*id, record);
        Ok(())
    }

    async fn refresh(
        &self,
        id: &SessionId,
        flash: Vec<FlashMessage>,
        ttl: Duration,
    ) -> Result<bool, SessionError> {
        let Some(mut entry) = self.sessions.get_mut(id) else {
            return Ok(false);
        };
        if entry.is_expired() {
            drop(entry);
            self.sessions.remove_if(id, |_, record| record.is_expired());
            return Ok(false);
        }
        entry.flash = flash;
        entry.expires_at = expiry_after(ttl);
        Ok(true)
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions.remove(id);
        Ok(())
    }
}

/// Cookie settings for [`SessionMiddleware`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Cookie name.
    pub cookie_name: String,
    /// Session lifetime, rolled forward on every request.
    pub max_age: Duration,
    /// Whether to set the `Secure` attribute.
    pub secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: Duration::from_secs(24 * 60 * 60),
            secure: false,
        }
    }
}

/// Restores and persists sessions.
pub struct SessionMiddleware {
    store: Arc<dyn SessionStore>,
    settings: SessionSettings,
}

impl SessionMiddleware {
    /// Creates the stage over a session store.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, settings: SessionSettings) -> Self {
        Self { store, settings }
    }

    fn cookie(&self, id: &SessionId) -> SessionCookie {
        SessionCookie::issue(
            &self.settings.cookie_name,
            id.to_string(),
            self.settings.max_age,
            self.settings.secure,
        )
    }

    async fn restore(&self, ctx: &mut MiddlewareContext, request: &Request) {
        let Some(id) = cookie::find(request.headers(), &self.settings.cookie_name).and_then(SessionId::parse)
        else {
            return;
        };
        match self.store.load(&id).await {
            Ok(Some(record)) => {
                ctx.set_session_id(Some(id));
                ctx.set_principal(record.principal);
                ctx.set_incoming_flash(record.flash);
            }
            Ok(None) => {
                tracing::warn!(request_id = %ctx.request_id(), "session expired or unknown");
            }
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id(), error = %e, "session lookup failed");
            }
        }
    }

    async fn persist(&self, ctx: &mut MiddlewareContext) -> Option<SessionCookie> {
        let flash = ctx.take_outgoing_flash();
        let current = ctx.session_id().copied();

        let (id, record) = match ctx.take_session_change() {
            Some(SessionChange::Establish(principal)) => {
                if let Some(old) = current {
                    self.destroy(ctx, &old).await;
                }
                let record = SessionRecord::new(Some(principal), flash, self.settings.max_age);
                (SessionId::new(), record)
            }
            Some(SessionChange::End) => {
                if let Some(old) = current {
                    self.destroy(ctx, &old).await;
                }
                return Some(SessionCookie::clear(&self.settings.cookie_name, self.settings.secure));
            }
            None => match current {
                Some(id) => {
                    return match self.store.refresh(&id, flash, self.settings.max_age).await {
                        Ok(true) => Some(self.cookie(&id)),
                        Ok(false) => {
                            tracing::debug!(request_id = %ctx.request_id(), "session ended during the request");
                            None
                        }
                        Err(e) => {
                            tracing::error!(request_id = %ctx.request_id(), error = %e, "session refresh failed");
                            None
                        }
                    };
                }
                None if !flash.is_empty() => (
                    SessionId::new(),
                    SessionRecord::new(None, flash, self.settings.max_age),
                ),
                None => return None,
            },
        };

        match self.store.save(&id, record).await {
            Ok(()) => Some(self.cookie(&id)),
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id(), error = %e, "session save failed");
                None
            }
        }
    }

    async fn destroy(&self, ctx: &MiddlewareContext, id: &SessionId) {
        if let Err(e) = self.store.destroy(id).await {
            tracing::error!(request_id = %ctx.request_id(), error = %e, "session destroy failed");
        }
    }
}

impl Middleware for SessionMiddleware {
    fn name(&self) -> &'static str {
        "session"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            self.restore(ctx, &request).await;

            let mut response = next.run(ctx, request).await;

            if let Some(cookie) = self.persist(ctx).await {
                match HeaderValue::from_str(&cookie.to_string()) {
                    Ok(value) => {
                        response.headers_mut().append(SET_COOKIE, value);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "session cookie is not a valid header value");
                    }
                }
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{header, Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;
    use pathway_core::ResourceId;

    fn principal() -> Principal {
        Principal::new(ResourceId::new(), "ana")
    }

    fn request_with_cookie(cookie: Option<String>) -> Request {
        let mut builder = HttpRequest::builder().uri("/auth/profile");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn ok() -> Response {
        HttpResponse::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn set_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }

    fn session_cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_login_issues_cookie_and_next_request_is_restored() {
        let store = Arc::new(MemorySessionStore::new());
        let stage = SessionMiddleware::new(store.clone(), SessionSettings::default());
        let who = principal();

        let mut ctx = MiddlewareContext::new();
        let login = who.clone();
        let next = Next::handler(move |ctx, _req| {
            ctx.establish_session(login);
            Box::pin(async { ok() })
        });
        let response = stage.process(&mut ctx, request_with_cookie(None), next).await;
        let cookie = set_cookie(&response).expect("session cookie");
        assert!(cookie.starts_with("pathway.sid="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert_eq!(store.len(), 1);

        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { ok() }));
        stage
            .process(&mut ctx, request_with_cookie(Some(session_cookie_pair(&cookie))), next)
            .await;
        assert_eq!(ctx.principal(), Some(&who));
    }

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let store = Arc::new(MemorySessionStore::new());
        let stage = SessionMiddleware::new(store.clone(), SessionSettings::default());
        let id = SessionId::new();
        store
            .save(&id, SessionRecord::new(Some(principal()), Vec::new(), Duration::from_secs(60)))
            .await
            .unwrap();

        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|ctx, _req| {
            ctx.end_session();
            Box::pin(async { ok() })
        });
        let response = stage
            .process(&mut ctx, request_with_cookie(Some(format!("pathway.sid={id}"))), next)
            .await;

        assert!(store.is_empty());
        assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_request_in_flight_during_logout_does_not_revive_session() {
        let store = Arc::new(MemorySessionStore::new());
        let stage = SessionMiddleware::new(store.clone(), SessionSettings::default());
        let id = SessionId::new();
        store
            .save(&id, SessionRecord::new(Some(principal()), Vec::new(), Duration::from_secs(60)))
            .await
            .unwrap();
        let cookie = format!("pathway.sid={id}");
        let release = Arc::new(tokio::sync::Notify::new());

        let slow = async {
            let mut ctx = MiddlewareContext::new();
            let release = Arc::clone(&release);
            let next = Next::handler(move |_ctx, _req| {
                Box::pin(async move {
                    release.notified().await;
                    ok()
                })
            });
            let response = stage
                .process(&mut ctx, request_with_cookie(Some(cookie.clone())), next)
                .await;
            (ctx, response)
        };
        let logout = async {
            let mut ctx = MiddlewareContext::new();
            let next = Next::handler(|ctx, _req| {
                ctx.end_session();
                Box::pin(async { ok() })
            });
            stage
                .process(&mut ctx, request_with_cookie(Some(cookie.clone())), next)
                .await;
            assert!(store.is_empty());
            release.notify_one();
        };
        let ((slow_ctx, slow_response), ()) = tokio::join!(slow, logout);

        assert!(slow_ctx.principal().is_some());
        assert!(set_cookie(&slow_response).is_none());
        assert!(store.is_empty());

        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { ok() }));
        stage.process(&mut ctx, request_with_cookie(Some(cookie)), next).await;
        assert!(ctx.principal().is_none());
    }

    #[tokio::test]
    async fn test_refresh_keeps_principal_and_skips_missing_sessions() {
        let store = MemorySessionStore::new();
        let id = SessionId::new();
        let who = principal();
        let record = SessionRecord::new(
            Some(who.clone()),
            vec![FlashMessage::error("old")],
            Duration::from_secs(1),
        );
        store.save(&id, record).await.unwrap();

        assert!(store.refresh(&id, Vec::new(), Duration::from_secs(3600)).await.unwrap());
        let refreshed = store.load(&id).await.unwrap().unwrap();
        assert_eq!(refreshed.principal, Some(who));
        assert!(refreshed.flash.is_empty());
        assert!(refreshed.expires_at > Utc::now() + chrono::Duration::seconds(3000));

        assert!(!store.refresh(&SessionId::new(), Vec::new(), Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_has_no_principal() {
        let store = Arc::new(MemorySessionStore::new());
        let stage = SessionMiddleware::new(store.clone(), SessionSettings::default());
        let id = SessionId::new();
        let mut record = SessionRecord::new(Some(principal()), Vec::new(), Duration::from_secs(60));
        record.expires_at = Utc::now() - chrono::Duration::seconds(1);
        store.save(&id, record).await.unwrap();

        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { ok() }));
        let response = stage
            .process(&mut ctx, request_with_cookie(Some(format!("pathway.sid={id}"))), next)
            .await;

        assert!(ctx.principal().is_none());
        assert!(set_cookie(&response).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_cookie_is_ignored() {
        let stage = SessionMiddleware::new(Arc::new(MemorySessionStore::new()), SessionSettings::default());
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { ok() }));
        stage
            .process(&mut ctx, request_with_cookie(Some("pathway.sid=%%%".into())), next)
            .await;
        assert!(ctx.principal().is_none());
    }

    #[tokio::test]
    async fn test_flash_survives_exactly_one_request() {
        let store = Arc::new(MemorySessionStore::new());
        let stage = SessionMiddleware::new(store.clone(), SessionSettings::default());

        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|ctx, _req| {
            ctx.flash(FlashMessage::error("Invalid credentials"));
            Box::pin(async { ok() })
        });
        let response = stage.process(&mut ctx, request_with_cookie(None), next).await;
        let cookie = session_cookie_pair(&set_cookie(&response).unwrap());

        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { ok() }));
        stage
            .process(&mut ctx, request_with_cookie(Some(cookie.clone())), next)
            .await;
        assert_eq!(ctx.flashes(), &[FlashMessage::error("Invalid credentials")]);

        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { ok() }));
        stage.process(&mut ctx, request_with_cookie(Some(cookie)), next).await;
        assert!(ctx.flashes().is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let store = MemorySessionStore::new();
        let mut stale = SessionRecord::new(None, Vec::new(), Duration::from_secs(60));
        stale.expires_at = Utc::now() - chrono::Duration::seconds(5);
        store.sessions.insert(SessionId::new(), stale);
        store
            .sessions
            .insert(SessionId::new(), SessionRecord::new(None, Vec::new(), Duration::from_secs(60)));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }
}
