//! Middleware context.
//!
//! The [`MiddlewareContext`] is the per-request state every stage and
//! controller works against: request line, parsed body, path and query
//! parameters, the session principal, flash messages and the lifecycle
//! state. It is created by the server for one request and dropped once the
//! response is written.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

use http::Method;
use pathway_core::{Principal, RequestId};
use pathway_router::Params;
use serde_json::{Map, Value};

use crate::session::{FlashMessage, SessionId};
use crate::state::{InvalidTransition, RequestState};
use crate::types::Request;

/// A change to the session requested by a controller.
///
/// The session stage applies it after the controller returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// Start (or replace) an authenticated session for the principal.
    Establish(Principal),
    /// Destroy the current session.
    End,
}

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use pathway_middleware::MiddlewareContext;
/// use serde_json::json;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_body(json!({"title": "  Rust  "}).as_object().cloned().unwrap_or_default());
/// assert_eq!(ctx.body_str("title"), Some("  Rust  "));
/// assert!(ctx.principal().is_none());
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    method: Method,
    path: String,
    state: RequestState,
    body: Map<String, Value>,
    params: Params,
    query: HashMap<String, String>,
    principal: Option<Principal>,
    session_id: Option<SessionId>,
    session_change: Option<SessionChange>,
    incoming_flash: Vec<FlashMessage>,
    outgoing_flash: Vec<FlashMessage>,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates an empty context for `GET /`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            method: Method::GET,
            path: "/".to_string(),
            state: RequestState::Received,
            body: Map::new(),
            params: Params::new(),
            query: HashMap::new(),
            principal: None,
            session_id: None,
            session_change: None,
            incoming_flash: Vec::new(),
            outgoing_flash: Vec::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a context for an incoming request, capturing its method,
    /// path and query string.
    #[must_use]
    pub fn for_request(request: &Request) -> Self {
        let query = request
            .uri()
            .query()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default();

        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            query,
            ..Self::new()
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Sets the request ID. Only the request-id stage should call this.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    // --- lifecycle ---------------------------------------------------------

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RequestState {
        self.state
    }

    /// Moves the request to `next`.
    pub fn transition(&mut self, next: RequestState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(
            request_id = %self.request_id,
            from = self.state.name(),
            to = next.name(),
            "request state transition"
        );
        self.state = next;
        Ok(())
    }

    /// Marks the response as written. Fails if it already was.
    pub fn mark_responded(&mut self) -> Result<(), InvalidTransition> {
        self.transition(RequestState::Responded)
    }

    // --- body, params, query -----------------------------------------------

    /// Returns the parsed request body.
    #[must_use]
    pub const fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Returns the parsed request body for in-place normalization.
    pub fn body_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.body
    }

    /// Replaces the parsed request body.
    pub fn set_body(&mut self, body: Map<String, Value>) {
        self.body = body;
    }

    /// Returns a body field as a string slice, if it is a string.
    #[must_use]
    pub fn body_str(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }

    /// Returns the captured path parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Sets the captured path parameters. Called by router dispatch.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Returns a path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns the query parameters.
    #[must_use]
    pub const fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    // --- session -----------------------------------------------------------

    /// Returns the authenticated principal, if the session carries one.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns true if a principal is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Sets the principal restored from the session.
    ///
    /// Only the session stage should call this; controllers use
    /// [`establish_session`](Self::establish_session).
    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// Returns the id of the session the request arrived with.
    #[must_use]
    pub const fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Sets the session id. Called by the session stage.
    pub fn set_session_id(&mut self, session_id: Option<SessionId>) {
        self.session_id = session_id;
    }

    /// Logs the principal in for this and subsequent requests.
    pub fn establish_session(&mut self, principal: Principal) {
        self.principal = Some(principal.clone());
        self.session_change = Some(SessionChange::Establish(principal));
    }

    /// Logs the current principal out.
    pub fn end_session(&mut self) {
        self.principal = None;
        self.session_change = Some(SessionChange::End);
    }

    /// Takes the pending session change, if any.
    pub fn take_session_change(&mut self) -> Option<SessionChange> {
        self.session_change.take()
    }

    // --- flash -------------------------------------------------------------

    /// Flash messages left for this request by the previous one.
    #[must_use]
    pub fn flashes(&self) -> &[FlashMessage] {
        &self.incoming_flash
    }

    /// Sets the flash messages loaded from the session.
    pub fn set_incoming_flash(&mut self, messages: Vec<FlashMessage>) {
        self.incoming_flash = messages;
    }

    /// Queues a flash message for the next request in this session.
    pub fn flash(&mut self, message: FlashMessage) {
        self.outgoing_flash.push(message);
    }

    /// Takes the flash messages queued during this request.
    pub fn take_outgoing_flash(&mut self) -> Vec<FlashMessage> {
        std::mem::take(&mut self.outgoing_flash)
    }

    // --- timing and extensions ---------------------------------------------

    /// Returns when the request started processing.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use pathway_core::ResourceId;

    #[test]
    fn test_for_request_captures_request_line() {
        let request: Request = http::Request::builder()
            .method(Method::PUT)
            .uri("/api/path/abc?sort=title&page=2")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let ctx = MiddlewareContext::for_request(&request);
        assert_eq!(ctx.method(), Method::PUT);
        assert_eq!(ctx.path(), "/api/path/abc");
        assert_eq!(ctx.query().get("sort").map(String::as_str), Some("title"));
        assert_eq!(ctx.query().get("page").map(String::as_str), Some("2"));
        assert_eq!(ctx.state(), RequestState::Received);
    }

    #[test]
    fn test_double_respond_is_refused() {
        let mut ctx = MiddlewareContext::new();
        ctx.mark_responded().unwrap();
        let err = ctx.mark_responded().unwrap_err();
        assert_eq!(err.from, RequestState::Responded);
    }

    #[test]
    fn test_establish_and_end_session() {
        let mut ctx = MiddlewareContext::new();
        let principal = Principal::new(ResourceId::new(), "ana");

        ctx.establish_session(principal.clone());
        assert_eq!(ctx.principal(), Some(&principal));
        assert_eq!(
            ctx.take_session_change(),
            Some(SessionChange::Establish(principal))
        );

        ctx.end_session();
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.take_session_change(), Some(SessionChange::End));
        assert_eq!(ctx.take_session_change(), None);
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Marker(u32);

        let mut ctx = MiddlewareContext::new();
        ctx.set_extension(Marker(7));
        assert_eq!(ctx.get_extension::<Marker>(), Some(&Marker(7)));
        assert_eq!(ctx.remove_extension::<Marker>(), Some(Marker(7)));
        assert!(ctx.get_extension::<Marker>().is_none());
    }
}
