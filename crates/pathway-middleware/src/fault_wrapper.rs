//! Async fault wrapper.
//!
//! Controllers are written as straight-line async code returning
//! `Result<Reply, Fault>`. [`catch_fault`] turns one into an [`Endpoint`]:
//!
//! - `Ok(reply)` is formatted and written by the endpoint itself
//! - `Err(fault)` is handed to the [`FaultSink`], which classifies it
//!
//! Exactly one of the two happens per call. The fault is moved into the
//! sink, so it cannot be reported twice.

use std::sync::Arc;

use bytes::Bytes;
use http::header::LOCATION;
use http::{HeaderValue, StatusCode};
use pathway_core::{respond, Envelope, Fault, FaultResult};
use serde_json::Value;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Endpoint};
use crate::state::RequestState;
use crate::types::{Body, Request, Response};

/// A controller over injected state `S`.
pub type Action<S> = for<'a> fn(&'a S, &'a mut MiddlewareContext) -> BoxFuture<'a, FaultResult<Reply>>;

/// What a controller resolves with.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A success envelope.
    Envelope {
        /// HTTP status.
        status: StatusCode,
        /// Envelope message.
        message: String,
        /// Optional payload.
        data: Option<Value>,
    },
    /// A `302 Found` redirect, used by browser-facing OAuth routes.
    Redirect {
        /// Target URL.
        location: String,
    },
}

impl Reply {
    /// A reply with an explicit status and no data.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Envelope {
            status,
            message: message.into(),
            data: None,
        }
    }

    /// `200 OK`.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }

    /// `201 Created`.
    #[must_use]
    pub fn created(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, message)
    }

    /// `202 Accepted`.
    #[must_use]
    pub fn accepted(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ACCEPTED, message)
    }

    /// `302 Found` to `location`.
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    /// Attaches a payload. Has no effect on redirects.
    #[must_use]
    pub fn with_data(self, value: Value) -> Self {
        match self {
            Self::Envelope { status, message, .. } => Self::Envelope {
                status,
                message,
                data: Some(value),
            },
            redirect @ Self::Redirect { .. } => redirect,
        }
    }

    /// Renders the reply.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Envelope { status, message, data } => Envelope::format(status, message, data).into_response(),
            Self::Redirect { location } => match HeaderValue::from_str(&location) {
                Ok(value) => {
                    let mut response = Response::new(Body::new(Bytes::new()));
                    *response.status_mut() = StatusCode::FOUND;
                    response.headers_mut().insert(LOCATION, value);
                    response
                }
                Err(e) => respond(&Fault::unclassified_with_source("invalid redirect target", e)).into_response(),
            },
        }
    }
}

/// Receives every fault a wrapped controller raises.
pub trait FaultSink: Send + Sync {
    /// Turns the fault into the request's response.
    fn handle(&self, ctx: &mut MiddlewareContext, fault: Fault) -> Response;
}

/// The default sink: the Error Classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierSink;

impl FaultSink for ClassifierSink {
    fn handle(&self, ctx: &mut MiddlewareContext, fault: Fault) -> Response {
        fault_response(ctx, &fault)
    }
}

/// Moves the request to `Failed` and renders the classified fault.
///
/// Stages that short-circuit with a fault (identifier guard, Auth Gate, body
/// parser) use this too, so every fault goes through the same classifier.
pub fn fault_response(ctx: &mut MiddlewareContext, fault: &Fault) -> Response {
    if let Err(e) = ctx.transition(RequestState::Failed) {
        tracing::warn!(request_id = %ctx.request_id(), error = %e, "fault raised outside the request lifecycle");
    }
    tracing::debug!(request_id = %ctx.request_id(), method = %ctx.method(), path = ctx.path(), "classifying fault");
    respond(fault).into_response()
}

/// A controller bound to its state and fault sink.
pub struct Wrapped<S> {
    state: Arc<S>,
    action: Action<S>,
    sink: Arc<dyn FaultSink>,
}

impl<S> Wrapped<S> {
    /// Replaces the fault sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.sink = sink;
        self
    }
}

/// Wraps a controller so its faults reach the Error Classifier.
pub fn catch_fault<S: Send + Sync + 'static>(state: Arc<S>, action: Action<S>) -> Wrapped<S> {
    Wrapped {
        state,
        action,
        sink: Arc::new(ClassifierSink),
    }
}

impl<S: Send + Sync + 'static> Endpoint for Wrapped<S> {
    fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, _request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match (self.action)(&*self.state, ctx).await {
                Ok(reply) => {
                    if let Err(e) = ctx.transition(RequestState::Handled) {
                        tracing::warn!(request_id = %ctx.request_id(), error = %e, "controller resolved out of order");
                    }
                    reply.into_response()
                }
                Err(fault) => self.sink.handle(ctx, fault),
            }
        })
    }
}
