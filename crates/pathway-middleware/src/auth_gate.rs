//! Auth Gate.
//!
//! A request is authenticated iff the session stage restored a principal.
//! The gate never verifies credentials itself, and a missing session and an
//! expired one look the same to it.

use pathway_core::Fault;

use crate::context::MiddlewareContext;
use crate::fault_wrapper::fault_response;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};

/// Outcome of [`guard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// A principal is present.
    Allow,
    /// No principal; answer 401.
    Reject,
}

/// Decides whether the request may proceed.
#[must_use]
pub fn guard(ctx: &MiddlewareContext) -> GateDecision {
    if ctx.is_authenticated() {
        GateDecision::Allow
    } else {
        GateDecision::Reject
    }
}

/// Middleware form of [`guard`] for routes that require a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthGate;

impl AuthGate {
    /// Creates the gate.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for AuthGate {
    fn name(&self) -> &'static str {
        "auth_gate"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match guard(ctx) {
                GateDecision::Reject => {
                    tracing::debug!(request_id = %ctx.request_id(), path = ctx.path(), "auth gate rejected request");
                    fault_response(ctx, &Fault::unauthorized())
                }
                GateDecision::Allow => {
                    if let Err(e) = ctx.transition(RequestState::AuthChecked) {
                        tracing::warn!(request_id = %ctx.request_id(), error = %e, "auth gate passed out of order");
                    }
                    next.run(ctx, request).await
                }
            }
        })
    }
}
