//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline stage
//! implements, the [`Endpoint`] trait for whatever sits at the end of a
//! chain, and [`Next`], the continuation a stage calls to hand the request
//! on.
//!
//! # Example
//!
//! ```
//! use pathway_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             tracing::debug!(request_id = %ctx.request_id(), "before");
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(status = %response.status(), "after");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// Middleware receives a mutable context, the incoming request, and a
/// [`Next`] callback to invoke the rest of the chain.
///
/// # Invariants
///
/// - Middleware calls `next.run()` at most once; not calling it
///   short-circuits the pipeline with the middleware's own response
/// - Middleware never writes a second response after downstream produced one
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs and stage listings.
    fn name(&self) -> &'static str;

    /// Process the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// The terminal point of a chain: a router dispatcher or a wrapped
/// controller.
pub trait Endpoint: Send + Sync {
    /// Produces the response for the request.
    fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, request: Request) -> BoxFuture<'a, Response>;
}

/// Callback to invoke the next middleware in the chain.
///
/// If a stage never runs it, the stage's own response is the one written.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More middleware to process
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain - an endpoint borrowed for the request
    Endpoint(&'a dyn Endpoint),
    /// End of chain - a one-shot handler closure
    Handler(Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes an endpoint.
    pub fn endpoint(endpoint: &'a dyn Endpoint) -> Self {
        Self {
            inner: NextInner::Endpoint(endpoint),
        }
    }

    /// Creates a terminal `Next` that invokes a handler closure.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Wraps `terminal` with `stages`, first stage outermost.
    pub fn chain(stages: &'a [std::sync::Arc<dyn Middleware>], terminal: Next<'a>) -> Self {
        stages
            .iter()
            .rev()
            .fold(terminal, |next, middleware| Next::new(middleware.as_ref(), next))
    }

    /// Invokes the next middleware or endpoint in the chain.
    ///
    /// This consumes `self` to ensure it can only be called once.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Endpoint(endpoint) => endpoint.call(ctx, request).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            NextInner::Chain { middleware, .. } => middleware.name(),
            NextInner::Endpoint(_) => "endpoint",
            NextInner::Handler(_) => "handler",
        };
        f.debug_struct("Next").field("next", &kind).finish()
    }
}
