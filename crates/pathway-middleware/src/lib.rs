//! # Pathway Middleware
//!
//! The request pipeline of the Pathway backend.
//!
//! Every request runs through the same fixed global stages, is dispatched to
//! a route, and then through that route's own chain:
//!
//! ```text
//! Request → RequestId → AccessLog → Cors → BodyParser → Session → dispatch
//!                                                                    ↓
//!           IdGuard → Validation → AuthGate → catch_fault(controller)
//! ```
//!
//! | Stage        | Type                      | Purpose                                    |
//! |--------------|---------------------------|--------------------------------------------|
//! | Request ID   | [`stages::RequestIdMiddleware`]  | Generate/propagate request ID (UUID v7)    |
//! | Access log   | [`stages::AccessLogMiddleware`]  | Structured request log and metrics  |
//! | CORS         | [`stages::CorsMiddleware`]       | Preflight and cross-origin headers  |
//! | Body parser  | [`stages::BodyParserMiddleware`] | JSON / urlencoded body into context |
//! | Session      | [`SessionMiddleware`]     | Principal and flash messages               |
//! | Id guard     | [`IdGuard`]               | Reject malformed identifier parameters     |
//! | Validation   | [`ValidationMiddleware`]  | Field checks and sanitizers                |
//! | Auth Gate    | [`AuthGate`]              | 401 unless a principal is present          |
//! | Controller   | [`catch_fault`]           | Route every fault to the Error Classifier  |
//!
//! Each request produces exactly one response: stages either call
//! [`Next::run`] (which consumes the continuation) or return their own
//! response.
//!
//! ## Example
//!
//! ```
//! use pathway_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct Tag;
//!
//! impl Middleware for Tag {
//!     fn name(&self) -> &'static str {
//!         "tag"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             ctx.set_extension("tagged");
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/pathway-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth_gate;
pub mod context;
pub mod cookie;
pub mod fault_wrapper;
pub mod middleware;
pub mod pipeline;
pub mod session;
pub mod stages;
pub mod state;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use auth_gate::{guard, AuthGate, GateDecision};
pub use context::{MiddlewareContext, SessionChange};
pub use fault_wrapper::{catch_fault, fault_response, Action, ClassifierSink, FaultSink, Reply, Wrapped};
pub use middleware::{BoxFuture, Endpoint, Middleware, Next};
pub use pipeline::{BoxedMiddleware, GlobalStage, Pipeline, PipelineBuilder, RouteChain};
pub use session::{
    FlashMessage, MemorySessionStore, SessionError, SessionId, SessionMiddleware, SessionRecord, SessionSettings,
    SessionStore,
};
pub use state::{InvalidTransition, RequestState};
pub use types::{Body, Request, Response};
pub use validation::{validate, FieldRule, IdGuard, ValidationMiddleware};
