//! Fixed-order global pipeline.
//!
//! Every request flows through the same global stages before it is
//! dispatched to a route:
//!
//! 1. **Request ID** - Generate or propagate request ID (UUID v7)
//! 2. **Access log** - Structured request log and request metrics
//! 3. **CORS** - Preflight handling and response headers
//! 4. **Body parser** - JSON / urlencoded body into the context
//! 5. **Session** - Restore the principal and flash messages
//!
//! Stages are registered against a [`GlobalStage`] slot, so the order is
//! fixed no matter in which order the builder is called.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Endpoint, Middleware, Next};
use crate::types::{Request, Response};

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A global pipeline slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum GlobalStage {
    /// Stage 1: Request ID generation/propagation
    RequestId = 1,
    /// Stage 2: Access log and request metrics
    AccessLog = 2,
    /// Stage 3: Cross-origin resource sharing
    Cors = 3,
    /// Stage 4: Body parsing
    BodyParser = 4,
    /// Stage 5: Session restoration and flash messages
    Session = 5,
}

impl GlobalStage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RequestId => "request_id",
            Self::AccessLog => "access_log",
            Self::Cors => "cors",
            Self::BodyParser => "body_parser",
            Self::Session => "session",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [GlobalStage; 5] {
        [
            Self::RequestId,
            Self::AccessLog,
            Self::Cors,
            Self::BodyParser,
            Self::Session,
        ]
    }
}

/// The global middleware pipeline.
///
/// Immutable after [`PipelineBuilder::build`].
///
/// # Example
///
/// ```
/// use pathway_middleware::pipeline::{GlobalStage, Pipeline};
/// use pathway_middleware::stages::{BodyParserMiddleware, RequestIdMiddleware};
///
/// let pipeline = Pipeline::builder()
///     .stage(GlobalStage::BodyParser, BodyParserMiddleware::new())
///     .stage(GlobalStage::RequestId, RequestIdMiddleware::new())
///     .build();
///
/// assert_eq!(pipeline.stage_names(), vec!["request_id", "body_parser"]);
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs a request through every global stage, then `endpoint`.
    pub async fn process(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        endpoint: &dyn Endpoint,
    ) -> Response {
        self.run(ctx, request, Next::endpoint(endpoint)).await
    }

    /// Runs a request through every global stage, then `terminal`.
    pub async fn run<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        terminal: Next<'a>,
    ) -> Response {
        Next::chain(&self.stages, terminal).run(ctx, request).await
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: BTreeMap<GlobalStage, BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `middleware` in the given slot, replacing what was there.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, slot: GlobalStage, middleware: M) -> Self {
        if let Some(previous) = self.stages.insert(slot, Arc::new(middleware)) {
            tracing::debug!(slot = slot.name(), replaced = previous.name(), "pipeline stage replaced");
        }
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages.into_values().collect(),
        }
    }
}

/// The stages and endpoint registered for one route.
///
/// Runs its stages (identifier guard, validator, Auth Gate) in order and
/// then the endpoint, usually a wrapped controller.
#[derive(Clone)]
pub struct RouteChain {
    stages: Vec<BoxedMiddleware>,
    endpoint: Arc<dyn Endpoint>,
}

impl RouteChain {
    /// Creates a chain that calls `endpoint` directly.
    #[must_use]
    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            stages: Vec::new(),
            endpoint,
        }
    }

    /// Appends a stage in front of the endpoint.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Returns the names of the route's stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }
}

impl Endpoint for RouteChain {
    fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, request: Request) -> BoxFuture<'a, Response> {
        Box::pin(Next::chain(&self.stages, Next::endpoint(self.endpoint.as_ref())).run(ctx, request))
    }
}

impl std::fmt::Debug for RouteChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteChain")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;
    use std::sync::Mutex;

    /// A test middleware that records its invocation order.
    struct OrderTrackingMiddleware {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTrackingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            let order = self.order.clone();
            let name = self.name;

            Box::pin(async move {
                order.lock().unwrap().push(name);
                next.run(ctx, request).await
            })
        }
    }

    struct Ok200;

    impl Endpoint for Ok200 {
        fn call<'a>(&'a self, _ctx: &'a mut MiddlewareContext, _request: Request) -> BoxFuture<'a, Response> {
            Box::pin(async {
                HttpResponse::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::from("OK")))
                    .unwrap()
            })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_stages_run_in_slot_order_regardless_of_registration() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let tracker = |name| OrderTrackingMiddleware {
            name,
            order: order.clone(),
        };

        let pipeline = Pipeline::builder()
            .stage(GlobalStage::Session, tracker("session"))
            .stage(GlobalStage::RequestId, tracker("request_id"))
            .stage(GlobalStage::Cors, tracker("cors"))
            .build();

        let mut ctx = MiddlewareContext::new();
        let response = pipeline.process(&mut ctx, request(), &Ok200).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*order.lock().unwrap(), vec!["request_id", "cors", "session"]);
        assert_eq!(pipeline.stage_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let pipeline = Pipeline::builder().build();
        let mut ctx = MiddlewareContext::new();
        let response = pipeline.process(&mut ctx, request(), &Ok200).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(pipeline.stage_count(), 0);
    }

    #[tokio::test]
    async fn test_route_chain_runs_stages_then_endpoint() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = RouteChain::new(Arc::new(Ok200))
            .stage(OrderTrackingMiddleware {
                name: "id_guard",
                order: order.clone(),
            })
            .stage(OrderTrackingMiddleware {
                name: "auth_gate",
                order: order.clone(),
            });

        let mut ctx = MiddlewareContext::new();
        let response = chain.call(&mut ctx, request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*order.lock().unwrap(), vec!["id_guard", "auth_gate"]);
        assert_eq!(chain.stage_names(), vec!["id_guard", "auth_gate"]);
    }

    #[test]
    fn test_stage_replacement_keeps_one_per_slot() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .stage(
                GlobalStage::Cors,
                OrderTrackingMiddleware {
                    name: "first",
                    order: order.clone(),
                },
            )
            .stage(
                GlobalStage::Cors,
                OrderTrackingMiddleware {
                    name: "second",
                    order,
                },
            )
            .build();
        assert_eq!(pipeline.stage_names(), vec!["second"]);
    }

    #[test]
    fn test_global_stage_order() {
        let names: Vec<_> = GlobalStage::all().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["request_id", "access_log", "cors", "body_parser", "session"]
        );
    }
}
