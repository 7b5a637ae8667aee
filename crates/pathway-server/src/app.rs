//! The assembled application: global pipeline plus dispatcher.

use pathway_middleware::{MiddlewareContext, Pipeline, Request, Response};

use crate::dispatch::Dispatcher;

/// A fully assembled request handler, independent of any socket.
///
/// The HTTP server and the in-memory test client both drive requests
/// through [`Application::handle`].
#[derive(Debug)]
pub struct Application {
    pipeline: Pipeline,
    dispatcher: Dispatcher,
}

impl Application {
    /// Assembles the application.
    #[must_use]
    pub fn new(pipeline: Pipeline, dispatcher: Dispatcher) -> Self {
        tracing::info!(
            stages = ?pipeline.stage_names(),
            routes = dispatcher.routes().len(),
            "application assembled"
        );
        Self { pipeline, dispatcher }
    }

    /// Returns the global pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs one buffered request to its response.
    pub async fn handle(&self, request: Request) -> Response {
        self.handle_with_context(request).await.0
    }

    /// Like [`handle`](Self::handle), also returning the finished context.
    pub async fn handle_with_context(&self, request: Request) -> (Response, MiddlewareContext) {
        let mut ctx = MiddlewareContext::for_request(&request);
        let response = self.pipeline.process(&mut ctx, request, &self.dispatcher).await;
        if let Err(e) = ctx.mark_responded() {
            tracing::error!(request_id = %ctx.request_id(), error = %e, "refusing to write a second response");
        }
        (response, ctx)
    }
}
