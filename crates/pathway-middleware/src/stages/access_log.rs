//! Access log and request metrics.
//!
//! Emits one structured `info` line per request once the response is known,
//! and records:
//!
//! - `pathway_requests_total{method,status}` - request counter
//! - `pathway_request_duration_seconds{method}` - latency histogram

use std::time::Instant;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Request counter metric name.
pub const REQUESTS_TOTAL: &str = "pathway_requests_total";

/// Request latency metric name.
pub const REQUEST_DURATION_SECONDS: &str = "pathway_request_duration_seconds";

/// Logs and measures every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogMiddleware;

impl AccessLogMiddleware {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let start = Instant::now();
            let method = request.method().to_string();
            let path = request.uri().path().to_string();

            let response = next.run(ctx, request).await;

            let elapsed = start.elapsed();
            let status = response.status().as_u16();

            metrics::counter!(REQUESTS_TOTAL, "method" => method.clone(), "status" => status.to_string())
                .increment(1);
            metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => method.clone())
                .record(elapsed.as_secs_f64());

            tracing::info!(
                request_id = %ctx.request_id(),
                method = %method,
                path = %path,
                status,
                duration_ms = elapsed.as_secs_f64() * 1000.0,
                user = ctx.principal().map(|p| p.username.as_str()),
                "request completed"
            );

            response
        })
    }
}
