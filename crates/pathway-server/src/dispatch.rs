//! Router dispatch, the last global stage.
//!
//! Matches the request against the [`RouteTable`] and runs the route's
//! chain. Unmatched requests are answered here:
//!
//! - under an API prefix (`/api`, `/auth`) → `404` envelope
//! - other `GET`/`HEAD` → the frontend shell, when one is configured
//! - anything else → `404` envelope

use http::StatusCode;
use pathway_core::{respond, Envelope, Fault};
use pathway_middleware::{BoxFuture, Endpoint, MiddlewareContext, Request, RequestState, Response};
use serde_json::json;

use crate::routes::RouteTable;
use crate::static_files::{StaticFileError, StaticFiles};

const API_PREFIXES: [&str; 2] = ["/api", "/auth"];

/// Dispatches requests to route chains, falling back to the shell.
#[derive(Debug)]
pub struct Dispatcher {
    routes: RouteTable,
    shell: Option<StaticFiles>,
}

impl Dispatcher {
    /// Creates a dispatcher with no frontend shell.
    #[must_use]
    pub fn new(routes: RouteTable) -> Self {
        Self { routes, shell: None }
    }

    /// Serves unmatched browser requests from `shell`.
    #[must_use]
    pub fn with_shell(mut self, shell: StaticFiles) -> Self {
        self.shell = Some(shell);
        self
    }

    /// Returns the route table.
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    async fn fallback(&self, ctx: &MiddlewareContext) -> Response {
        let path = ctx.path();
        let is_api = API_PREFIXES
            .iter()
            .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")));

        if !is_api {
            if let Some(shell) = &self.shell {
                match shell.serve(path, ctx.method()).await {
                    Ok(response) => return response,
                    Err(StaticFileError::IoError(e)) => {
                        return respond(&Fault::unclassified_with_source("frontend shell unreadable", e))
                            .into_response();
                    }
                    Err(e) => {
                        tracing::debug!(request_id = %ctx.request_id(), path, reason = %e, "shell fallback declined");
                    }
                }
            }
        }

        not_found()
    }
}

/// The `404` envelope for unmatched requests.
#[must_use]
pub fn not_found() -> Response {
    Envelope::failure(StatusCode::NOT_FOUND, "Not Found", json!({})).into_response()
}

impl Endpoint for Dispatcher {
    fn call<'a>(&'a self, ctx: &'a mut MiddlewareContext, request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if let Err(e) = ctx.transition(RequestState::GloballyProcessed) {
                tracing::warn!(request_id = %ctx.request_id(), error = %e, "dispatch reached out of order");
            }

            let method = ctx.method().clone();
            let path = ctx.path().to_string();
            match self.routes.match_route(&method, &path) {
                Some(found) => {
                    ctx.set_params(found.params);
                    found.value.call(ctx, request).await
                }
                None => {
                    tracing::debug!(request_id = %ctx.request_id(), %method, path, "no route matched");
                    self.fallback(ctx).await
                }
            }
        })
    }
}
