//! Body parser.
//!
//! Buffers the request body and parses it into the context as a field map:
//!
//! - `application/json` must be a JSON object
//! - `application/x-www-form-urlencoded` becomes a map of strings
//! - an empty body, or any other content type, leaves the map empty
//!
//! A body that claims to be JSON but does not parse as an object is a
//! validation fault on `body`, answered before any route runs.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use pathway_core::Fault;
use serde_json::{Map, Value};

use crate::context::MiddlewareContext;
use crate::fault_wrapper::fault_response;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Body, Request, Response};

/// Parses JSON and urlencoded request bodies into the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyParserMiddleware;

impl BodyParserMiddleware {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Parses `bytes` according to `content_type`.
pub fn parse_body(content_type: Option<&str>, bytes: &[u8]) -> Result<Map<String, Value>, Fault> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Fault::invalid_field("body", "Request body must be a JSON object")),
            Err(_) => Err(Fault::invalid_field("body", "Malformed JSON body")),
        }
    } else if mime == "application/x-www-form-urlencoded" {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
            .map_err(|_| Fault::invalid_field("body", "Malformed form body"))?;
        Ok(pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect())
    } else {
        Ok(Map::new())
    }
}

impl Middleware for BodyParserMiddleware {
    fn name(&self) -> &'static str {
        "body_parser"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let bytes: Bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };

            let content_type = parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
            match parse_body(content_type, &bytes) {
                Ok(map) => ctx.set_body(map),
                Err(fault) => return fault_response(ctx, &fault),
            }

            next.run(ctx, Request::from_parts(parts, Body::new(bytes))).await
        })
    }
}
