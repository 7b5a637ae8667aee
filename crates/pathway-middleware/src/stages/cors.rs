//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! The browser frontend runs on its own origin and sends the session cookie
//! with every call, so the API answers preflights itself and decorates
//! allowed cross-origin responses.
//!
//! ## Preflight Requests
//!
//! An `OPTIONS` request carrying `Origin` and `Access-Control-Request-Method`
//! is answered here with `204 No Content` and never reaches a route. A
//! preflight from a disallowed origin, or asking for a disallowed method or
//! header, gets a `403` envelope.
//!
//! ## Example
//!
//! ```
//! use pathway_middleware::stages::CorsMiddleware;
//! use std::time::Duration;
//!
//! let cors = CorsMiddleware::builder()
//!     .allow_origin("http://localhost:3001")
//!     .allow_credentials(true)
//!     .max_age(Duration::from_secs(600))
//!     .build();
//! ```

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use pathway_core::Envelope;
use serde_json::json;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Body, Request, Response};

/// The set of allowed origins.
#[derive(Debug, Clone)]
pub enum AllowedOrigins {
    /// Allow any origin (wildcard `*`).
    Any,
    /// Allow specific origins.
    List(HashSet<String>),
}

impl AllowedOrigins {
    /// Checks if an origin is allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(origins) => origins.contains(origin),
        }
    }

    /// Returns the `Access-Control-Allow-Origin` value for an origin.
    ///
    /// With credentials the browser rejects `*`, so the request origin is
    /// echoed instead.
    fn header_value(&self, origin: &str, credentials: bool) -> Option<HeaderValue> {
        match self {
            Self::Any if !credentials => Some(HeaderValue::from_static("*")),
            _ if self.is_allowed(origin) => HeaderValue::from_str(origin).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CorsConfig {
    allowed_origins: AllowedOrigins,
    allowed_methods: Vec<Method>,
    allowed_headers: HashSet<String>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::List(HashSet::new()),
            allowed_methods: vec![
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ],
            allowed_headers: HashSet::from([
                "content-type".to_string(),
                "authorization".to_string(),
                "x-request-id".to_string(),
            ]),
            allow_credentials: false,
            max_age: Some(Duration::from_secs(86400)),
        }
    }
}

/// Builder for [`CorsMiddleware`].
#[derive(Debug, Clone, Default)]
pub struct CorsBuilder {
    config: CorsConfig,
}

impl CorsBuilder {
    /// Creates a builder that allows no origins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows any origin.
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.config.allowed_origins = AllowedOrigins::Any;
        self
    }

    /// Adds an allowed origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        if let AllowedOrigins::List(origins) = &mut self.config.allowed_origins {
            origins.insert(origin.into());
        }
        self
    }

    /// Sets the allowed origins. `*` in the list allows any origin.
    #[must_use]
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: HashSet<String> = origins.into_iter().map(Into::into).collect();
        self.config.allowed_origins = if origins.contains("*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        };
        self
    }

    /// Sets the allowed HTTP methods.
    #[must_use]
    pub fn allow_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.config.allowed_methods = methods.into_iter().collect();
        self
    }

    /// Sets the allowed request headers.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_headers = headers.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    /// Sets whether cookies may be sent cross-origin.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.config.allow_credentials = allow;
        self
    }

    /// Sets how long browsers may cache a preflight answer.
    #[must_use]
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.config.max_age = Some(duration);
        self
    }

    /// Builds the CORS middleware.
    #[must_use]
    pub fn build(self) -> CorsMiddleware {
        CorsMiddleware { config: self.config }
    }
}

/// CORS middleware that handles preflight requests and adds CORS headers.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    /// Creates a new CORS builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    fn is_preflight(request: &Request) -> bool {
        request.method() == Method::OPTIONS
            && request.headers().contains_key(header::ORIGIN)
            && request.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
    }

    fn origin(request: &Request) -> Option<&str> {
        request.headers().get(header::ORIGIN).and_then(|v| v.to_str().ok())
    }

    fn handle_preflight(&self, ctx: &MiddlewareContext, request: &Request) -> Response {
        let Some(origin) = Self::origin(request) else {
            return self.forbidden(ctx, "Missing Origin header");
        };
        if !self.config.allowed_origins.is_allowed(origin) {
            return self.forbidden(ctx, "Origin not allowed");
        }

        let requested_method = request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|v| v.to_str().ok())
            .and_then(|m| m.parse::<Method>().ok());
        if let Some(method) = requested_method {
            if !self.config.allowed_methods.contains(&method) {
                return self.forbidden(ctx, "Method not allowed");
            }
        }

        if let Some(requested) = request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .and_then(|v| v.to_str().ok())
        {
            if !self.config.allowed_headers.contains("*") {
                for header in requested.split(',').map(|h| h.trim().to_lowercase()) {
                    if !header.is_empty() && !self.config.allowed_headers.contains(&header) {
                        return self.forbidden(ctx, "Header not allowed");
                    }
                }
            }
        }

        self.preflight_response(origin)
    }

    fn preflight_response(&self, origin: &str) -> Response {
        let mut response = Response::new(Body::new(Bytes::new()));
        *response.status_mut() = StatusCode::NO_CONTENT;
        self.add_cors_headers(&mut response, origin);

        let headers = response.headers_mut();
        let methods: Vec<&str> = self.config.allowed_methods.iter().map(Method::as_str).collect();
        if let Ok(value) = HeaderValue::from_str(&methods.join(", ")) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
        }

        let mut allowed: Vec<&str> = self.config.allowed_headers.iter().map(String::as_str).collect();
        allowed.sort_unstable();
        if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
        }

        if let Some(max_age) = self.config.max_age {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age.as_secs()));
        }

        headers.insert(
            header::VARY,
            HeaderValue::from_static("Origin, Access-Control-Request-Method, Access-Control-Request-Headers"),
        );
        response
    }

    fn forbidden(&self, ctx: &MiddlewareContext, reason: &str) -> Response {
        tracing::warn!(request_id = %ctx.request_id(), reason, "CORS preflight rejected");
        Envelope::failure(StatusCode::FORBIDDEN, "Forbidden", json!({ "cors": reason })).into_response()
    }

    fn add_cors_headers(&self, response: &mut Response, origin: &str) {
        let headers = response.headers_mut();
        if let Some(value) = self
            .config
            .allowed_origins
            .header_value(origin, self.config.allow_credentials)
        {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if self.config.allow_credentials {
            headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if Self::is_preflight(&request) {
                return self.handle_preflight(ctx, &request);
            }

            let origin = Self::origin(&request).map(String::from);
            let mut response = next.run(ctx, request).await;

            if let Some(ref origin) = origin {
                if self.config.allowed_origins.is_allowed(origin) {
                    self.add_cors_headers(&mut response, origin);
                }
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request as HttpRequest;
    use http_body_util::Full;

    const FRONTEND: &str = "http://localhost:3001";

    fn cors() -> CorsMiddleware {
        CorsMiddleware::builder()
            .allow_origin(FRONTEND)
            .allow_credentials(true)
            .build()
    }

    fn simple_request(method: Method, origin: &str) -> Request {
        HttpRequest::builder()
            .method(method)
            .uri("/api/path")
            .header(header::ORIGIN, origin)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn preflight(origin: &str, method: &str, request_headers: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder()
            .method(Method::OPTIONS)
            .uri("/api/path")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, method);
        if let Some(h) = request_headers {
            builder = builder.header(header::ACCESS_CONTROL_REQUEST_HEADERS, h);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn ok() -> impl FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> {
        |_ctx, _req| {
            Box::pin(async {
                http::Response::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::from("OK")))
                    .unwrap()
            })
        }
    }

    #[tokio::test]
    async fn test_preflight_allowed() {
        let mut ctx = MiddlewareContext::new();
        let request = preflight(FRONTEND, "PUT", Some("Content-Type"));

        let response = cors().process(&mut ctx, request, Next::handler(ok())).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), FRONTEND);
        assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("PUT"));
        assert_eq!(response.headers().get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "86400");
    }

    #[tokio::test]
    async fn test_preflight_disallowed_origin() {
        let mut ctx = MiddlewareContext::new();
        let request = preflight("https://evil.example", "GET", None);

        let response = cors().process(&mut ctx, request, Next::handler(ok())).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_preflight_disallowed_header() {
        let mut ctx = MiddlewareContext::new();
        let request = preflight(FRONTEND, "POST", Some("x-secret"));

        let response = cors().process(&mut ctx, request, Next::handler(ok())).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_simple_request_gets_headers() {
        let mut ctx = MiddlewareContext::new();
        let request = simple_request(Method::GET, FRONTEND);

        let response = cors().process(&mut ctx, request, Next::handler(ok())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), FRONTEND);
        assert_eq!(response.headers().get(header::VARY).unwrap(), "Origin");
    }

    #[tokio::test]
    async fn test_simple_request_from_other_origin_is_untouched() {
        let mut ctx = MiddlewareContext::new();
        let request = simple_request(Method::GET, "https://evil.example");

        let response = cors().process(&mut ctx, request, Next::handler(ok())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_any_origin_with_credentials_echoes_origin() {
        let middleware = CorsMiddleware::builder()
            .allow_origins(["*"])
            .allow_credentials(true)
            .build();
        let mut ctx = MiddlewareContext::new();
        let request = simple_request(Method::GET, "https://anywhere.example");

        let response = middleware.process(&mut ctx, request, Next::handler(ok())).await;

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://anywhere.example"
        );
    }
}
