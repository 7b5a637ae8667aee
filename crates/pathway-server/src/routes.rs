//! Route table.
//!
//! Every route is a (method, path pattern) pair bound to a [`RouteChain`].
//! Registering the same pair twice is an assembly error, reported before the
//! server accepts a single connection.

use http::Method;
use pathway_middleware::RouteChain;
use pathway_router::{RouteConflict, RouteMatch, Router};

/// The application's routes.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use http::Method;
/// use bytes::Bytes;
/// use pathway_middleware::{Body, BoxFuture, Endpoint, MiddlewareContext, Request, Response, RouteChain};
/// use pathway_server::RouteTable;
///
/// struct Ping;
///
/// impl Endpoint for Ping {
///     fn call<'a>(&'a self, _: &'a mut MiddlewareContext, _: Request) -> BoxFuture<'a, Response> {
///         Box::pin(async { Response::new(Body::new(Bytes::new())) })
///     }
/// }
///
/// let mut routes = RouteTable::new();
/// routes.add(Method::GET, "/api/ping", RouteChain::new(Arc::new(Ping))).unwrap();
/// assert!(routes.add(Method::GET, "/api/ping", RouteChain::new(Arc::new(Ping))).is_err());
/// ```
#[derive(Debug, Default)]
pub struct RouteTable {
    router: Router<RouteChain>,
    registered: Vec<(Method, String)>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    pub fn add(&mut self, method: Method, path: &str, chain: RouteChain) -> Result<(), RouteConflict> {
        let stages = chain.stage_names();
        self.router.insert(method.clone(), path, chain)?;
        tracing::debug!(%method, path, ?stages, "route registered");
        self.registered.push((method, path.to_string()));
        Ok(())
    }

    /// Registers a route, builder style.
    pub fn route(mut self, method: Method, path: &str, chain: RouteChain) -> Result<Self, RouteConflict> {
        self.add(method, path, chain)?;
        Ok(self)
    }

    /// Finds the chain for a concrete request path.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, RouteChain>> {
        self.router.match_route(method, path)
    }

    /// Registered (method, pattern) pairs in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.registered.iter().map(|(m, p)| (m, p.as_str()))
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}
