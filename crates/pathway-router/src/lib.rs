//! Radix tree router for Pathway.
//!
//! Routes are written express-style (`/api/path/:id`, `/assets/*rest`) and
//! map an HTTP method plus path pattern to a value of any type, typically the
//! per-route handler chain.
//!
//! Registering the same method and pattern twice is an error rather than a
//! silent shadow, so an accidental second handler is caught when the route
//! table is built.
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use pathway_router::Router;
//!
//! let mut router = Router::new();
//! router.insert(Method::GET, "/api/path", "listPaths").unwrap();
//! router.insert(Method::GET, "/api/path/:id", "getPath").unwrap();
//! assert!(router.insert(Method::GET, "/api/path/:id", "again").is_err());
//!
//! let found = router.match_route(&Method::GET, "/api/path/65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
//! assert_eq!(*found.value, "getPath");
//! assert_eq!(found.params.get("id"), Some("65a1f0c2e4b0a1b2c3d4e5f6"));
//! ```
//!
//! # Priority
//!
//! Static segments beat `:param` segments, which beat `*wildcard` segments.
//! The matcher backtracks, so `/auth/user` and `/auth/:section/:id` coexist.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod node;
mod params;

use http::Method;

pub use error::RouteConflict;
pub use params::Params;

use node::Node;

/// A matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the route.
    pub value: &'a T,
    /// Captured path parameters.
    pub params: Params,
}

/// Method + path router backed by a radix tree.
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    route_count: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Registers `value` for `method` at `path`.
    pub fn insert(&mut self, method: Method, path: &str, value: T) -> Result<(), RouteConflict> {
        self.root.insert(path, method, value)?;
        self.route_count += 1;
        Ok(())
    }

    /// Finds the value registered for `method` at a concrete `path`.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let (node, params) = self.root.find(path)?;
        let value = node.endpoint(method)?;
        Some(RouteMatch { value, params })
    }

    /// Returns the methods registered at `path`, or an empty list when the
    /// path matches nothing.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.root
            .find(path)
            .map(|(node, _)| node.methods().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of registered (method, path) pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
