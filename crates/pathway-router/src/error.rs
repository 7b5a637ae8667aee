//! Route registration errors.

use http::Method;
use thiserror::Error;

/// A route could not be registered because it clashes with the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteConflict {
    /// The same method and path pattern were registered twice.
    #[error("{method} {path} is already registered")]
    Duplicate {
        /// The HTTP method.
        method: Method,
        /// The path pattern.
        path: String,
    },

    /// Two patterns name the same parameter position differently.
    #[error("parameter `:{new}` in {path} conflicts with existing `:{existing}`")]
    ParamName {
        /// The path pattern being registered.
        path: String,
        /// The name already registered at this position.
        existing: String,
        /// The name in the new pattern.
        new: String,
    },

    /// A wildcard segment was followed by more segments.
    #[error("wildcard must be the last segment in {path}")]
    WildcardNotLast {
        /// The path pattern being registered.
        path: String,
    },
}
