//! Server errors.

use pathway_router::RouteConflict;
use thiserror::Error;

/// Errors raised while assembling or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address does not parse.
    #[error("invalid listen address `{0}`")]
    InvalidAddress(String),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Two routes were registered for the same method and path.
    #[error(transparent)]
    Route(#[from] RouteConflict),
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_route_conflict_display() {
        let err: ServerError = RouteConflict::Duplicate {
            method: Method::PUT,
            path: "/api/topic/:id".into(),
        }
        .into();
        assert_eq!(err.to_string(), "PUT /api/topic/:id is already registered");
    }

    #[test]
    fn test_bind_error_display() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:80".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("failed to bind 0.0.0.0:80"));
    }
}
