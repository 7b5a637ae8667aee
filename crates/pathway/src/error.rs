//! Errors raised while assembling the application.

use pathway_auth::AuthError;
use pathway_router::RouteConflict;
use thiserror::Error;

/// Assembly failures. All of them happen before the server binds.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Two routes share a method and path.
    #[error(transparent)]
    Route(#[from] RouteConflict),

    /// The identity layer could not be configured.
    #[error("identity setup failed: {0}")]
    Auth(#[from] AuthError),
}
