//! Global middleware stages.
//!
//! 1. [`request_id`] - Generate/propagate request ID
//! 2. [`access_log`] - Structured access log and request metrics
//! 3. [`cors`] - Preflight handling and CORS response headers
//! 4. [`body`] - JSON / urlencoded body parsing
//! 5. [`crate::session`] - Session restoration and flash messages

pub mod access_log;
pub mod body;
pub mod cors;
pub mod request_id;

pub use access_log::AccessLogMiddleware;
pub use body::BodyParserMiddleware;
pub use cors::{AllowedOrigins, CorsBuilder, CorsMiddleware};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
