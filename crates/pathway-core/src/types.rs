//! HTTP message aliases used across the pipeline.

use bytes::Bytes;
use http_body_util::Full;

/// Fully-buffered body type carried by requests and responses.
pub type Body = Full<Bytes>;

/// The request type flowing through the pipeline.
pub type Request = http::Request<Body>;

/// The response type produced by the pipeline.
pub type Response = http::Response<Body>;
