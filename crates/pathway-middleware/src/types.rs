//! Common types used throughout the middleware pipeline.
//!
//! Requests and responses carry fully-buffered `Full<Bytes>` bodies; the
//! server collects the body before the pipeline runs.

pub use pathway_core::{Body, Request, Response};
