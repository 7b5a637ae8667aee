//! # Pathway Core
//!
//! Foundational types shared by every stage of the Pathway request pipeline:
//!
//! - [`Envelope`] - The uniform success/error body written for every reply
//! - [`Fault`] - Closed taxonomy of failures a request can raise
//! - [`classify`] - Total mapping from a [`Fault`] to status, message and details
//! - [`ResourceId`] - 24-hex-digit document identifier
//! - [`RequestId`] - UUID v7 request identifier
//! - [`Principal`] - The authenticated user attached to a session

#![doc(html_root_url = "https://docs.rs/pathway-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod envelope;
mod fault;
mod ids;
mod types;

pub use envelope::Envelope;
pub use fault::{classify, count_fault, respond, ClassifiedFault, Fault, FaultKind, FaultResult, FieldFault};
pub use ids::{InvalidResourceId, Principal, RequestId, ResourceId};
pub use types::{Body, Request, Response};
