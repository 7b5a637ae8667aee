//! # Pathway
//!
//! The Pathway learning-path backend: account, learning path, topic,
//! subscription and favorite routes served through the fixed request
//! pipeline.
//!
//! ```text
//! Request → RequestId → AccessLog → CORS → BodyParser → Session → Router
//!         → [IdGuard] → [Validator] → [AuthGate] → Controller
//! ```
//!
//! Controllers return `FaultResult<Reply>`; every fault is classified into
//! the standard `{status, success, message, error}` envelope.
//!
//! ## Assembly
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use pathway::{build_application, AppState};
//! use pathway_config::PathwayConfig;
//! use pathway_middleware::MemorySessionStore;
//! use pathway_store::MemoryStore;
//!
//! let config = PathwayConfig::default();
//! let store = MemoryStore::open();
//! let state = AppState::from_config(&config, &store)?;
//! let app = build_application(&config, state, Arc::new(MemorySessionStore::new()))?;
//! ```

#![doc(html_root_url = "https://docs.rs/pathway/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod controllers;
pub mod settings;

mod assembly;
mod error;
mod routes;
mod state;

pub use assembly::{build_application, pipeline};
pub use error::BuildError;
pub use routes::route_table;
pub use state::AppState;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
