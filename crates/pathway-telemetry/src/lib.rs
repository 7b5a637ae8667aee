//! Observability for Pathway.
//!
//! - **Logging**: structured `tracing` output, JSON in production and pretty
//!   text in development
//! - **Metrics**: Prometheus exposition of the counters the request pipeline
//!   emits
//!
//! # Example
//!
//! ```rust,ignore
//! use pathway_telemetry::{init_logging, init_metrics, LogConfig, MetricsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pathway_telemetry::TelemetryError> {
//!     init_logging(&LogConfig::production())?;
//!     init_metrics(&MetricsConfig {
//!         enabled: true,
//!         ..Default::default()
//!     })?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/pathway-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use self::error::TelemetryError;
pub use self::logging::{create_env_filter, init_logging, LogConfig};
pub use self::metrics::{init_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
