//! Typed configuration for the Pathway server.
//!
//! - TOML and JSON configuration files
//! - `.env` files and environment variable overrides
//! - Strict validation (unknown fields are errors)
//! - Layered loading (defaults → file → env)
//!
//! # Overview
//!
//! [`PathwayConfig`] holds one section per concern:
//!
//! - [`ServerConfig`] - bind address, drain timeout, body limit, frontend shell
//! - [`SessionConfig`] - session cookie
//! - [`CorsConfig`] - allowed origins
//! - [`AuthConfig`] - bcrypt cost and optional Google sign-in
//! - [`LoggingConfig`] / [`MetricsConfig`] - observability
//!
//! # Example
//!
//! ```no_run
//! use pathway_config::ConfigLoader;
//!
//! # fn main() -> Result<(), pathway_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("pathway.toml")?
//!     .with_dotenv()
//!     .with_env_prefix("PATHWAY")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:3000"
//! shutdown_timeout_secs = 30
//! static_dir = "public/build"
//!
//! [cors]
//! allowed_origins = ["http://localhost:3001"]
//! allow_credentials = true
//!
//! [auth]
//! bcrypt_cost = 12
//!
//! [auth.google]
//! client_id = "…apps.googleusercontent.com"
//! client_secret = "…"
//! redirect_url = "http://localhost:3000/auth/google/callback"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Any value can be overridden with `PATHWAY__SECTION__KEY`. Values are read
//! as JSON when they parse, so lists and booleans work:
//!
//! - `PATHWAY__SERVER__HTTP_ADDR=0.0.0.0:8000`
//! - `PATHWAY__METRICS__ENABLED=true`
//! - `PATHWAY__CORS__ALLOWED_ORIGINS=["https://pathway.dev"]`

#![doc(html_root_url = "https://docs.rs/pathway-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::PathwayConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
