//! # Pathway Server
//!
//! Socket layer for the Pathway backend.
//!
//! - [`RouteTable`]: method + path → route chain
//! - [`Dispatcher`]: the last global stage; runs the matched chain or falls
//!   back to the frontend shell ([`StaticFiles`])
//! - [`Application`]: global pipeline plus dispatcher, independent of any
//!   socket
//! - [`Server`]: Hyper HTTP/1 with body limits and graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use pathway_server::{Application, Dispatcher, RouteTable, Server, ServerSettings};
//!
//! let app = Application::new(pipeline, Dispatcher::new(routes));
//! Server::new(app, ServerSettings::default()).run().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/pathway-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod dispatch;
mod error;
mod routes;
mod server;
mod shutdown;
mod static_files;

pub use app::Application;
pub use dispatch::{not_found, Dispatcher};
pub use error::ServerError;
pub use routes::RouteTable;
pub use server::{Server, ServerSettings};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use static_files::{StaticFileError, StaticFiles};
