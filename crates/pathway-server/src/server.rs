//! HTTP server.
//!
//! Hyper HTTP/1 over Tokio. Each connection is served on its own task;
//! each request body is buffered (up to the configured limit) and handed to
//! the [`Application`].
//!
//! On shutdown the accept loop stops, open connections finish their
//! in-flight request and close, and the server waits up to the drain
//! timeout for them.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use pathway_core::Envelope;
use pathway_middleware::Response;
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};

use crate::app::Application;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Socket-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Bind address, e.g. `0.0.0.0:3000`.
    pub http_addr: String,
    /// How long to wait for open connections after shutdown starts.
    pub shutdown_timeout: Duration,
    /// Largest accepted request body.
    pub body_limit: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:3000".to_string(),
            shutdown_timeout: Duration::from_secs(30),
            body_limit: 1024 * 1024,
        }
    }
}

/// The Pathway HTTP server.
///
/// # Example
///
/// ```rust,ignore
/// use pathway_server::{Server, ServerSettings};
///
/// let server = Server::new(app, ServerSettings::default());
/// server.run().await?;
/// ```
#[derive(Debug)]
pub struct Server {
    app: Arc<Application>,
    settings: ServerSettings,
}

impl Server {
    /// Creates a server for an assembled application.
    #[must_use]
    pub fn new(app: Application, settings: ServerSettings) -> Self {
        Self {
            app: Arc::new(app),
            settings,
        }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr: SocketAddr = self
            .settings
            .http_addr
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.settings.http_addr.clone()))?;
        TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
    }

    /// Binds and serves until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds and serves until `shutdown` is triggered.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// is triggered, then drains.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) {
        match listener.local_addr() {
            Ok(addr) => tracing::info!(%addr, "server listening"),
            Err(e) => tracing::warn!(error = %e, "server listening on unknown address"),
        }

        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let app = Arc::clone(&self.app);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        let body_limit = self.settings.body_limit;
                        tokio::spawn(async move {
                            serve_connection(app, stream, remote_addr, body_limit, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        let timeout = self.settings.shutdown_timeout;
        tracing::info!(
            ?timeout,
            open = tracker.active_connections(),
            "draining connections"
        );
        tokio::select! {
            () = tracker.drained() => tracing::info!("all connections closed"),
            () = tokio::time::sleep(timeout) => tracing::warn!(
                open = tracker.active_connections(),
                "drain timeout reached, dropping remaining connections"
            ),
        }

        tracing::info!("server stopped");
    }
}

async fn serve_connection(
    app: Arc<Application>,
    stream: TcpStream,
    remote_addr: SocketAddr,
    body_limit: usize,
    shutdown: ShutdownSignal,
) {
    let service = service_fn(move |request: http::Request<Incoming>| {
        let app = Arc::clone(&app);
        async move { Ok::<_, Infallible>(handle_request(&app, request, body_limit).await) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(%remote_addr, error = %e, "connection closed with error");
    }
}

/// Buffers the body (enforcing the limit) and runs the application.
async fn handle_request(app: &Application, request: http::Request<Incoming>, body_limit: usize) -> Response {
    let (parts, body) = request.into_parts();
    let bytes: Bytes = match Limited::new(body, body_limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!(method = %parts.method, path = parts.uri.path(), limit = body_limit, "request body too large");
            return Envelope::failure(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large", json!({})).into_response();
        }
        Err(e) => {
            tracing::warn!(method = %parts.method, path = parts.uri.path(), error = %e, "failed to read request body");
            return Envelope::failure(StatusCode::BAD_REQUEST, "Bad Request", json!({})).into_response();
        }
    };

    app.handle(http::Request::from_parts(parts, Full::new(bytes))).await
}
