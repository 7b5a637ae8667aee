//! Pathway server entry point.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pathway::settings::{log_config, metrics_config, server_settings};
use pathway::{build_application, AppState};
use pathway_config::ConfigLoader;
use pathway_middleware::MemorySessionStore;
use pathway_server::{Server, ShutdownSignal};
use pathway_store::MemoryStore;
use pathway_telemetry::{init_logging, init_metrics};
use tracing::{debug, info};

const DEFAULT_CONFIG: &str = "pathway.toml";
const SESSION_SWEEP: Duration = Duration::from_secs(60);

/// Command-line arguments.
struct Args {
    /// Path to the configuration file.
    config: PathBuf,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = std::env::var_os("PATHWAY_CONFIG")
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    if let Some(path) = args.next() {
                        config = PathBuf::from(path);
                    }
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("pathway {}", pathway::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"Pathway - learning path backend

USAGE:
    pathway [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Configuration file, TOML or JSON (default: pathway.toml)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    PATHWAY_CONFIG                     Configuration file path
    PATHWAY__SERVER__HTTP_ADDR         Listen address (default: 0.0.0.0:3000)
    PATHWAY__SERVER__STATIC_DIR        Frontend build directory (default: public/build)
    PATHWAY__CORS__ALLOWED_ORIGINS     JSON list of allowed origins
    PATHWAY__AUTH__BCRYPT_COST         bcrypt cost (default: 12)
    PATHWAY__LOGGING__LEVEL            Log filter (RUST_LOG takes precedence)
    PATHWAY__METRICS__ENABLED          Serve Prometheus metrics

A .env file in the working directory is read before the environment.
"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new()
        .with_defaults()
        .with_optional_file(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?
        .with_dotenv()
        .with_env_prefix("PATHWAY")
        .load()
        .context("invalid configuration")?;

    init_logging(&log_config(&config.logging)).context("failed to initialize logging")?;
    init_metrics(&metrics_config(&config.metrics)).context("failed to initialize metrics")?;
    info!(version = pathway::VERSION, config = %args.config.display(), "starting pathway");

    let store = MemoryStore::open();
    let sessions = Arc::new(MemorySessionStore::new());
    let sweeper = {
        let sessions = Arc::clone(&sessions);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_SWEEP);
            loop {
                interval.tick().await;
                let purged = sessions.purge_expired();
                if purged > 0 {
                    debug!(purged, "expired sessions removed");
                }
            }
        })
    };

    let state = AppState::from_config(&config, &store)?;
    let app = build_application(&config, state, sessions)?;
    let result = Server::new(app, server_settings(&config.server))
        .run_with_shutdown(ShutdownSignal::with_os_signals())
        .await;

    sweeper.abort();
    store.close();
    info!("pathway stopped");

    result.context("server failed")
}
