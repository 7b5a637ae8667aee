//! Builds the [`Application`] from configuration.

use std::sync::Arc;
use std::time::Duration;

use pathway_config::{CorsConfig, PathwayConfig};
use pathway_middleware::stages::{AccessLogMiddleware, BodyParserMiddleware, CorsMiddleware, RequestIdMiddleware};
use pathway_middleware::{GlobalStage, Pipeline, SessionMiddleware, SessionStore};
use pathway_server::{Application, Dispatcher, StaticFiles};

use crate::error::BuildError;
use crate::routes::route_table;
use crate::settings::session_settings;
use crate::state::AppState;

fn cors(config: &CorsConfig) -> CorsMiddleware {
    let builder = CorsMiddleware::builder();
    let builder = if config.allowed_origins.iter().any(|origin| origin == "*") {
        builder.allow_any_origin()
    } else {
        builder.allow_origins(config.allowed_origins.iter().cloned())
    };
    builder
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs))
        .build()
}

/// The global stages in their fixed order.
#[must_use]
pub fn pipeline(config: &PathwayConfig, sessions: Arc<dyn SessionStore>) -> Pipeline {
    let request_id = if config.server.trust_request_id {
        RequestIdMiddleware::trust_incoming()
    } else {
        RequestIdMiddleware::new()
    };

    Pipeline::builder()
        .stage(GlobalStage::RequestId, request_id)
        .stage(GlobalStage::AccessLog, AccessLogMiddleware::new())
        .stage(GlobalStage::Cors, cors(&config.cors))
        .stage(GlobalStage::BodyParser, BodyParserMiddleware::new())
        .stage(
            GlobalStage::Session,
            SessionMiddleware::new(sessions, session_settings(&config.session)),
        )
        .build()
}

/// Assembles the pipeline, the route table and the frontend shell.
///
/// # Errors
///
/// Returns [`BuildError::Route`] if two routes collide.
pub fn build_application(
    config: &PathwayConfig,
    state: AppState,
    sessions: Arc<dyn SessionStore>,
) -> Result<Application, BuildError> {
    let routes = route_table(&Arc::new(state))?;
    let dispatcher = Dispatcher::new(routes).with_shell(StaticFiles::new(&config.server.static_dir));
    Ok(Application::new(pipeline(config, sessions), dispatcher))
}
