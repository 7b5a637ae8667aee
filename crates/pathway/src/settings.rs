//! Maps configuration sections onto component settings.

use std::time::Duration;

use pathway_config::{LogFormat, LoggingConfig, MetricsConfig, ServerConfig, SessionConfig};
use pathway_middleware::SessionSettings;
use pathway_server::ServerSettings;
use pathway_telemetry::LogConfig;

/// Socket settings for the server.
#[must_use]
pub fn server_settings(config: &ServerConfig) -> ServerSettings {
    ServerSettings {
        http_addr: config.http_addr.clone(),
        shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        body_limit: config.body_limit_bytes,
    }
}

/// Cookie settings for the session stage.
#[must_use]
pub fn session_settings(config: &SessionConfig) -> SessionSettings {
    SessionSettings {
        cookie_name: config.cookie_name.clone(),
        max_age: Duration::from_secs(config.max_age_secs),
        secure: config.secure,
    }
}

/// Subscriber settings for the log output.
#[must_use]
pub fn log_config(config: &LoggingConfig) -> LogConfig {
    let base = match config.format {
        LogFormat::Json => LogConfig::production(),
        LogFormat::Pretty => LogConfig::development(),
    };
    LogConfig {
        level: config.level.clone(),
        ansi: config.ansi,
        ..base
    }
}

/// Exporter settings; histogram buckets keep their defaults.
#[must_use]
pub fn metrics_config(config: &MetricsConfig) -> pathway_telemetry::MetricsConfig {
    pathway_telemetry::MetricsConfig {
        enabled: config.enabled,
        addr: config.addr.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathway_config::PathwayConfig;

    #[test]
    fn test_defaults_map_through() {
        let config = PathwayConfig::default();

        let server = server_settings(&config.server);
        assert_eq!(server.http_addr, "0.0.0.0:3000");
        assert_eq!(server.shutdown_timeout, Duration::from_secs(config.server.shutdown_timeout_secs));

        let session = session_settings(&config.session);
        assert_eq!(session.cookie_name, config.session.cookie_name);

        assert!(!metrics_config(&config.metrics).enabled);
    }

    #[test]
    fn test_log_format_selects_output() {
        let pretty = log_config(&LoggingConfig {
            level: "pathway=debug".into(),
            format: LogFormat::Pretty,
            ansi: true,
        });
        assert!(!pretty.json_format);
        assert!(pretty.ansi);
        assert_eq!(pretty.level, "pathway=debug");

        let json = log_config(&LoggingConfig::default());
        assert!(json.json_format);
        assert_eq!(json.level, "info");
    }
}
