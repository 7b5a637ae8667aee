//! The top-level [`PathwayConfig`] struct.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{
    AuthConfig, ConfigError, CorsConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig,
    SessionConfig,
};

/// Complete Pathway server configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use pathway_config::PathwayConfig;
///
/// let config = PathwayConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:3000");
/// assert_eq!(config.auth.bcrypt_cost, 12);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct PathwayConfig {
    /// HTTP server.
    pub server: ServerConfig,

    /// Session cookie.
    pub session: SessionConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Password hashing and third-party sign-in.
    pub auth: AuthConfig,

    /// Log output.
    pub logging: LoggingConfig,

    /// Prometheus exporter.
    pub metrics: MetricsConfig,
}

impl PathwayConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if:
    /// - the server or (enabled) metrics address is not a socket address
    /// - the bcrypt cost is outside `4..=31`
    /// - the body limit or session lifetime is zero
    /// - a CORS origin is empty or `*` while credentials are allowed
    /// - the Google section has an empty field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.metrics.enabled && self.metrics.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.body_limit_bytes",
                "must be greater than zero",
            ));
        }

        if self.session.max_age_secs == 0 {
            return Err(ConfigError::invalid_value(
                "session.max_age_secs",
                "must be greater than zero",
            ));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::invalid_value(
                "auth.bcrypt_cost",
                "must be between 4 and 31",
            ));
        }

        for origin in &self.cors.allowed_origins {
            if origin.is_empty() {
                return Err(ConfigError::invalid_value(
                    "cors.allowed_origins",
                    "origins must not be empty",
                ));
            }
            if origin == "*" && self.cors.allow_credentials {
                return Err(ConfigError::inconsistent(
                    "cors.allowed_origins cannot contain '*' when cors.allow_credentials is true",
                ));
            }
        }

        if let Some(google) = &self.auth.google {
            let fields = [
                ("auth.google.client_id", &google.client_id),
                ("auth.google.client_secret", &google.client_secret),
                ("auth.google.redirect_url", &google.redirect_url),
            ];
            for (field, value) in fields {
                if value.is_empty() {
                    return Err(ConfigError::missing_field(field));
                }
            }
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs with colors.
    ///
    /// # Example
    ///
    /// ```
    /// use pathway_config::{LogFormat, PathwayConfig};
    ///
    /// let config = PathwayConfig::development();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi = true;
        config
    }

    /// Production preset: JSON logs, secure cookies and the exporter on.
    ///
    /// # Example
    ///
    /// ```
    /// use pathway_config::PathwayConfig;
    ///
    /// let config = PathwayConfig::production();
    /// assert!(config.session.secure);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi = false;
        config.session.secure = true;
        config.metrics.enabled = true;
        config
    }
}
