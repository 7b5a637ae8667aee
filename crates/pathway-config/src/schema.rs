//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// # Example
///
/// ```
/// use pathway_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.static_dir, "public/build");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:3000").
    pub http_addr: String,

    /// Graceful shutdown drain timeout in seconds.
    pub shutdown_timeout_secs: u64,

    /// Largest accepted request body in bytes.
    pub body_limit_bytes: usize,

    /// Directory holding the built frontend shell.
    pub static_dir: String,

    /// Accept an incoming `x-request-id` instead of minting one.
    pub trust_request_id: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:3000".to_string(),
            shutdown_timeout_secs: 30,
            body_limit_bytes: 1024 * 1024,
            static_dir: "public/build".to_string(),
            trust_request_id: false,
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct SessionConfig {
    /// Cookie carrying the session id.
    pub cookie_name: String,

    /// Idle lifetime of a session in seconds.
    pub max_age_secs: u64,

    /// Mark the cookie `Secure`.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "pathway.sid".to_string(),
            max_age_secs: 24 * 60 * 60,
            secure: false,
        }
    }
}

/// Cross-origin settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct CorsConfig {
    /// Origins allowed to call the API.
    pub allowed_origins: Vec<String>,

    /// Send `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
            allow_credentials: true,
            max_age_secs: 600,
        }
    }
}

/// Google sign-in client settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GoogleSection {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Callback URL registered with Google.
    pub redirect_url: String,
}

impl std::fmt::Debug for GoogleSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSection")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Identity settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct AuthConfig {
    /// Bcrypt work factor.
    pub bcrypt_cost: u32,

    /// Google sign-in. Absent disables the `/auth/google` routes.
    pub google: Option<GoogleSection>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: 12,
            google: None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Log level or filter directive (e.g. `info`, `pathway=debug`).
    pub level: String,

    /// Log output format.
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            ansi: false,
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct MetricsConfig {
    /// Serve `/metrics` on a separate listener.
    pub enabled: bool,

    /// Exporter bind address.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, "0.0.0.0:3000");
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert_eq!(config.static_dir, "public/build");
        assert!(!config.trust_request_id);
    }

    #[test]
    fn test_server_config_deserialize() {
        let toml = r#"
            http_addr = "127.0.0.1:4000"
            shutdown_timeout_secs = 5
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:4000");
        assert_eq!(config.shutdown_timeout_secs, 5);
        assert_eq!(config.body_limit_bytes, 1024 * 1024);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            cookie_name = "sid"
            same_site = "strict"
        "#;
        let result: Result<SessionConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_cors_defaults_allow_frontend_with_credentials() {
        let config = CorsConfig::default();
        assert_eq!(config.allowed_origins, vec!["http://localhost:3001"]);
        assert!(config.allow_credentials);
    }

    #[test]
    fn test_google_section_debug_hides_secret() {
        let google = GoogleSection {
            client_id: "id".into(),
            client_secret: "shh".into(),
            redirect_url: "http://localhost/cb".into(),
        };
        assert!(!format!("{google:?}").contains("shh"));
    }

    #[test]
    fn test_log_format_deserialize() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert!(serde_json::from_str::<LogFormat>(r#""xml""#).is_err());
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert_eq!(config.bcrypt_cost, 12);
        assert!(config.google.is_none());
    }
}
