//! Errors raised while assembling a [`PathwayConfig`](crate::PathwayConfig).

use std::path::PathBuf;
use thiserror::Error;

/// A configuration source could not be read, parsed or accepted.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `with_file` was given a path that does not exist.
    #[error("no configuration at {path}")]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read {path}")]
    ReadError {
        /// Requested path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Only `.toml` and `.json` sources are understood.
    #[error("unsupported configuration format: {0} (expected toml or json)")]
    UnsupportedFormat(String),

    /// Malformed TOML.
    #[error("bad TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, from a file or a JSON-valued environment variable.
    #[error("bad JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value the server cannot start with.
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `auth.bcrypt_cost`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A field that becomes mandatory in context is empty.
    #[error("{field} is required")]
    MissingField {
        /// Dotted field path.
        field: String,
    },

    /// A `PATHWAY__*` variable names no field or carries a bad value.
    #[error("environment variable {var}: {reason}")]
    EnvParseError {
        /// Variable name as found in the environment.
        var: String,
        /// What went wrong.
        reason: String,
    },

    /// Cross-field consistency check failed.
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_field() {
        let err = ConfigError::invalid_value("auth.bcrypt_cost", "must be between 4 and 31");
        assert_eq!(err.to_string(), "auth.bcrypt_cost: must be between 4 and 31");

        let err = ConfigError::missing_field("auth.google.client_secret");
        assert_eq!(err.to_string(), "auth.google.client_secret is required");
    }

    #[test]
    fn test_env_errors_name_the_variable() {
        let err = ConfigError::env_parse_error("PATHWAY__SESSION__MAX_AGE_SECS", "expected integer");
        assert_eq!(
            err.to_string(),
            "environment variable PATHWAY__SESSION__MAX_AGE_SECS: expected integer"
        );
    }

    #[test]
    fn test_read_error_keeps_its_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::read_error("/etc/pathway.toml", io);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/etc/pathway.toml"));
    }
}
