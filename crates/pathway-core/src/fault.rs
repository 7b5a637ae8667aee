//! Fault taxonomy and classification.
//!
//! Every layer that can fail a request produces a [`Fault`]. Faults are a
//! closed set of variants, so turning one into an HTTP reply is a total
//! `match` in [`classify`]:
//!
//! | Variant | Status | Message | Details |
//! |---|---|---|---|
//! | `Validation` | 400 | `Validation Error` | `{field: message}` |
//! | `MalformedIdentifier` | 400 | `Invalid Data` | `{field: message}` |
//! | `DuplicateEntry` | 409 | `Duplicate Entry` | conflicting key/value map |
//! | `AuthToken` | 401 | `Authentication Error` | `{}` |
//! | `Unauthorized` | 401 | own message or `Unauthorized` | `{}` |
//! | `NotFound` | 404 | `Not Found` | `{resource}` |
//! | `Unclassified` | 500 | `Internal Server Error` | `{}` |

use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::envelope::Envelope;

/// Result alias for operations that fail with a [`Fault`].
pub type FaultResult<T> = Result<T, Fault>;

/// One field-level failure inside a validation fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFault {
    /// The offending field.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl FieldFault {
    /// Creates a field fault.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A failure raised while handling a request.
#[derive(Error, Debug)]
pub enum Fault {
    /// Schema or field validation failed.
    #[error("validation failed on {} field(s)", .fields.len())]
    Validation {
        /// Per-field sub-errors, in the order they were detected.
        fields: Vec<FieldFault>,
    },

    /// An identifier did not have the shape of a resource id.
    #[error("malformed identifier in `{field}`: {message}")]
    MalformedIdentifier {
        /// Where the identifier came from (`id`, `path`, ...).
        field: String,
        /// Human-readable reason.
        message: String,
    },

    /// A uniqueness constraint was violated.
    #[error("duplicate entry: {:?}", .key_value)]
    DuplicateEntry {
        /// The conflicting key/value pairs.
        key_value: Map<String, Value>,
    },

    /// A credential token was malformed, expired or rejected.
    #[error("credential token rejected: {reason}")]
    AuthToken {
        /// Diagnostic reason. Logged, never sent to the client.
        reason: String,
    },

    /// The caller is not allowed to perform this request.
    #[error("unauthorized: {}", .message.as_deref().unwrap_or("Unauthorized"))]
    Unauthorized {
        /// Message shown to the client. `None` means "Unauthorized".
        message: Option<String>,
    },

    /// A well-formed identifier named no document.
    #[error("{resource} not found")]
    NotFound {
        /// The kind of resource that was looked up.
        resource: String,
    },

    /// Anything else.
    #[error("unclassified fault: {message}")]
    Unclassified {
        /// Diagnostic message. Logged, never sent to the client.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl Fault {
    /// Creates a validation fault from field sub-errors.
    #[must_use]
    pub fn validation(fields: Vec<FieldFault>) -> Self {
        Self::Validation { fields }
    }

    /// Creates a validation fault for a single field.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![FieldFault::new(field, message)],
        }
    }

    /// Creates a malformed-identifier fault.
    #[must_use]
    pub fn malformed_id(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a duplicate-entry fault for one conflicting key.
    #[must_use]
    pub fn duplicate(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut key_value = Map::new();
        key_value.insert(key.into(), value.into());
        Self::DuplicateEntry { key_value }
    }

    /// Creates a credential-token fault.
    #[must_use]
    pub fn auth_token(reason: impl Into<String>) -> Self {
        Self::AuthToken {
            reason: reason.into(),
        }
    }

    /// Creates an unauthorized fault with the default message.
    #[must_use]
    pub const fn unauthorized() -> Self {
        Self::Unauthorized { message: None }
    }

    /// Creates an unauthorized fault with its own client-facing message.
    #[must_use]
    pub fn unauthorized_with(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: Some(message.into()),
        }
    }

    /// Creates a not-found fault.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates an unclassified fault.
    #[must_use]
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::Unclassified {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unclassified fault wrapping a source error.
    pub fn unclassified_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Unclassified {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the kind of this fault.
    #[must_use]
    pub const fn kind(&self) -> FaultKind {
        match self {
            Self::Validation { .. } => FaultKind::Validation,
            Self::MalformedIdentifier { .. } => FaultKind::MalformedIdentifier,
            Self::DuplicateEntry { .. } => FaultKind::DuplicateEntry,
            Self::AuthToken { .. } => FaultKind::AuthToken,
            Self::Unauthorized { .. } => FaultKind::Unauthorized,
            Self::NotFound { .. } => FaultKind::NotFound,
            Self::Unclassified { .. } => FaultKind::Unclassified,
        }
    }

    /// Classifies this fault. See [`classify`].
    #[must_use]
    pub fn classify(&self) -> ClassifiedFault {
        classify(self)
    }
}

impl From<serde_json::Error> for Fault {
    fn from(e: serde_json::Error) -> Self {
        Self::unclassified_with_source("JSON conversion failed", e)
    }
}

/// The kind of a [`Fault`], used for log and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Field validation failure.
    Validation,
    /// Malformed identifier.
    MalformedIdentifier,
    /// Uniqueness-constraint violation.
    DuplicateEntry,
    /// Credential token failure.
    AuthToken,
    /// Explicit unauthorized.
    Unauthorized,
    /// Missing document.
    NotFound,
    /// Catch-all.
    Unclassified,
}

impl FaultKind {
    /// Returns a stable snake_case label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::MalformedIdentifier => "malformed_identifier",
            Self::DuplicateEntry => "duplicate_entry",
            Self::AuthToken => "auth_token",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The client-facing view of a fault.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFault {
    /// The fault kind.
    pub kind: FaultKind,
    /// HTTP status to respond with.
    pub status: StatusCode,
    /// Envelope message.
    pub message: String,
    /// Envelope `error` value.
    pub details: Value,
}

impl ClassifiedFault {
    /// Converts the classification into a failure envelope.
    #[must_use]
    pub fn into_envelope(self) -> Envelope {
        Envelope::failure(self.status, self.message, self.details)
    }
}

/// Maps a fault to its status, message and details.
///
/// Total over [`Fault`]: every variant has exactly one mapping, and none of
/// them copy diagnostic text or sources into `details`.
#[must_use]
pub fn classify(fault: &Fault) -> ClassifiedFault {
    let kind = fault.kind();
    let (status, message, details) = match fault {
        Fault::Validation { fields } => {
            let mut flattened = Map::new();
            for f in fields {
                flattened.insert(f.field.clone(), Value::String(f.message.clone()));
            }
            (
                StatusCode::BAD_REQUEST,
                "Validation Error".to_string(),
                Value::Object(flattened),
            )
        }
        Fault::MalformedIdentifier { field, message } => {
            let mut details = Map::new();
            details.insert(field.clone(), Value::String(message.clone()));
            (
                StatusCode::BAD_REQUEST,
                "Invalid Data".to_string(),
                Value::Object(details),
            )
        }
        Fault::DuplicateEntry { key_value } => (
            StatusCode::CONFLICT,
            "Duplicate Entry".to_string(),
            Value::Object(key_value.clone()),
        ),
        Fault::AuthToken { .. } => (
            StatusCode::UNAUTHORIZED,
            "Authentication Error".to_string(),
            json!({}),
        ),
        Fault::Unauthorized { message } => (
            StatusCode::UNAUTHORIZED,
            message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or("Unauthorized")
                .to_string(),
            json!({}),
        ),
        Fault::NotFound { resource } => (
            StatusCode::NOT_FOUND,
            "Not Found".to_string(),
            json!({ "resource": resource }),
        ),
        Fault::Unclassified { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
            json!({}),
        ),
    };

    ClassifiedFault {
        kind,
        status,
        message,
        details,
    }
}

/// Counts one fault of `kind` in `pathway_faults_total`.
pub fn count_fault(kind: FaultKind) {
    metrics::counter!("pathway_faults_total", "kind" => kind.as_str()).increment(1);
}

/// Logs a fault, counts it, classifies it and builds the failure envelope.
#[must_use]
pub fn respond(fault: &Fault) -> Envelope {
    count_fault(fault.kind());
    match fault {
        Fault::Unclassified { .. } => {
            tracing::error!(kind = %fault.kind(), error = ?fault, "request failed");
        }
        _ => tracing::error!(kind = %fault.kind(), error = %fault, "request failed"),
    }
    classify(fault).into_envelope()
}
