//! The response envelope.
//!
//! Every reply the pipeline writes, success or failure, is an [`Envelope`]
//! serialized as JSON:
//!
//! ```json
//! { "success": true, "status": 201, "message": "User created successfully", "data": { ... } }
//! { "success": false, "status": 409, "message": "Duplicate Entry", "error": { "username": "ana" } }
//! ```
//!
//! `success` is derived from the status, never supplied by the caller, and
//! `data` / `error` are never both present.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;

use crate::types::Response;

/// Fallback body used when an envelope cannot be serialized.
const FALLBACK_BODY: &str =
    r#"{"success":false,"status":500,"message":"Internal Server Error","error":{}}"#;

/// Uniform JSON body written for every HTTP reply.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use pathway_core::Envelope;
/// use serde_json::json;
///
/// let envelope = Envelope::format(StatusCode::OK, "Login successful", Some(json!({"username": "ana"})));
/// assert!(envelope.is_success());
/// assert_eq!(envelope.data().unwrap()["username"], "ana");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    success: bool,
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

impl Envelope {
    /// Builds a success-side envelope.
    ///
    /// `data` equal to `None` or `Some(Value::Null)` is omitted from the body.
    #[must_use]
    pub fn format(status: StatusCode, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: status.is_success(),
            status: status.as_u16(),
            message: message.into(),
            data: data.filter(|value| !value.is_null()),
            error: None,
        }
    }

    /// Builds a failure-side envelope carrying structured error details.
    #[must_use]
    pub fn failure(status: StatusCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            success: status.is_success(),
            status: status.as_u16(),
            message: message.into(),
            data: None,
            error: Some(details),
        }
    }

    /// Returns `true` when the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the HTTP status of this envelope.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the success payload, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the error details, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Value> {
        self.error.as_ref()
    }

    /// Renders the envelope as an `application/json` response.
    ///
    /// Consumes the envelope so it is written at most once.
    #[must_use]
    pub fn into_response(self) -> Response {
        let status = self.status();
        let body = match serde_json::to_vec(&self) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response envelope");
                Bytes::from_static(FALLBACK_BODY.as_bytes())
            }
        };

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
