//! Test response wrapper with envelope helpers.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use pathway_middleware::{RequestState, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;

/// A fully buffered response plus the request's final lifecycle state.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    state: Option<RequestState>,
}

impl TestResponse {
    /// Buffers an application response.
    pub async fn from_http(response: Response) -> Result<Self, TestError> {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
            state: None,
        })
    }

    /// Builds a response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            state: None,
        }
    }

    pub(crate) fn with_state(mut self, state: RequestState) -> Self {
        self.state = Some(state);
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header_str(header::LOCATION.as_str())
    }

    /// Lifecycle state the request ended in, when sent through a
    /// [`TestClient`](crate::TestClient).
    #[must_use]
    pub fn state(&self) -> Option<RequestState> {
        self.state
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as text.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The body as a JSON value, `Null` when it is not JSON.
    #[must_use]
    pub fn envelope(&self) -> Value {
        self.json().unwrap_or(Value::Null)
    }

    /// The envelope's `message`.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.envelope()["message"].as_str().map(str::to_string)
    }

    /// The envelope's `data`, `Null` when absent.
    #[must_use]
    pub fn data(&self) -> Value {
        self.envelope()["data"].clone()
    }

    /// The envelope's `error`, `Null` when absent.
    #[must_use]
    pub fn error(&self) -> Value {
        self.envelope()["error"].clone()
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status differs, printing the body.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "expected status {expected}, got {} with body {}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that the body is a well-formed envelope with this status and
    /// message, and that `success` agrees with the status.
    ///
    /// # Panics
    ///
    /// Panics on any mismatch.
    pub fn assert_envelope(&self, expected: StatusCode, message: &str) -> &Self {
        self.assert_status(expected);
        let envelope = self.envelope();
        assert_eq!(envelope["status"], expected.as_u16(), "envelope status: {envelope}");
        assert_eq!(envelope["success"], expected.is_success(), "envelope success: {envelope}");
        assert_eq!(envelope["message"], message, "envelope message: {envelope}");
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("state", &self.state)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathway_core::Envelope;
    use serde_json::json;

    async fn from_envelope(envelope: Envelope) -> TestResponse {
        TestResponse::from_http(envelope.into_response()).await.unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope_helpers() {
        let response = from_envelope(Envelope::format(
            StatusCode::CREATED,
            "Path created",
            Some(json!({ "title": "Rust" })),
        ))
        .await;

        response.assert_envelope(StatusCode::CREATED, "Path created");
        assert_eq!(response.data()["title"], "Rust");
        assert!(response.error().is_null());
        assert!(response.state().is_none());
    }

    #[tokio::test]
    async fn test_failure_envelope_helpers() {
        let response = from_envelope(Envelope::failure(
            StatusCode::CONFLICT,
            "Duplicate value entered for username",
            json!({ "username": "ada" }),
        ))
        .await;

        response.assert_envelope(StatusCode::CONFLICT, "Duplicate value entered for username");
        assert_eq!(response.error()["username"], "ada");
        assert!(response.data().is_null());
    }

    #[test]
    fn test_non_json_body() {
        let response = TestResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"<html>"));
        assert!(response.envelope().is_null());
        assert!(response.message().is_none());
        assert_eq!(response.text().unwrap(), "<html>");
    }

    #[test]
    #[should_panic(expected = "expected status 200 OK")]
    fn test_assert_status_mismatch_panics() {
        TestResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::new()).assert_status(StatusCode::OK);
    }
}
