//! Identifiers.
//!
//! - [`RequestId`] tags every request for log correlation.
//! - [`ResourceId`] names a stored document (24 lowercase hex digits).
//! - [`Principal`] is the authenticated user a session points to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::fault::Fault;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines sortable by request.
///
/// # Example
///
/// ```
/// use pathway_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Length of a resource id in bytes.
const RESOURCE_ID_BYTES: usize = 12;

/// Error returned when a string is not a well-formed [`ResourceId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected 24 hexadecimal characters, got {len} characters")]
pub struct InvalidResourceId {
    len: usize,
}

/// Identifier of a stored document.
///
/// Twelve bytes rendered as 24 lowercase hex digits. The first six bytes are
/// a millisecond timestamp, so freshly created ids sort by creation time.
///
/// # Example
///
/// ```
/// use pathway_core::ResourceId;
///
/// let id: ResourceId = "65a1f0c2e4b0a1b2c3d4e5f6".parse().unwrap();
/// assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
/// assert!("not-an-id".parse::<ResourceId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId([u8; RESOURCE_ID_BYTES]);

impl ResourceId {
    /// Generates a new id.
    #[must_use]
    pub fn new() -> Self {
        let uuid = Uuid::now_v7();
        let raw = uuid.as_bytes();
        let mut bytes = [0u8; RESOURCE_ID_BYTES];
        bytes[..6].copy_from_slice(&raw[..6]);
        bytes[6..].copy_from_slice(&raw[10..]);
        Self(bytes)
    }

    /// Parses a request-supplied value, failing with a malformed-identifier
    /// fault attributed to `field`.
    pub fn parse_field(field: &str, value: &str) -> Result<Self, Fault> {
        value
            .parse()
            .map_err(|_| Fault::malformed_id(field, "Invalid ID format"))
    }

    /// Returns `true` if `value` has the shape of a resource id.
    #[must_use]
    pub fn is_valid(value: &str) -> bool {
        value.len() == RESOURCE_ID_BYTES * 2 && value.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ResourceId {
    type Err = InvalidResourceId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(s) {
            return Err(InvalidResourceId { len: s.len() });
        }
        let mut bytes = [0u8; RESOURCE_ID_BYTES];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| InvalidResourceId { len: s.len() })?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| InvalidResourceId { len: s.len() })?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The authenticated user attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The user's document id.
    pub user_id: ResourceId,
    /// The user's login name.
    pub username: String,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(user_id: ResourceId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.user_id)
    }
}
