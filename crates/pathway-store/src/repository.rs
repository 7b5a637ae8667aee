//! Repository abstraction over one collection.

use async_trait::async_trait;
use pathway_core::ResourceId;
use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::StoreResult;

/// Persistence operations for one document type.
///
/// Writes enforce the document's required fields and unique indexes and
/// maintain `createdAt` / `updatedAt`. Controllers receive a repository
/// handle from the application state and never touch the backing store
/// directly.
#[async_trait]
pub trait Repository<T: Document>: Send + Sync {
    /// Creates a document from loose request fields.
    ///
    /// Assigns a fresh id and timestamps; any `_id` in `fields` is ignored.
    async fn create(&self, fields: Map<String, Value>) -> StoreResult<T>;

    /// Stores a fully built document.
    async fn insert(&self, document: T) -> StoreResult<T>;

    /// Looks a document up by id.
    async fn find_by_id(&self, id: &ResourceId) -> StoreResult<Option<T>>;

    /// Returns the first document whose `field` equals `value`.
    async fn find_one(&self, field: &str, value: &Value) -> StoreResult<Option<T>>;

    /// Returns every document in insertion order.
    async fn list(&self) -> StoreResult<Vec<T>>;

    /// Merges `patch` into a document and returns the result.
    ///
    /// `_id` and `createdAt` cannot be patched. Returns `None` when no
    /// document has this id.
    async fn update(&self, id: &ResourceId, patch: Map<String, Value>) -> StoreResult<Option<T>>;

    /// Appends `value` to the array `field` and returns the document.
    ///
    /// The read and the write happen as one step, so concurrent pushes to
    /// the same document are all kept. An absent or null `field` starts as
    /// an empty array. Returns `None` when no document has this id.
    async fn push(&self, id: &ResourceId, field: &str, value: Value) -> StoreResult<Option<T>>;

    /// Removes every element equal to `value` from the array `field`, in one
    /// step like [`push`](Self::push).
    async fn pull(&self, id: &ResourceId, field: &str, value: &Value) -> StoreResult<Option<T>>;

    /// Removes a document and returns it.
    async fn delete(&self, id: &ResourceId) -> StoreResult<Option<T>>;
}
