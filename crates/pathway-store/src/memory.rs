//! In-memory document store.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use pathway_core::ResourceId;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::document::{Document, Favorite, LearningPath, Subscription, Topic, User};
use crate::error::{StoreError, StoreResult};
use crate::repository::Repository;

const ID: &str = "_id";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

type Documents = IndexMap<ResourceId, Map<String, Value>>;

/// One collection of documents of type `T`.
///
/// Documents are held in their serialized form so patches merge the same
/// way they would against a document database.
pub struct Collection<T> {
    documents: RwLock<Documents>,
    open: Arc<AtomicBool>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Collection<T> {
    fn new(open: Arc<AtomicBool>) -> Self {
        Self {
            documents: RwLock::new(IndexMap::new()),
            open,
            _marker: PhantomData,
        }
    }

    /// Returns the number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }

    fn encode(document: &T) -> StoreResult<Map<String, Value>> {
        match serde_json::to_value(document)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::validation(T::COLLECTION, ID, "document must be an object")),
        }
    }

    fn decode(map: &Map<String, Value>) -> StoreResult<T> {
        Ok(serde_json::from_value(Value::Object(map.clone()))?)
    }

    fn check_required(map: &Map<String, Value>) -> StoreResult<()> {
        for field in T::REQUIRED {
            let missing = match map.get(*field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                return Err(StoreError::validation(
                    T::COLLECTION,
                    *field,
                    format!("Path `{field}` is required."),
                ));
            }
        }
        Ok(())
    }

    fn index_key(map: &Map<String, Value>, index: &[&str]) -> Option<Map<String, Value>> {
        let mut key = Map::new();
        for field in index {
            match map.get(*field) {
                None | Some(Value::Null) => return None,
                Some(value) => {
                    key.insert((*field).to_string(), value.clone());
                }
            }
        }
        Some(key)
    }

    fn check_unique(documents: &Documents, id: &ResourceId, map: &Map<String, Value>) -> StoreResult<()> {
        for index in T::UNIQUE {
            let Some(key) = Self::index_key(map, index) else {
                continue;
            };
            let taken = documents
                .iter()
                .any(|(other_id, other)| other_id != id && Self::index_key(other, index).as_ref() == Some(&key));
            if taken {
                return Err(StoreError::duplicate(T::COLLECTION, key));
            }
        }
        Ok(())
    }

    /// Validates `map` and stores it under `id`. The caller holds the lock.
    fn commit(documents: &mut Documents, id: ResourceId, map: Map<String, Value>) -> StoreResult<T> {
        Self::check_required(&map)?;
        let document = Self::decode(&map).map_err(|e| match e {
            StoreError::Encoding(e) => StoreError::validation(T::COLLECTION, "document", e.to_string()),
            other => other,
        })?;
        Self::check_unique(documents, &id, &map)?;
        documents.insert(id, map);
        Ok(document)
    }

    fn now() -> StoreResult<Value> {
        Ok(serde_json::to_value(Utc::now())?)
    }

    /// Rewrites the array `field` of one document under the write lock.
    fn edit_array(
        &self,
        id: &ResourceId,
        field: &str,
        edit: impl FnOnce(&mut Vec<Value>),
    ) -> StoreResult<Option<T>> {
        self.ensure_open()?;
        if [ID, CREATED_AT, UPDATED_AT].contains(&field) {
            return Err(StoreError::validation(
                T::COLLECTION,
                field,
                format!("Path `{field}` is not an array."),
            ));
        }
        let now = Self::now()?;

        let mut documents = self.documents.write();
        let Some(current) = documents.get(id) else {
            return Ok(None);
        };
        let mut map = current.clone();
        let mut items = match map.remove(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(StoreError::validation(
                    T::COLLECTION,
                    field,
                    format!("Path `{field}` is not an array."),
                ))
            }
        };
        edit(&mut items);
        map.insert(field.to_string(), Value::Array(items));
        map.insert(UPDATED_AT.to_string(), now);

        Self::commit(&mut documents, *id, map).map(Some)
    }
}

#[async_trait]
impl<T: Document> Repository<T> for Collection<T> {
    async fn create(&self, fields: Map<String, Value>) -> StoreResult<T> {
        self.ensure_open()?;
        let id = ResourceId::new();
        let now = Self::now()?;
        let mut map = fields;
        map.insert(ID.to_string(), Value::String(id.to_string()));
        map.insert(CREATED_AT.to_string(), now.clone());
        map.insert(UPDATED_AT.to_string(), now);

        let document = Self::commit(&mut self.documents.write(), id, map)?;
        debug!(collection = T::COLLECTION, %id, "document created");
        Ok(document)
    }

    async fn insert(&self, document: T) -> StoreResult<T> {
        self.ensure_open()?;
        let id = document.id();
        let map = Self::encode(&document)?;

        let mut documents = self.documents.write();
        if documents.contains_key(&id) {
            let mut key_value = Map::new();
            key_value.insert(ID.to_string(), Value::String(id.to_string()));
            return Err(StoreError::duplicate(T::COLLECTION, key_value));
        }
        let document = Self::commit(&mut documents, id, map)?;
        debug!(collection = T::COLLECTION, %id, "document inserted");
        Ok(document)
    }

    async fn find_by_id(&self, id: &ResourceId) -> StoreResult<Option<T>> {
        self.ensure_open()?;
        self.documents.read().get(id).map(Self::decode).transpose()
    }

    async fn find_one(&self, field: &str, value: &Value) -> StoreResult<Option<T>> {
        self.ensure_open()?;
        self.documents
            .read()
            .values()
            .find(|map| map.get(field) == Some(value))
            .map(Self::decode)
            .transpose()
    }

    async fn list(&self) -> StoreResult<Vec<T>> {
        self.ensure_open()?;
        self.documents.read().values().map(Self::decode).collect()
    }

    async fn update(&self, id: &ResourceId, patch: Map<String, Value>) -> StoreResult<Option<T>> {
        self.ensure_open()?;
        let now = Self::now()?;

        let mut documents = self.documents.write();
        let Some(current) = documents.get(id) else {
            return Ok(None);
        };
        let mut map = current.clone();
        for (key, value) in patch {
            if key != ID && key != CREATED_AT {
                map.insert(key, value);
            }
        }
        map.insert(UPDATED_AT.to_string(), now);

        let document = Self::commit(&mut documents, *id, map)?;
        debug!(collection = T::COLLECTION, %id, "document updated");
        Ok(Some(document))
    }

    async fn push(&self, id: &ResourceId, field: &str, value: Value) -> StoreResult<Option<T>> {
        let document = self.edit_array(id, field, |items| items.push(value))?;
        if document.is_some() {
            debug!(collection = T::COLLECTION, %id, field, "array element pushed");
        }
        Ok(document)
    }

    async fn pull(&self, id: &ResourceId, field: &str, value: &Value) -> StoreResult<Option<T>> {
        let document = self.edit_array(id, field, |items| items.retain(|item| item != value))?;
        if document.is_some() {
            debug!(collection = T::COLLECTION, %id, field, "array element pulled");
        }
        Ok(document)
    }

    async fn delete(&self, id: &ResourceId) -> StoreResult<Option<T>> {
        self.ensure_open()?;
        let removed = self.documents.write().shift_remove(id);
        if removed.is_some() {
            debug!(collection = T::COLLECTION, %id, "document deleted");
        }
        removed.as_ref().map(Self::decode).transpose()
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("documents", &self.documents.read().len())
            .finish_non_exhaustive()
    }
}

/// The process-wide document store.
///
/// Opened once at startup, before the server accepts requests, and closed
/// on shutdown. Every operation on a closed store fails with
/// [`StoreError::Closed`].
///
/// # Example
///
/// ```
/// use pathway_store::{MemoryStore, Repository};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::open();
/// let users = store.users();
/// let fields = json!({"username": "ana"}).as_object().cloned().unwrap_or_default();
/// let ana = users.create(fields).await.unwrap();
/// assert_eq!(users.find_by_id(&ana.id).await.unwrap(), Some(ana));
/// store.close();
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    open: Arc<AtomicBool>,
    users: Arc<Collection<User>>,
    paths: Arc<Collection<LearningPath>>,
    topics: Arc<Collection<Topic>>,
    subscriptions: Arc<Collection<Subscription>>,
    favorites: Arc<Collection<Favorite>>,
}

impl MemoryStore {
    /// Opens an empty store.
    #[must_use]
    pub fn open() -> Self {
        let open = Arc::new(AtomicBool::new(true));
        info!("document store opened");
        Self {
            users: Arc::new(Collection::new(open.clone())),
            paths: Arc::new(Collection::new(open.clone())),
            topics: Arc::new(Collection::new(open.clone())),
            subscriptions: Arc::new(Collection::new(open.clone())),
            favorites: Arc::new(Collection::new(open.clone())),
            open,
        }
    }

    /// Closes the store. Later operations fail with [`StoreError::Closed`].
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            info!(
                users = self.users.len(),
                paths = self.paths.len(),
                topics = self.topics.len(),
                "document store closed"
            );
        }
    }

    /// Returns true until [`close`](Self::close) is called.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// The `users` collection.
    pub fn users(&self) -> Arc<Collection<User>> {
        self.users.clone()
    }

    /// The `paths` collection.
    pub fn paths(&self) -> Arc<Collection<LearningPath>> {
        self.paths.clone()
    }

    /// The `topics` collection.
    pub fn topics(&self) -> Arc<Collection<Topic>> {
        self.topics.clone()
    }

    /// The `subscriptions` collection.
    pub fn subscriptions(&self) -> Arc<Collection<Subscription>> {
        self.subscriptions.clone()
    }

    /// The `favorites` collection.
    pub fn favorites(&self) -> Arc<Collection<Favorite>> {
        self.favorites.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let store = MemoryStore::open();
        let path = store
            .paths()
            .create(fields(json!({"_id": "ffffffffffffffffffffffff", "title": "Rust", "shortDesc": "Ownership"})))
            .await
            .unwrap();

        assert_ne!(path.id.to_string(), "ffffffffffffffffffffffff");
        assert_eq!(path.created_at, path.updated_at);
        assert_eq!(store.paths().len(), 1);
    }

    #[tokio::test]
    async fn test_required_fields() {
        let store = MemoryStore::open();
        let err = store
            .topics()
            .create(fields(json!({"title": "Borrowing", "objective": "  "})))
            .await
            .unwrap_err();
        match err {
            StoreError::Validation { field, message, .. } => {
                assert_eq!(field, "objective");
                assert_eq!(message, "Path `objective` is required.");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.topics().is_empty());
    }

    #[tokio::test]
    async fn test_unique_username() {
        let store = MemoryStore::open();
        let users = store.users();
        users.create(fields(json!({"username": "ana"}))).await.unwrap();
        let err = users.create(fields(json!({"username": "ana"}))).await.unwrap_err();
        match err {
            StoreError::Duplicate { key_value, .. } => assert_eq!(Value::Object(key_value), json!({"username": "ana"})),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_sparse_unique_index_ignores_nulls() {
        let store = MemoryStore::open();
        let users = store.users();
        users.create(fields(json!({"username": "ana"}))).await.unwrap();
        users.create(fields(json!({"username": "bo"}))).await.unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn test_compound_unique_index() {
        let store = MemoryStore::open();
        let (user, path) = (ResourceId::new(), ResourceId::new());
        let subs = store.subscriptions();
        subs.insert(Subscription::new(user, path)).await.unwrap();
        subs.insert(Subscription::new(user, ResourceId::new())).await.unwrap();
        let err = subs.insert(Subscription::new(user, path)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_position() {
        let store = MemoryStore::open();
        let paths = store.paths();
        let first = paths
            .create(fields(json!({"title": "A", "shortDesc": "a"})))
            .await
            .unwrap();
        paths
            .create(fields(json!({"title": "B", "shortDesc": "b"})))
            .await
            .unwrap();

        let updated = paths
            .update(&first.id, fields(json!({"title": "A2", "_id": "ffffffffffffffffffffffff"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.title, "A2");
        assert_eq!(updated.short_desc, "a");
        assert!(updated.updated_at >= first.updated_at);

        let titles: Vec<_> = paths.list().await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["A2", "B"]);
    }

    #[tokio::test]
    async fn test_update_rejects_bad_types() {
        let store = MemoryStore::open();
        let topics = store.topics();
        let topic = topics
            .create(fields(json!({"title": "T", "objective": "O"})))
            .await
            .unwrap();
        let err = topics
            .update(&topic.id, fields(json!({"path": "not-an-id"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        assert_eq!(topics.find_by_id(&topic.id).await.unwrap().unwrap().path, None);
    }

    #[tokio::test]
    async fn test_missing_documents() {
        let store = MemoryStore::open();
        let id = ResourceId::new();
        assert!(store.paths().find_by_id(&id).await.unwrap().is_none());
        assert!(store.paths().update(&id, Map::new()).await.unwrap().is_none());
        assert!(store.paths().delete(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_one_and_delete() {
        let store = MemoryStore::open();
        let users = store.users();
        let ana = users.create(fields(json!({"username": "ana", "email": "ana@example.com"}))).await.unwrap();

        let found = users.find_one("email", &json!("ana@example.com")).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(ana.id));

        let removed = users.delete(&ana.id).await.unwrap();
        assert_eq!(removed.map(|u| u.username), Some("ana".to_string()));
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_push_and_pull() {
        let store = MemoryStore::open();
        let paths = store.paths();
        let path = paths
            .create(fields(json!({"title": "Rust", "shortDesc": "Ownership"})))
            .await
            .unwrap();
        let (a, b) = (ResourceId::new(), ResourceId::new());

        paths.push(&path.id, "topics", json!(a.to_string())).await.unwrap();
        let pushed = paths.push(&path.id, "topics", json!(b.to_string())).await.unwrap().unwrap();
        assert_eq!(pushed.topics, vec![a, b]);

        let pulled = paths.pull(&path.id, "topics", &json!(a.to_string())).await.unwrap().unwrap();
        assert_eq!(pulled.topics, vec![b]);

        assert!(paths.push(&ResourceId::new(), "topics", json!(a.to_string())).await.unwrap().is_none());
        let err = paths.push(&path.id, "title", json!("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        let err = paths.push(&path.id, "topics", json!("not-an-id")).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        assert_eq!(paths.find_by_id(&path.id).await.unwrap().unwrap().topics, vec![b]);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_operations() {
        let store = MemoryStore::open();
        let users = store.users();
        store.close();
        assert!(!store.is_open());
        assert!(matches!(users.list().await, Err(StoreError::Closed)));
        assert!(matches!(
            users.create(fields(json!({"username": "ana"}))).await,
            Err(StoreError::Closed)
        ));
    }
}
