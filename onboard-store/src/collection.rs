use std::marker::PhantomData;
use std::sync::Arc;

use onboard_model::Entity;
use onboard_types::ObjectId;
use serde_json::{Map, Value};

use crate::cursor::DocumentCursor;
use crate::deadline::Deadline;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// Typed view of the collection that holds `T`.
///
/// Every call is bounded by the given deadline on top of whatever the
/// underlying store does, so a store that ignores deadlines still cannot
/// hold the caller past it.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        T::COLLECTION
    }

    /// Returns the shared store handle.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn find_all(&self, deadline: &Deadline) -> StoreResult<Vec<T>> {
        let documents = deadline
            .run(self.store.find_all(T::COLLECTION, deadline))
            .await?;
        documents.into_iter().map(Self::decode).collect()
    }

    pub async fn find_by_id(&self, id: &ObjectId, deadline: &Deadline) -> StoreResult<T> {
        let document = deadline
            .run(self.store.find_by_id(T::COLLECTION, id, deadline))
            .await?;
        Self::decode(document)
    }

    /// Inserts `entity`, keeping its id if it has one.
    pub async fn insert(&self, entity: &T, deadline: &Deadline) -> StoreResult<ObjectId> {
        let body = Self::encode(entity)?;
        deadline
            .run(self.store.insert(T::COLLECTION, entity.id(), body, deadline))
            .await
    }

    /// Applies the fields carried by `patch`. Returns the updated count.
    pub async fn update_by_id(
        &self,
        id: &ObjectId,
        patch: &T::Patch,
        deadline: &Deadline,
    ) -> StoreResult<u64> {
        let fields = to_object(patch)?;
        deadline
            .run(self.store.update_by_id(T::COLLECTION, id, fields, deadline))
            .await
    }

    pub async fn delete_by_id(&self, id: &ObjectId, deadline: &Deadline) -> StoreResult<u64> {
        deadline
            .run(self.store.delete_by_id(T::COLLECTION, id, deadline))
            .await
    }

    pub async fn count(&self, deadline: &Deadline) -> StoreResult<u64> {
        deadline.run(self.store.count(T::COLLECTION, deadline)).await
    }

    /// Opens a raw cursor; decode items with [`Collection::decode`].
    pub async fn cursor(&self, deadline: &Deadline) -> StoreResult<DocumentCursor> {
        deadline.run(self.store.open_cursor(T::COLLECTION)).await
    }

    /// Builds the stored body of `entity`. The id is kept out of the body.
    pub fn encode(entity: &T) -> StoreResult<Map<String, Value>> {
        let mut body = to_object(entity)?;
        body.remove("id");
        Ok(body)
    }

    pub fn decode(document: Document) -> StoreResult<T> {
        let Document { id, mut body } = document;
        body.insert("id".to_string(), Value::String(id.to_hex()));
        Ok(serde_json::from_value(Value::Object(body))?)
    }
}

fn to_object<V: serde::Serialize>(value: &V) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidData(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
