//! Document store abstraction.

use async_trait::async_trait;
use onboard_types::ObjectId;
use serde_json::{Map, Value};

use crate::cursor::DocumentCursor;
use crate::deadline::Deadline;
use crate::document::Document;
use crate::error::StoreResult;

/// A persistent store of JSON documents grouped in named collections.
///
/// Each call performs exactly one store operation. Implementations must
/// honour the deadline; callers additionally bound every call with
/// [`Deadline::run`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every document of the collection in insertion order.
    async fn find_all(&self, collection: &str, deadline: &Deadline) -> StoreResult<Vec<Document>>;

    /// Returns the document with this id, or `StoreError::NotFound`.
    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        deadline: &Deadline,
    ) -> StoreResult<Document>;

    /// Inserts a document, generating its id when none is given.
    async fn insert(
        &self,
        collection: &str,
        id: Option<ObjectId>,
        body: Map<String, Value>,
        deadline: &Deadline,
    ) -> StoreResult<ObjectId>;

    /// Replaces the listed top-level fields. Returns the number of updated
    /// documents, 0 when nothing matched.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        fields: Map<String, Value>,
        deadline: &Deadline,
    ) -> StoreResult<u64>;

    /// Returns the number of deleted documents.
    async fn delete_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        deadline: &Deadline,
    ) -> StoreResult<u64>;

    /// Number of documents in the collection, counted by the store.
    async fn count(&self, collection: &str, deadline: &Deadline) -> StoreResult<u64>;

    /// Opens a cursor over the whole collection.
    async fn open_cursor(&self, collection: &str) -> StoreResult<DocumentCursor>;
}
