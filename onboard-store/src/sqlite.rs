//! SQLite-backed document store.
//!
//! Each collection is a table of `(seq, id, doc)` rows where `doc` is the
//! JSON text of the body. Tables are created the first time a collection is
//! touched, or up front through [`SqliteDocumentStore::ensure_collections`].
//!
//! In-memory stores use SQLite's shared cache. An open cursor there holds a
//! schema lock, so creating a table while any cursor is active fails with
//! `SQLITE_LOCKED`. Servers create every collection they serve before
//! accepting requests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use onboard_types::ObjectId;
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, Row, params};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::cursor::{CURSOR_BUFFER, DocumentCursor};
use crate::deadline::Deadline;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// SQLite VM steps between deadline checks.
const PROGRESS_STEPS: i32 = 1_000;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the database lives; cursors open their own connection to it.
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    /// Shared-cache in-memory database, kept alive by the primary connection.
    Memory(String),
}

struct Inner {
    conn: Connection,
    collections: HashSet<String>,
}

/// Persistent document store backed by SQLite.
///
/// One long-lived connection serves all point operations; blocking work runs
/// on the blocking thread pool. Cursors read through a separate connection so
/// a slow stream consumer never holds up writers.
pub struct SqliteDocumentStore {
    inner: Arc<Mutex<Inner>>,
    location: Location,
}

impl SqliteDocumentStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| StoreError::Unavailable(format!("failed to open {}: {e}", path.display())))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        info!("Opened document store at {}", path.display());
        Ok(Self::from_connection(conn, Location::File(path)))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let uri = format!(
            "file:onboard-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        );
        let conn = Connection::open_with_flags(&uri, memory_flags())
            .map_err(|e| StoreError::Unavailable(format!("failed to open in-memory store: {e}")))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        debug!("Opened in-memory document store {uri}");
        Ok(Self::from_connection(conn, Location::Memory(uri)))
    }

    fn from_connection(conn: Connection, location: Location) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                conn,
                collections: HashSet::new(),
            })),
            location,
        }
    }

    /// Runs `op` on the shared connection under the deadline.
    ///
    /// The statement is aborted once the deadline passes or the returned
    /// future is dropped, so abandoned calls release the connection.
    async fn run<T, F>(&self, deadline: &Deadline, op: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Inner) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let cancelled = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(Arc::clone(&cancelled));
        let expires = deadline.at().into_std();
        let budget = deadline.budget();

        let task = tokio::task::spawn_blocking(move || {
            let mut inner = inner
                .lock()
                .map_err(|_| StoreError::Unavailable("connection mutex poisoned".into()))?;
            if cancelled.load(Ordering::Relaxed) || std::time::Instant::now() >= expires {
                return Err(StoreError::Timeout(budget));
            }

            let flag = Arc::clone(&cancelled);
            inner.conn.progress_handler(
                PROGRESS_STEPS,
                Some(move || flag.load(Ordering::Relaxed) || std::time::Instant::now() >= expires),
            );
            let result = op(&mut *inner).map_err(|e| classify(e, budget));
            inner.conn.progress_handler(0, None::<fn() -> bool>);
            result
        });

        deadline
            .run(async move {
                task.await
                    .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
            })
            .await
    }

    /// Creates the tables for `collections` on the primary connection.
    ///
    /// Call before any cursor is opened; later table creation can collide
    /// with a cursor's schema lock on in-memory stores.
    pub async fn ensure_collections(&self, collections: &[&str]) -> StoreResult<()> {
        let tables = collections
            .iter()
            .map(|collection| table_name(collection))
            .collect::<StoreResult<Vec<_>>>()?;
        self.run(&Deadline::default(), move |inner| {
            for table in &tables {
                ensure_table(inner, table)?;
            }
            Ok(())
        })
        .await?;
        debug!("Ensured collections {collections:?}");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_all(&self, collection: &str, deadline: &Deadline) -> StoreResult<Vec<Document>> {
        let table = table_name(collection)?;
        self.run(deadline, move |inner| {
            ensure_table(inner, &table)?;
            let mut stmt = inner
                .conn
                .prepare_cached(&format!("SELECT id, doc FROM {table} ORDER BY seq"))?;
            let mut rows = stmt.query([])?;
            let mut documents = Vec::new();
            while let Some(row) = rows.next()? {
                documents.push(decode_row(row)?);
            }
            Ok(documents)
        })
        .await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        deadline: &Deadline,
    ) -> StoreResult<Document> {
        let table = table_name(collection)?;
        let collection = collection.to_string();
        let id = *id;
        self.run(deadline, move |inner| {
            ensure_table(inner, &table)?;
            let doc: Option<String> = inner
                .conn
                .query_row(
                    &format!("SELECT doc FROM {table} WHERE id = ?1"),
                    params![id.to_hex()],
                    |row| row.get(0),
                )
                .optional()?;
            match doc {
                Some(text) => Ok(Document::new(id, parse_body(&text)?)),
                None => Err(StoreError::NotFound { collection, id }),
            }
        })
        .await
    }

    async fn insert(
        &self,
        collection: &str,
        id: Option<ObjectId>,
        body: Map<String, Value>,
        deadline: &Deadline,
    ) -> StoreResult<ObjectId> {
        let table = table_name(collection)?;
        let id = id.unwrap_or_default();
        let text = serde_json::to_string(&body)?;
        self.run(deadline, move |inner| {
            ensure_table(inner, &table)?;
            inner.conn.execute(
                &format!("INSERT INTO {table} (id, doc) VALUES (?1, ?2)"),
                params![id.to_hex(), text],
            )?;
            Ok(id)
        })
        .await
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        fields: Map<String, Value>,
        deadline: &Deadline,
    ) -> StoreResult<u64> {
        let table = table_name(collection)?;
        let id = *id;
        self.run(deadline, move |inner| {
            ensure_table(inner, &table)?;
            let tx = inner.conn.transaction()?;
            let current: Option<String> = tx
                .query_row(
                    &format!("SELECT doc FROM {table} WHERE id = ?1"),
                    params![id.to_hex()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(text) = current else {
                return Ok(0);
            };

            let mut document = Document::new(id, parse_body(&text)?);
            document.set_fields(fields);
            let updated = tx.execute(
                &format!("UPDATE {table} SET doc = ?2 WHERE id = ?1"),
                params![id.to_hex(), serde_json::to_string(&document.body)?],
            )?;
            tx.commit()?;
            Ok(updated as u64)
        })
        .await
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        deadline: &Deadline,
    ) -> StoreResult<u64> {
        let table = table_name(collection)?;
        let id = *id;
        self.run(deadline, move |inner| {
            ensure_table(inner, &table)?;
            let deleted = inner.conn.execute(
                &format!("DELETE FROM {table} WHERE id = ?1"),
                params![id.to_hex()],
            )?;
            Ok(deleted as u64)
        })
        .await
    }

    async fn count(&self, collection: &str, deadline: &Deadline) -> StoreResult<u64> {
        let table = table_name(collection)?;
        self.run(deadline, move |inner| {
            ensure_table(inner, &table)?;
            let count: i64 = inner
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn open_cursor(&self, collection: &str) -> StoreResult<DocumentCursor> {
        let table = table_name(collection)?;
        // Create the table before the reader exists so its schema lock
        // cannot get in the way.
        let ensure = table.clone();
        self.run(&Deadline::default(), move |inner| ensure_table(inner, &ensure))
            .await?;

        let location = self.location.clone();
        let (tx, cursor) = DocumentCursor::channel(CURSOR_BUFFER);

        tokio::task::spawn_blocking(move || {
            let produced = (|| -> StoreResult<()> {
                let conn = open_reader(&location)?;
                let mut stmt = conn.prepare(&format!("SELECT id, doc FROM {table} ORDER BY seq"))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let document = decode_row(row)?;
                    if tx.blocking_send(Ok(document)).is_err() {
                        debug!("Cursor over {table} dropped by consumer");
                        return Ok(());
                    }
                }
                Ok(())
            })();
            if let Err(e) = produced {
                let _ = tx.blocking_send(Err(e));
            }
        });

        Ok(cursor)
    }
}

/// Sets the cancellation flag when the calling future goes away.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn memory_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

/// Maps a collection name to its table, rejecting anything that is not a
/// plain identifier.
fn table_name(collection: &str) -> StoreResult<String> {
    let mut chars = collection.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::InvalidData(format!(
            "invalid collection name: {collection:?}"
        )));
    }
    Ok(format!("docs_{collection}"))
}

fn ensure_table(inner: &mut Inner, table: &str) -> StoreResult<()> {
    if inner.collections.contains(table) {
        return Ok(());
    }
    inner.conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            doc TEXT NOT NULL
        );"
    ))?;
    inner.collections.insert(table.to_string());
    Ok(())
}

/// Opens a dedicated read connection for one cursor.
fn open_reader(location: &Location) -> StoreResult<Connection> {
    let conn = match location {
        Location::File(path) => Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Unavailable(format!("failed to open reader: {e}")))?,
        Location::Memory(uri) => {
            let conn = Connection::open_with_flags(uri, memory_flags())
                .map_err(|e| StoreError::Unavailable(format!("failed to open reader: {e}")))?;
            // Shared-cache readers skip table locks so writers are not blocked.
            conn.pragma_update(None, "read_uncommitted", true)?;
            conn
        }
    };
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn decode_row(row: &Row<'_>) -> StoreResult<Document> {
    let id: String = row.get(0)?;
    let text: String = row.get(1)?;
    let id = ObjectId::parse(&id)
        .map_err(|e| StoreError::InvalidData(format!("stored id is corrupt: {e}")))?;
    Ok(Document::new(id, parse_body(&text)?))
}

fn parse_body(text: &str) -> StoreResult<Map<String, Value>> {
    Ok(serde_json::from_str(text)?)
}

/// Turns SQLite's interrupt and locking failures into timeout/unavailable.
fn classify(err: StoreError, budget: Duration) -> StoreError {
    match err {
        StoreError::Database(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::OperationInterrupted =>
        {
            StoreError::Timeout(budget)
        }
        StoreError::Database(rusqlite::Error::SqliteFailure(e, msg))
            if matches!(
                e.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
            ) =>
        {
            StoreError::Unavailable(msg.unwrap_or_else(|| e.to_string()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_sanitized() {
        assert_eq!(table_name("users").unwrap(), "docs_users");
        assert_eq!(table_name("_x1").unwrap(), "docs__x1");
        assert!(table_name("").is_err());
        assert!(table_name("1abc").is_err());
        assert!(table_name("users; DROP TABLE x").is_err());
    }

    #[test]
    fn interrupted_maps_to_timeout() {
        let err = StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
            None,
        ));
        assert!(classify(err, Duration::from_secs(1)).is_timeout());
    }

    #[test]
    fn busy_maps_to_unavailable() {
        let err = StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        ));
        assert!(matches!(
            classify(err, Duration::from_secs(1)),
            StoreError::Unavailable(msg) if msg == "database is locked"
        ));
    }
}
