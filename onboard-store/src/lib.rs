//! Document store layer for onboard.
//!
//! Provides deadline-bounded access to collections of JSON documents.
//!
//! # Architecture
//!
//! - [`DocumentStore`] is the untyped contract: one call, one store operation,
//!   always under a [`Deadline`]
//! - [`SqliteDocumentStore`] implements it with one table per collection
//! - [`Collection`] is the typed view services use; it encodes entities,
//!   decodes documents and enforces the deadline around every call
//! - [`DocumentCursor`] streams a collection lazily through a bounded channel

mod collection;
mod cursor;
mod deadline;
mod document;
mod error;
mod sqlite;
mod store;

pub use collection::Collection;
pub use cursor::{CURSOR_BUFFER, CursorSender, DocumentCursor};
pub use deadline::{DEFAULT_TIMEOUT, Deadline};
pub use document::Document;
pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteDocumentStore;
pub use store::DocumentStore;
