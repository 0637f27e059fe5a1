use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::document::Document;
use crate::error::StoreResult;

/// Documents buffered between the producer and the consumer of a cursor.
pub const CURSOR_BUFFER: usize = 32;

/// Producer side of a [`DocumentCursor`].
pub type CursorSender = mpsc::Sender<StoreResult<Document>>;

/// A lazy, finite sequence of documents from one collection.
///
/// Documents arrive one at a time through a bounded channel, so a slow
/// consumer holds the producer back. Dropping the cursor closes the channel
/// and the producer stops at its next send.
#[derive(Debug)]
pub struct DocumentCursor {
    rx: mpsc::Receiver<StoreResult<Document>>,
}

impl DocumentCursor {
    /// Creates a connected producer/cursor pair.
    pub fn channel(buffer: usize) -> (CursorSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }

    /// Receives the next document, or `None` once the producer is done.
    pub async fn next(&mut self) -> Option<StoreResult<Document>> {
        self.rx.recv().await
    }

    /// Stops the producer without dropping the cursor.
    ///
    /// Documents already buffered can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for DocumentCursor {
    type Item = StoreResult<Document>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
