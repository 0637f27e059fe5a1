//! Lazy listing of a whole collection.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::Stream;
use onboard_model::Entity;
use onboard_store::{Collection, Deadline, DocumentCursor};
use tracing::warn;

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

/// Streams every entity of type `T`, one at a time.
#[derive(Clone)]
pub struct StreamingListService<T: Entity> {
    collection: Collection<T>,
    config: ServiceConfig,
}

impl<T: Entity> StreamingListService<T> {
    pub fn new(collection: Collection<T>, config: ServiceConfig) -> Self {
        Self { collection, config }
    }

    /// Starts a fresh pass over the collection.
    ///
    /// Only opening the cursor is bounded by `config.op_timeout`; the stream
    /// itself lasts as long as the consumer keeps reading.
    pub async fn list_all(&self) -> ServiceResult<EntityStream<T>> {
        let deadline = Deadline::after(self.config.op_timeout);
        let cursor = self.collection.cursor(&deadline).await?;
        Ok(EntityStream::new(cursor))
    }
}

/// A finite stream of decoded entities.
///
/// The first failure is yielded once and ends the stream; entities already
/// yielded stay delivered. Dropping the stream releases the cursor.
pub struct EntityStream<T> {
    cursor: DocumentCursor,
    done: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityStream<T> {
    pub fn new(cursor: DocumentCursor) -> Self {
        Self {
            cursor,
            done: false,
            _entity: PhantomData,
        }
    }

    fn finish(&mut self, err: ServiceError) -> Poll<Option<ServiceResult<T>>> {
        warn!("Listing {} stopped: {}", T::COLLECTION, err);
        self.done = true;
        self.cursor.close();
        Poll::Ready(Some(Err(err)))
    }
}

impl<T: Entity> Stream for EntityStream<T> {
    type Item = ServiceResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match ready!(Pin::new(&mut self.cursor).poll_next(cx)) {
            None => {
                self.done = true;
                Poll::Ready(None)
            }
            Some(Ok(document)) => match Collection::<T>::decode(document) {
                Ok(entity) => Poll::Ready(Some(Ok(entity))),
                Err(e) => self.finish(ServiceError::Internal(format!(
                    "unknown cursor error: could not decode {}: {e}",
                    T::NAME
                ))),
            },
            Some(Err(e)) => self.finish(e.into()),
        }
    }
}
