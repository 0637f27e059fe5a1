use std::marker::PhantomData;

use onboard_model::Entity;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::codec::{read_frame, write_frame};
use crate::error::{RpcError, RpcResult};
use crate::protocol::{Call, Request, Response};

/// A connection to an [`RpcServer`](crate::RpcServer).
///
/// Calls are sequential; each borrows the client mutably until answered.
pub struct RpcClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    /// A List answer has not been read to its end yet.
    streaming: bool,
}

impl RpcClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> RpcResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader,
            writer,
            streaming: false,
        })
    }

    /// Sends a raw request and returns the first answer frame.
    pub async fn call(&mut self, request: &Request) -> RpcResult<Response> {
        self.finish_stream().await?;
        write_frame(&mut self.writer, request).await?;
        self.read_response().await
    }

    pub async fn create<T: Entity>(&mut self, entity: &T) -> RpcResult<T> {
        let payload = serde_json::to_value(entity)?;
        let response = self.unary(T::COLLECTION, Call::Create { payload }).await?;
        expect_entity(response)
    }

    pub async fn read<T: Entity>(&mut self, id: &str) -> RpcResult<T> {
        let response = self.unary(T::COLLECTION, Call::Read { id: id.to_string() }).await?;
        expect_entity(response)
    }

    /// Applies `patch` and returns the updated entity.
    pub async fn update<T: Entity>(&mut self, id: &str, patch: &T::Patch) -> RpcResult<T> {
        let call = Call::Update {
            id: id.to_string(),
            payload: serde_json::to_value(patch)?,
        };
        expect_entity(self.unary(T::COLLECTION, call).await?)
    }

    pub async fn delete<T: Entity>(&mut self, id: &str) -> RpcResult<u64> {
        match self.unary(T::COLLECTION, Call::Delete { id: id.to_string() }).await? {
            Response::Deleted { count } => Ok(count),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn count<T: Entity>(&mut self) -> RpcResult<u64> {
        match self.unary(T::COLLECTION, Call::Count).await? {
            Response::Count { count } => Ok(count),
            other => Err(unexpected(&other)),
        }
    }

    /// Starts streaming every `T`.
    ///
    /// Dropping the returned call early is fine: the rest of the answer is
    /// skipped before the next call is sent.
    pub async fn list<T: Entity>(&mut self) -> RpcResult<ListCall<'_, T>> {
        self.finish_stream().await?;
        write_frame(&mut self.writer, &Request::new(T::COLLECTION, Call::List)).await?;
        self.streaming = true;
        Ok(ListCall {
            client: self,
            _entity: PhantomData,
        })
    }

    async fn unary(&mut self, collection: &str, call: Call) -> RpcResult<Response> {
        match self.call(&Request::new(collection, call)).await? {
            Response::Status(status) => Err(RpcError::Status(status.into_error())),
            other => Ok(other),
        }
    }

    async fn read_response(&mut self) -> RpcResult<Response> {
        read_frame(&mut self.reader).await?.ok_or(RpcError::Closed)
    }

    async fn finish_stream(&mut self) -> RpcResult<()> {
        while self.streaming {
            match self.read_response().await {
                Ok(Response::Item(_)) => {}
                Ok(Response::End | Response::Status(_)) => self.streaming = false,
                Ok(other) => {
                    self.streaming = false;
                    return Err(unexpected(&other));
                }
                Err(e) => {
                    self.streaming = false;
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

/// The answer to a List call, read one entity at a time.
pub struct ListCall<'a, T> {
    client: &'a mut RpcClient,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> ListCall<'_, T> {
    /// Next entity, or `None` once the server has sent the end of the list.
    pub async fn next(&mut self) -> Option<RpcResult<T>> {
        if !self.client.streaming {
            return None;
        }
        let response = match self.client.read_response().await {
            Ok(response) => response,
            Err(e) => {
                self.client.streaming = false;
                return Some(Err(e));
            }
        };
        match response {
            Response::Item(value) => Some(serde_json::from_value(value).map_err(RpcError::from)),
            Response::End => {
                self.client.streaming = false;
                None
            }
            Response::Status(status) => {
                self.client.streaming = false;
                Some(Err(RpcError::Status(status.into_error())))
            }
            other => {
                self.client.streaming = false;
                Some(Err(unexpected(&other)))
            }
        }
    }

    /// Reads the remaining entities, stopping at the first error.
    pub async fn collect_all(mut self) -> RpcResult<Vec<T>> {
        let mut entities = Vec::new();
        while let Some(item) = self.next().await {
            entities.push(item?);
        }
        Ok(entities)
    }
}

fn expect_entity<T: Entity>(response: Response) -> RpcResult<T> {
    match response {
        Response::Entity(value) => Ok(serde_json::from_value::<T>(value)?),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(response: &Response) -> RpcError {
    let kind = match response {
        Response::Entity(_) => "Entity",
        Response::Deleted { .. } => "Deleted",
        Response::Count { .. } => "Count",
        Response::Item(_) => "Item",
        Response::End => "End",
        Response::Status(_) => "Status",
    };
    RpcError::Protocol(format!("unexpected {kind} frame"))
}
