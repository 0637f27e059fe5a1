use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use onboard_model::{Book, Entity, User};
use onboard_service::{EntityServices, ServiceError, ServiceResult, StreamingListService};
use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::codec::{read_frame, write_frame};
use crate::error::{RpcError, RpcResult};
use crate::protocol::{Call, Request, Response};

/// How long connections get to finish their current call after shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves entity calls over framed TCP connections.
///
/// Each accepted connection runs on its own task and handles its calls one
/// after another.
pub struct RpcServer {
    users: EntityServices<User>,
    books: EntityServices<Book>,
    drain_timeout: Duration,
}

impl RpcServer {
    pub fn new(users: EntityServices<User>, books: EntityServices<Book>) -> Self {
        Self {
            users,
            books,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// After shutdown no new connections or calls are accepted and open
    /// `List` streams stop. Unary calls already running get up to the drain
    /// timeout to finish; connections still busy after that are aborted.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let server = Arc::new(self);
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("RPC connection from {}", peer);
                        let server = Arc::clone(&server);
                        let stop = stop_rx.clone();
                        connections.spawn(async move {
                            if let Err(e) = server.handle_connection(stream, stop).await {
                                debug!("RPC connection from {} ended: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => warn!("Failed to accept RPC connection: {}", e),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!("RPC server stopping, draining {} connection(s)", connections.len());
        let _ = stop_tx.send(true);
        let drained = tokio::time::timeout(server.drain_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                "Aborting {} RPC connection(s) still busy after {:?}",
                connections.len(),
                server.drain_timeout
            );
            connections.shutdown().await;
        }
    }

    async fn handle_connection(
        &self,
        stream: TcpStream,
        mut stop: watch::Receiver<bool>,
    ) -> RpcResult<()> {
        let (mut reader, mut writer) = stream.into_split();
        loop {
            let frame = tokio::select! {
                frame = read_frame::<_, Request>(&mut reader) => frame,
                _ = stop.wait_for(|stopped| *stopped) => return Ok(()),
            };
            match frame {
                Ok(Some(request)) => self.dispatch(request, &mut writer, &mut stop).await?,
                Ok(None) => return Ok(()),
                Err(RpcError::Serialization(e)) => {
                    let err = ServiceError::InvalidArgument(format!("malformed request: {e}"));
                    write_frame(&mut writer, &Response::from(err)).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn dispatch<W>(
        &self,
        request: Request,
        writer: &mut W,
        stop: &mut watch::Receiver<bool>,
    ) -> RpcResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let Request { collection, call } = request;
        debug!("RPC {} on {}", call.name(), collection);

        if collection == User::COLLECTION {
            handle(&self.users, call, writer, stop).await
        } else if collection == Book::COLLECTION {
            handle(&self.books, call, writer, stop).await
        } else {
            let err = ServiceError::InvalidArgument(format!("unknown collection {collection:?}"));
            write_frame(writer, &Response::from(err)).await
        }
    }
}

async fn handle<T, W>(
    services: &EntityServices<T>,
    call: Call,
    writer: &mut W,
    stop: &mut watch::Receiver<bool>,
) -> RpcResult<()>
where
    T: Entity,
    W: AsyncWrite + Unpin,
{
    let response = match call {
        Call::Create { payload } => entity_response(services.crud.create(payload).await),
        Call::Read { id } => entity_response(services.crud.read(&id).await),
        Call::Update { id, payload } => entity_response(services.crud.update(&id, payload).await),
        Call::Delete { id } => match services.crud.delete(&id).await {
            Ok(count) => Response::Deleted { count },
            Err(e) => Response::from(e),
        },
        Call::Count => match services.crud.count().await {
            Ok(count) => Response::Count { count },
            Err(e) => Response::from(e),
        },
        Call::List => return stream_list(&services.stream, writer, stop).await,
    };
    if let Response::Status(status) = &response {
        debug!("{} call failed: {} {}", T::NAME, status.kind, status.message);
    }
    write_frame(writer, &response).await
}

/// Writes one `Item` frame per entity, then `End`.
///
/// A failed write ends the call and drops the stream, which releases the
/// store cursor. Shutdown ends the stream the same way, even while a write
/// is waiting on a peer that stopped reading.
async fn stream_list<T, W>(
    service: &StreamingListService<T>,
    writer: &mut W,
    stop: &mut watch::Receiver<bool>,
) -> RpcResult<()>
where
    T: Entity,
    W: AsyncWrite + Unpin,
{
    let mut stream = match service.list_all().await {
        Ok(stream) => stream,
        Err(e) => return write_frame(writer, &Response::from(e)).await,
    };

    let mut sent = 0usize;
    loop {
        let step = async {
            match stream.next().await {
                Some(item) => match item.and_then(to_value) {
                    Ok(value) => write_frame(writer, &Response::Item(value)).await.map(|()| true),
                    Err(e) => write_frame(writer, &Response::from(e)).await.map(|()| false),
                },
                None => write_frame(writer, &Response::End).await.map(|()| false),
            }
        };
        let more = tokio::select! {
            more = step => more?,
            _ = stop.wait_for(|stopped| *stopped) => {
                debug!("{} stream stopped by shutdown after {}", T::COLLECTION, sent);
                return Err(RpcError::Closed);
            }
        };
        if !more {
            break;
        }
        sent += 1;
    }
    debug!("Streamed {} {}", sent, T::COLLECTION);
    Ok(())
}

fn entity_response<T: Entity>(result: ServiceResult<T>) -> Response {
    match result.and_then(to_value) {
        Ok(value) => Response::Entity(value),
        Err(e) => Response::from(e),
    }
}

fn to_value<T: Entity>(entity: T) -> ServiceResult<serde_json::Value> {
    serde_json::to_value(entity)
        .map_err(|e| ServiceError::Internal(format!("could not encode {}: {e}", T::NAME)))
}
