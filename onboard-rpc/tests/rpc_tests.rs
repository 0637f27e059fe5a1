use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use onboard_model::{Book, BookPatch, User};
use onboard_rpc::{Call, Request, Response, RpcClient, RpcError, RpcServer};
use onboard_service::{EntityServices, ErrorKind, ServiceConfig};
use onboard_store::{Collection, Deadline, DocumentStore, SqliteDocumentStore};
use onboard_types::ObjectId;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

/// Spin up the RPC server on an OS-assigned port.
async fn spawn_test_server() -> (SocketAddr, oneshot::Sender<()>) {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    store.ensure_collections(&["users", "books"]).await.unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(store);
    let server = RpcServer::new(
        EntityServices::new(Collection::new(store.clone()), None, ServiceConfig::default()),
        EntityServices::new(Collection::new(store), None, ServiceConfig::default()),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel();
    tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = stop_rx.await;
            })
            .await;
    });
    (addr, stop_tx)
}

async fn client() -> (RpcClient, oneshot::Sender<()>) {
    let (addr, stop) = spawn_test_server().await;
    (RpcClient::connect(addr).await.unwrap(), stop)
}

// ── Unary calls ──────────────────────────────────────────────────

#[tokio::test]
async fn create_read_update_delete_book() {
    let (mut rpc, _stop) = client().await;

    let created: Book = rpc.create(&Book::new("Dune", "spice")).await.unwrap();
    let id = created.id.unwrap().to_hex();
    assert_eq!(created.title, "Dune");

    let read: Book = rpc.read(&id).await.unwrap();
    assert_eq!(read, created);

    let patch = BookPatch {
        description: Some("sand".into()),
        ..Default::default()
    };
    let updated: Book = rpc.update::<Book>(&id, &patch).await.unwrap();
    assert_eq!(updated.title, "Dune");
    assert_eq!(updated.description, "sand");

    assert_eq!(rpc.delete::<Book>(&id).await.unwrap(), 1);
    let err = rpc.read::<Book>(&id).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn errors_carry_conventional_codes() {
    let (mut rpc, _stop) = client().await;

    let bad_id = rpc.read::<Book>("not-an-id").await.unwrap_err();
    assert_eq!(bad_id.kind(), Some(ErrorKind::InvalidArgument));

    let missing = rpc.delete::<Book>(&ObjectId::new().to_hex()).await.unwrap_err();
    match missing {
        RpcError::Status(err) => assert_eq!(err.code(), 5),
        other => panic!("expected a status, got {other:?}"),
    }

    let invalid = rpc.create(&Book::new("", "no title")).await.unwrap_err();
    assert_eq!(invalid.kind(), Some(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn count_is_per_collection() {
    let (mut rpc, _stop) = client().await;
    rpc.create(&Book::new("A", "")).await.unwrap();
    rpc.create(&Book::new("B", "")).await.unwrap();
    rpc.create(&User::new("Matt", "Chw", 30)).await.unwrap();

    assert_eq!(rpc.count::<Book>().await.unwrap(), 2);
    assert_eq!(rpc.count::<User>().await.unwrap(), 1);
}

#[tokio::test]
async fn unknown_collection_is_invalid_argument() {
    let (mut rpc, _stop) = client().await;
    let response = rpc.call(&Request::new("films", Call::Count)).await.unwrap();
    match response {
        Response::Status(status) => {
            assert_eq!(status.code, 3);
            assert_eq!(status.kind, ErrorKind::InvalidArgument);
        }
        other => panic!("expected a status, got {other:?}"),
    }
}

// ── Streaming ────────────────────────────────────────────────────

#[tokio::test]
async fn list_streams_items_then_end() {
    let (mut rpc, _stop) = client().await;
    assert!(rpc.list::<Book>().await.unwrap().collect_all().await.unwrap().is_empty());

    for title in ["A", "B", "C"] {
        rpc.create(&Book::new(title, "")).await.unwrap();
    }
    let titles: Vec<String> = rpc
        .list::<Book>()
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect();
    assert_eq!(titles, ["A", "B", "C"]);
}

#[tokio::test]
async fn abandoned_list_does_not_break_the_connection() {
    let (mut rpc, _stop) = client().await;
    for title in ["A", "B", "C"] {
        rpc.create(&Book::new(title, "")).await.unwrap();
    }

    {
        let mut list = rpc.list::<Book>().await.unwrap();
        assert_eq!(list.next().await.unwrap().unwrap().title, "A");
    }

    assert_eq!(rpc.count::<Book>().await.unwrap(), 3);
}

// ── Connection handling ──────────────────────────────────────────

#[tokio::test]
async fn malformed_frame_gets_a_status_and_connection_survives() {
    let (addr, _stop) = spawn_test_server().await;
    let mut raw = tokio::net::TcpStream::connect(addr).await.unwrap();
    raw.write_all(&2u32.to_be_bytes()).await.unwrap();
    raw.write_all(b"{]").await.unwrap();

    let response: Option<Response> = onboard_rpc::codec::read_frame(&mut raw).await.unwrap();
    assert!(matches!(
        response,
        Some(Response::Status(ref status)) if status.kind == ErrorKind::InvalidArgument
    ));

    onboard_rpc::codec::write_frame(&mut raw, &Request::new("books", Call::Count))
        .await
        .unwrap();
    let count: Option<Response> = onboard_rpc::codec::read_frame(&mut raw).await.unwrap();
    assert_eq!(count, Some(Response::Count { count: 0 }));
}

#[tokio::test]
async fn raw_payloads_are_validated_like_http() {
    let (mut rpc, _stop) = client().await;
    let call = Call::Create {
        payload: json!({"firstName": "Matt", "lastName": "Chw", "gender": "Robot"}),
    };
    match rpc.call(&Request::new("users", call)).await.unwrap() {
        Response::Status(status) => assert!(status.message.contains("gender")),
        other => panic!("expected a status, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_closes_idle_connections() {
    let (addr, stop) = spawn_test_server().await;
    let mut rpc = RpcClient::connect(addr).await.unwrap();
    assert_eq!(rpc.count::<Book>().await.unwrap(), 0);

    stop.send(()).unwrap();
    let err = loop {
        match rpc.count::<Book>().await {
            Ok(_) => tokio::task::yield_now().await,
            Err(e) => break e,
        }
    };
    assert!(matches!(err, RpcError::Closed | RpcError::Io(_)));
}

#[tokio::test]
async fn shutdown_is_bounded_with_a_stalled_list_reader() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    store.ensure_collections(&["users", "books"]).await.unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(store);
    let users: Collection<User> = Collection::new(store.clone());
    let bio = "x".repeat(4096);
    for i in 0..2000 {
        let user = User::new(format!("User{i}"), "Chw", 30).with_bio(bio.clone());
        users.insert(&user, &Deadline::default()).await.unwrap();
    }

    let server = RpcServer::new(
        EntityServices::new(users, None, ServiceConfig::default()),
        EntityServices::new(Collection::new(store), None, ServiceConfig::default()),
    )
    .with_drain_timeout(Duration::from_secs(1));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve(listener, async {
        let _ = stop_rx.await;
    }));

    // Start a list, take one item, then stop reading with the rest pending.
    let mut raw = tokio::net::TcpStream::connect(addr).await.unwrap();
    onboard_rpc::codec::write_frame(&mut raw, &Request::new("users", Call::List))
        .await
        .unwrap();
    let first: Option<Response> = onboard_rpc::codec::read_frame(&mut raw).await.unwrap();
    assert!(matches!(first, Some(Response::Item(_))));

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("serve did not return after shutdown")
        .unwrap();
    drop(raw);
}
