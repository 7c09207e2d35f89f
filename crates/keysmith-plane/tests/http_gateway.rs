//! HttpGatewayClient against a local fake of the admin API
//!
//! The fake is an axum app bound to an ephemeral port; each route returns a
//! fixed status so the client's status mapping can be checked end to end.

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use keysmith_core::ProvisionError;
use keysmith_plane::gateway::{AdminPath, Create, Delete, Lookup};
use keysmith_plane::metrics::CallOutcome;
use keysmith_plane::{ConsumerRegistry, GatewayClient, GatewayError, HttpGatewayClient, Metrics};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn get_consumer(Path(username): Path<String>) -> impl IntoResponse {
    match username.as_str() {
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, Json(json!({ "id": "c-slow", "username": "slow" }))).into_response()
        }
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        "garbled" => (StatusCode::OK, "{not json").into_response(),
        "alice@example.com" => (
            StatusCode::OK,
            Json(json!({ "id": "c-email", "username": username })),
        )
            .into_response(),
        "alice" => (StatusCode::OK, Json(json!({ "id": "c-1", "username": "alice" }))).into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response(),
    }
}

async fn create_consumer(Json(body): Json<Value>) -> impl IntoResponse {
    match body["username"].as_str() {
        Some("taken") => (StatusCode::CONFLICT, Json(json!({ "message": "unique constraint" }))),
        Some(name) => (
            StatusCode::CREATED,
            Json(json!({ "id": format!("c-{}", name), "username": name })),
        ),
        None => (StatusCode::BAD_REQUEST, Json(json!({ "message": "username required" }))),
    }
}

async fn list_credentials(Path(username): Path<String>) -> impl IntoResponse {
    if username != "alice" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": [
                { "id": "j-1", "key": "alice", "secret": "c2VjcmV0", "algorithm": "HS256" },
                { "bogus": true }
            ],
            "next": null
        })),
    )
}

async fn create_credential(Path(username): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
    match username.as_str() {
        "ghost" => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))),
        _ => match body["key"].as_str() {
            Some("dup") => (StatusCode::CONFLICT, Json(json!({ "message": "unique constraint" }))),
            Some(key) => (
                StatusCode::CREATED,
                Json(json!({
                    "id": "j-new",
                    "key": key,
                    "secret": body["secret"],
                    "algorithm": body["algorithm"],
                })),
            ),
            None => (StatusCode::BAD_REQUEST, Json(json!({ "message": "key required" }))),
        },
    }
}

async fn delete_credential(Path((_, id)): Path<(String, String)>) -> StatusCode {
    if id == "gone" {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn spawn_fake_admin() -> String {
    let app = Router::new()
        .route("/consumers", post(create_consumer))
        .route("/consumers/{username}", get(get_consumer))
        .route(
            "/consumers/{username}/jwt",
            get(list_credentials).post(create_credential),
        )
        .route("/consumers/{username}/jwt/{id}", delete(delete_credential));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, timeout: Duration) -> (Arc<Metrics>, HttpGatewayClient) {
    let metrics = Arc::new(Metrics::new());
    let client = HttpGatewayClient::new(base_url, timeout, metrics.clone()).unwrap();
    (metrics, client)
}

#[tokio::test]
async fn test_lookup_found_and_not_found() {
    let base = spawn_fake_admin().await;
    let (metrics, client) = client(&base, Duration::from_secs(5));

    match client.lookup(&AdminPath::consumer("alice")).await.unwrap() {
        Lookup::Found(body) => assert_eq!(body["id"], "c-1"),
        other => panic!("expected found, got {:?}", other),
    }
    assert_eq!(
        client.lookup(&AdminPath::consumer("nobody")).await.unwrap(),
        Lookup::NotFound
    );

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.call_count("/consumers/{username}", "GET", CallOutcome::Success), 1);
    assert_eq!(snapshot.call_count("/consumers/{username}", "GET", CallOutcome::NotFound), 1);
}

#[tokio::test]
async fn test_usernames_are_percent_encoded() {
    let base = spawn_fake_admin().await;
    let (_, client) = client(&base, Duration::from_secs(5));

    match client.lookup(&AdminPath::consumer("alice@example.com")).await.unwrap() {
        Lookup::Found(body) => assert_eq!(body["username"], "alice@example.com"),
        other => panic!("expected found, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_created_and_conflict() {
    let base = spawn_fake_admin().await;
    let (metrics, client) = client(&base, Duration::from_secs(5));

    let created = client
        .create(&AdminPath::consumers(), &json!({ "username": "bob" }))
        .await
        .unwrap();
    assert!(matches!(created, Create::Created(ref body) if body["id"] == "c-bob"));

    let conflict = client
        .create(&AdminPath::consumers(), &json!({ "username": "taken" }))
        .await
        .unwrap();
    assert_eq!(conflict, Create::Conflict);

    assert_eq!(
        metrics.snapshot().call_count("/consumers", "POST", CallOutcome::Conflict),
        1
    );
}

#[tokio::test]
async fn test_delete_outcomes() {
    let base = spawn_fake_admin().await;
    let (_, client) = client(&base, Duration::from_secs(5));

    assert_eq!(
        client.delete(&AdminPath::credential("alice", "j-1")).await.unwrap(),
        Delete::Deleted
    );
    assert_eq!(
        client.delete(&AdminPath::credential("alice", "gone")).await.unwrap(),
        Delete::NotFound
    );
}

#[tokio::test]
async fn test_unexpected_status_and_bad_body() {
    let base = spawn_fake_admin().await;
    let (metrics, client) = client(&base, Duration::from_secs(5));

    let err = client.lookup(&AdminPath::consumer("broken")).await.unwrap_err();
    match err {
        GatewayError::UnexpectedStatus { status, ref body } => {
            assert_eq!(status, 500);
            assert!(body.contains("exploded"));
        }
        other => panic!("expected unexpected status, got {:?}", other),
    }

    let err = client.lookup(&AdminPath::consumer("garbled")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));

    assert_eq!(
        metrics.snapshot().call_count("/consumers/{username}", "GET", CallOutcome::Error),
        2
    );
}

#[tokio::test]
async fn test_error_body_read_failure_is_reported() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Status line arrives, then the body stalls past the client timeout
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 64\r\n\r\npartial")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
    });

    let (_, client) = client(&format!("http://{}", addr), Duration::from_millis(300));
    let err = client.lookup(&AdminPath::consumer("alice")).await.unwrap_err();
    match err {
        GatewayError::UnexpectedStatus { status, ref body } => {
            assert_eq!(status, 500);
            assert!(body.starts_with("<failed to read body"), "got {:?}", body);
        }
        other => panic!("expected unexpected status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_is_distinguished() {
    let base = spawn_fake_admin().await;
    let (_, client) = client(&base, Duration::from_millis(200));

    let err = client.lookup(&AdminPath::consumer("slow")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(_)), "got {:?}", err);
    assert!(matches!(
        ProvisionError::from(err),
        ProvisionError::UpstreamTimeout(_)
    ));
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    // Reserve a port, then free it so nothing is listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (_, client) = client(&format!("http://{}", addr), Duration::from_secs(2));
    let err = client.lookup(&AdminPath::consumer("alice")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Unreachable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_registry_over_http() {
    let base = spawn_fake_admin().await;
    let (_, client) = client(&base, Duration::from_secs(5));
    let registry = ConsumerRegistry::new(Arc::new(client));

    let (consumer, created) = registry.get_or_create_consumer("alice").await.unwrap();
    assert_eq!(consumer.id, "c-1");
    assert!(!created);

    let (_, created) = registry.get_or_create_consumer("newcomer").await.unwrap();
    assert!(created);

    let entries = registry.list_credentials("alice").await.unwrap();
    assert_eq!(entries.len(), 2);

    let provisioned = registry.create_credential("alice", "laptop").await.unwrap();
    assert_eq!(provisioned.key, "laptop");

    let retried = registry.create_credential("alice", "dup").await.unwrap();
    assert!(retried.key.starts_with("dup_"));

    let missing = registry.create_credential("ghost", "laptop").await;
    assert!(matches!(missing, Err(ProvisionError::ConsumerNotFound(_))));
}
