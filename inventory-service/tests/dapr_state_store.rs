//! Dapr HTTP state API client against a mock sidecar.

use httpmock::prelude::*;
use inventory_service::state_store::{DaprStateStore, StateStore, StoreError};
use serde_json::json;

#[tokio::test]
async fn missing_key_is_absent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/state/statestore/P404");
            then.status(204);
        })
        .await;
    let store = DaprStateStore::new(&server.base_url(), "statestore").unwrap();
    assert_eq!(store.get("P404").await.unwrap(), None);
    mock.assert_async().await;
}

#[tokio::test]
async fn present_key_returns_bytes_and_etag() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/state/statestore/P1");
            then.status(200)
                .header("ETag", "7")
                .body(r#"{"product_id":"P1","quantity":70}"#);
        })
        .await;
    let store = DaprStateStore::new(&server.base_url(), "statestore").unwrap();
    let entry = store.get("P1").await.unwrap().expect("present");
    assert_eq!(entry.value, br#"{"product_id":"P1","quantity":70}"#.to_vec());
    assert_eq!(entry.etag.as_deref(), Some("7"));
}

#[tokio::test]
async fn sidecar_error_on_read_is_surfaced() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1.0/state/statestore/P1");
            then.status(500).body("ERR_STATE_GET");
        })
        .await;
    let store = DaprStateStore::new(&server.base_url(), "statestore").unwrap();
    assert_eq!(
        store.get("P1").await.unwrap_err(),
        StoreError::UnexpectedStatus { status: 500, body: "ERR_STATE_GET".into() }
    );
}

#[tokio::test]
async fn unconditional_save_posts_json_value() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1.0/state/statestore")
                .json_body(json!([{ "key": "P1", "value": { "product_id": "P1", "quantity": 70 } }]));
            then.status(204);
        })
        .await;
    let store = DaprStateStore::new(&server.base_url(), "statestore").unwrap();
    store
        .put("P1", br#"{"product_id":"P1","quantity":70}"#.to_vec(), None)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn conditional_save_sends_etag_and_maps_conflict() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1.0/state/statestore").json_body(json!([{
                "key": "P1",
                "value": { "product_id": "P1", "quantity": 40 },
                "etag": "3",
                "options": { "concurrency": "first-write" }
            }]));
            then.status(409);
        })
        .await;
    let store = DaprStateStore::new(&server.base_url(), "statestore").unwrap();
    let err = store
        .put("P1", br#"{"product_id":"P1","quantity":40}"#.to_vec(), Some("3"))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::EtagMismatch("P1".into()));
}

#[tokio::test]
async fn unreachable_sidecar_is_unavailable() {
    // Nothing listens on port 9 locally.
    let store = DaprStateStore::new("http://127.0.0.1:9", "statestore").unwrap();
    assert!(matches!(store.get("P1").await, Err(StoreError::Unavailable(_))));
}
