mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::{Test, test_entity};
use http_body_util::BodyExt;
use scopedcrud::transport::http::router;
use scopedcrud::{EntityDescriptor, ErrorKind, MemoryStore, Operation, Registry};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn registry(prefix: &str) -> Registry {
    let mut registry = Registry::new(prefix);
    assert!(registry.register(Arc::new(MemoryStore::new()), test_entity()));
    registry.migrate_all().await.unwrap();
    registry
}

async fn request_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    request_raw(app, uri, body.to_string()).await
}

async fn request_raw(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .expect("valid request"),
        )
        .await
        .expect("router should respond");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response should be JSON")
    };
    (status, value)
}

#[tokio::test]
async fn test_register_skips_unnamed_entities() {
    let mut registry = Registry::new("svc");
    let engine = Arc::new(MemoryStore::new());

    assert!(!registry.register(engine.clone(), EntityDescriptor::<Test>::new("")));
    assert!(registry.register(engine, test_entity()));
    assert_eq!(registry.entity_names(), ["test"]);
    assert!(registry.module("test").is_some());
    assert!(registry.module("").is_none());
}

#[tokio::test]
async fn test_messages_route_by_subject() {
    let registry = registry("svc").await;
    let subject = registry.subject("test", Operation::Create);
    assert_eq!(subject, "svc.test.create");

    let created = registry
        .handle_message(
            &subject,
            json!({"entity": {"name": "Test", "age": 42}})
                .to_string()
                .as_bytes(),
        )
        .await
        .unwrap();
    assert_eq!(created["name"], json!("Test"));
    let id = created["id"].clone();

    let read = registry
        .handle_message(
            "svc.test.read",
            json!({"id": id, "filters": {"min": {"age": "44"}}})
                .to_string()
                .as_bytes(),
        )
        .await
        .unwrap_err();
    assert_eq!(read.kind(), ErrorKind::Generic);

    let deleted = registry
        .handle_message("svc.test.delete", json!({"id": id}).to_string().as_bytes())
        .await
        .unwrap();
    assert_eq!(deleted, Value::Null);

    let err = registry
        .handle_message("svc.ghost.read", b"{\"id\": 1}")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generic);

    let err = registry
        .handle_message("svc.test.upsert", b"{}")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generic);
}

#[tokio::test]
async fn test_malformed_envelope_is_decode() {
    let registry = registry("").await;
    let err = registry
        .dispatch("test", Operation::Read, b"{\"id\": ")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    let err = registry
        .dispatch("test", Operation::Search, b"{\"take\": -1}")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_http_round_trip_under_prefix() {
    let app = router(Arc::new(registry("api").await));

    let (status, created) = request_json(
        app.clone(),
        "/api/test/create",
        json!({"entity": {"name": "Test", "age": 45}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_i64().expect("engine-assigned id");

    let (status, read) = request_json(
        app.clone(),
        "/api/test/read",
        json!({"id": id.to_string(), "filters": {"min": {"age": "44"}}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read, created);

    let (status, patched) = request_json(
        app.clone(),
        "/api/test/patch",
        json!({"id": id, "data": {"age": 46}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["age"], json!(46));

    let (status, found) = request_json(
        app.clone(),
        "/api/test/search",
        json!({"skip": 0, "take": 10, "where": {"name": "Test"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().map(Vec::len), Some(1));

    let (status, deleted) =
        request_json(app.clone(), "/api/test/delete", json!({"id": id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, Value::Null);
}

#[tokio::test]
async fn test_http_error_statuses() {
    let app = router(Arc::new(registry("").await));

    let (status, problem) = request_json(
        app.clone(),
        "/test/create",
        json!({"entity": {"name": 42, "age": "x"}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], json!("DECODE"));

    let (status, problem) = request_json(
        app.clone(),
        "/test/create",
        json!({"entity": {"name": "", "age": 1}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(problem["code"], json!("VALIDATION"));

    let (status, problem) = request_json(app.clone(), "/test/read", json!({"id": 404})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(problem["code"], json!("GENERIC"));

    let (status, problem) = request_raw(app.clone(), "/test/update", "not json".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], json!("DECODE"));
}

#[tokio::test]
async fn test_http_unknown_routes_are_not_found() {
    let app = router(Arc::new(registry("api").await));

    let (status, problem) = request_json(app.clone(), "/api/ghost/read", json!({"id": 1})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], json!("GENERIC"));

    let (status, _) = request_json(app.clone(), "/api/test/upsert", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, problem) = request_json(app, "/elsewhere", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], json!("GENERIC"));
}
