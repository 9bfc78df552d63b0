//! HTTP 接口测试

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use bank_recon_rust::api;
use common::*;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec(), content_type)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn app_with_fixtures() -> axum::Router {
    let store = store_with(
        vec![
            tx(1, "-15000", "2024-03-10", "", Some("F1023")),
            tx(2, "5000", "2024-03-01", "", None),
        ],
        vec![
            entry(10, "-15000", "2024-03-10", "", Some("F1023")),
            entry(11, "5000", "2024-03-04", "", None),
        ],
    );
    api::router(Arc::new(service(&store)))
}

#[tokio::test]
async fn test_auto_reconcile_endpoint() {
    let app = app_with_fixtures();

    let (status, body, _) = send(
        app.clone(),
        post_json("/api/reconcile/auto", json!({ "bank_account_id": ACCOUNT, "amount_tolerance": 0.01 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["summary"]["total"], 2);
    assert_eq!(value["summary"]["by_method"]["exact"], 1);
    assert_eq!(value["summary"]["by_method"]["amount_range"], 1);
    assert_eq!(value["matches"][0]["match_type"], "exact");

    let (status, body, content_type) = send(
        app,
        Request::builder()
            .uri(format!("/api/accounts/{}/matches.csv", ACCOUNT))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv; charset=utf-8"));
    let text = String::from_utf8(body).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.starts_with("id,bank_transaction_id,accounting_entry_id"));
}

#[tokio::test]
async fn test_error_status_codes() {
    let app = app_with_fixtures();

    let (status, body, _) = send(app.clone(), post_json("/api/reconcile/auto", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], false);

    let (status, _, _) = send(
        app.clone(),
        Request::builder()
            .method("DELETE")
            .uri("/api/matches/404")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        app,
        post_json("/api/matches", json!({ "transaction_id": 1, "entry_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_match_and_preview_endpoints() {
    let app = app_with_fixtures();

    let (status, body, _) = send(
        app.clone(),
        post_json("/api/matches/preview", json!({ "transaction_id": 2, "entry_id": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&body).unwrap();
    // 20 + 50 + 25
    assert_eq!(value["score"], 95);

    let (status, body, _) = send(
        app.clone(),
        post_json("/api/matches", json!({ "transaction_id": 2, "entry_id": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(created["match_type"], "manual");
    assert_eq!(created["confidence"], 100);

    let id = created["id"].as_i64().unwrap();
    let (status, _, _) = send(
        app.clone(),
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/matches/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = send(
        app,
        Request::builder()
            .uri(format!("/api/accounts/{}/matches", ACCOUNT))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
}
