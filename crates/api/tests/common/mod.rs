#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use groundwork_api::config::ServerConfig;
use groundwork_api::router::build_app_router;
use groundwork_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        db_connect_attempts: 1,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool. Same construction as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(test_config()),
    };
    build_app_router(state)
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    content_type: &str,
    body: Body,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(body)
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: Value) -> Response<Body> {
    send(app, Method::POST, uri, "application/json", Body::from(json.to_string())).await
}

pub async fn patch_json(app: Router, uri: &str, json: Value) -> Response<Body> {
    send(app, Method::PATCH, uri, "application/json", Body::from(json.to_string())).await
}

/// POST an arbitrary body with the given content type.
pub async fn send_raw(app: Router, uri: &str, content_type: &str, body: &str) -> Response<Body> {
    send(app, Method::POST, uri, content_type, Body::from(body.to_string())).await
}

pub async fn post_csv(app: Router, uri: &str, csv: &str) -> Response<Body> {
    send(app, Method::POST, uri, "text/csv", Body::from(csv.to_string())).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a resource and return its JSON body, asserting a 201.
pub async fn create(pool: &PgPool, uri: &str, json: Value) -> Value {
    let response = post_json(build_test_app(pool.clone()), uri, json).await;
    let status = response.status();
    let body = body_json(response).await;
    assert_eq!(status, 201, "POST {uri} failed: {body}");
    body
}

pub async fn create_project(pool: &PgPool, budget: f64) -> i64 {
    let project = create(
        pool,
        "/api/projects",
        serde_json::json!({"name": "Riverside Depot", "budget": budget}),
    )
    .await;
    project["id"].as_i64().unwrap()
}

/// Create a WBS item and return its id.
pub async fn create_item(pool: &PgPool, body: Value) -> i64 {
    create(pool, "/api/wbs", body).await["id"].as_i64().unwrap()
}

/// Project with `1` Summary (budget 1000), `1.1` WorkPackage (budget 600)
/// and two Activities `1.1.1` / `1.1.2`. Returns (project, summary,
/// work package, activity 1, activity 2).
pub async fn seed_tree(pool: &PgPool) -> (i64, i64, i64, i64, i64) {
    let project = create_project(pool, 2000.0).await;
    let summary = create_item(
        pool,
        serde_json::json!({"projectId": project, "name": "Site", "itemType": "Summary", "budget": 1000}),
    )
    .await;
    let wp = create_item(
        pool,
        serde_json::json!({"projectId": project, "parentId": summary, "name": "Earthworks", "itemType": "WorkPackage", "budget": 600}),
    )
    .await;
    let a1 = create_item(
        pool,
        serde_json::json!({
            "projectId": project, "parentId": wp, "name": "Excavate", "itemType": "Activity",
            "startDate": "2024-01-01", "endDate": "2024-01-10"
        }),
    )
    .await;
    let a2 = create_item(
        pool,
        serde_json::json!({
            "projectId": project, "parentId": wp, "name": "Backfill", "itemType": "Activity",
            "startDate": "2024-01-11", "durationDays": 10
        }),
    )
    .await;
    (project, summary, wp, a1, a2)
}
