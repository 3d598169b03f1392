mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, create, delete, get, patch_json, post_json, seed_tree};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn actual_cost(pool: &PgPool, item_id: i64) -> f64 {
    let response = get(build_test_app(pool.clone()), &format!("/api/wbs/{item_id}")).await;
    body_json(response).await["actualCost"].as_f64().unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn posting_and_removing_costs_moves_actual_cost(pool: PgPool) {
    let (_, _, wp, ..) = seed_tree(&pool).await;

    let entry = create(
        &pool,
        "/api/costs",
        json!({"wbsItemId": wp, "amount": 125.5, "description": "Excavator hire", "entryDate": "2024-01-03"}),
    )
    .await;
    assert_eq!(entry["amount"], 125.5);
    assert_eq!(actual_cost(&pool, wp).await, 125.5);

    let id = entry["id"].as_i64().unwrap();
    let response = patch_json(
        build_test_app(pool.clone()),
        &format!("/api/costs/{id}"),
        json!({"amount": 100}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(actual_cost(&pool, wp).await, 100.0);

    let response = delete(build_test_app(pool.clone()), &format!("/api/costs/{id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(actual_cost(&pool, wp).await, 0.0);

    let response = get(build_test_app(pool), &format!("/api/costs/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn credits_reduce_actual_cost(pool: PgPool) {
    let (_, _, wp, ..) = seed_tree(&pool).await;

    create(&pool, "/api/costs", json!({"wbsItemId": wp, "amount": 300})).await;
    let credit = create(&pool, "/api/costs", json!({"wbsItemId": wp, "amount": -80})).await;
    assert!(credit["entryDate"].is_string());
    assert_eq!(actual_cost(&pool, wp).await, 220.0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn zero_amount_and_activity_targets_are_rejected(pool: PgPool) {
    let (_, _, wp, a1, _) = seed_tree(&pool).await;

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/costs",
        json!({"wbsItemId": wp, "amount": 0}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/costs",
        json!({"wbsItemId": a1, "amount": 10}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        build_test_app(pool),
        "/api/costs",
        json!({"wbsItemId": 999999, "amount": 10}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn amounts_beyond_the_money_column_are_rejected(pool: PgPool) {
    let (project, _, wp, ..) = seed_tree(&pool).await;

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/costs",
        json!({"wbsItemId": wp, "amount": 1e14}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = patch_json(
        build_test_app(pool.clone()),
        &format!("/api/projects/{project}"),
        json!({"budget": 1e14}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Each entry fits, but the running actual cost would not.
    create(&pool, "/api/costs", json!({"wbsItemId": wp, "amount": 9e12})).await;
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/costs",
        json!({"wbsItemId": wp, "amount": 9e12}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(actual_cost(&pool, wp).await, 9e12);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_by_item_or_project(pool: PgPool) {
    let (project, summary, wp, ..) = seed_tree(&pool).await;
    create(&pool, "/api/costs", json!({"wbsItemId": wp, "amount": 10})).await;
    create(&pool, "/api/costs", json!({"wbsItemId": wp, "amount": 20})).await;
    create(&pool, "/api/costs", json!({"wbsItemId": summary, "amount": 5})).await;

    let response = get(build_test_app(pool.clone()), &format!("/api/costs?wbsItemId={wp}")).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

    let response = get(build_test_app(pool.clone()), &format!("/api/costs?projectId={project}")).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);

    let response = get(build_test_app(pool), "/api/costs").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

fn metric(json: &Value, key: &str) -> f64 {
    json[key].as_f64().unwrap_or_else(|| panic!("{key} missing in {json}"))
}

#[sqlx::test(migrations = "../db/migrations")]
async fn metrics_roll_up_earned_value(pool: PgPool) {
    let (project, summary, wp, a1, _) = seed_tree(&pool).await;

    let response = patch_json(
        build_test_app(pool.clone()),
        &format!("/api/wbs/{a1}/progress"),
        json!({"percentComplete": 50}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    create(&pool, "/api/costs", json!({"wbsItemId": wp, "amount": 200})).await;
    create(&pool, "/api/costs", json!({"wbsItemId": summary, "amount": 50})).await;

    let response = get(
        build_test_app(pool.clone()),
        &format!("/api/projects/{project}/metrics?asOf=2024-01-31"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["asOf"], "2024-01-31");

    // Two ten-day Activities at 50% and 0% leave the package 25% done.
    let package = &json["workPackages"][0];
    assert_eq!(package["wbsItemId"], wp);
    assert_eq!(metric(package, "earnedValue"), 150.0);
    assert_eq!(metric(package, "plannedValue"), 600.0);
    assert_eq!(metric(package, "cpi"), 0.75);
    assert_eq!(metric(package, "spi"), 0.25);
    assert_eq!(package["startDate"], "2024-01-01");
    assert_eq!(package["endDate"], "2024-01-20");

    assert_eq!(metric(&json, "budget"), 600.0);
    assert_eq!(metric(&json, "actualCost"), 250.0);
    assert_eq!(metric(&json, "costVariance"), -100.0);
    assert_eq!(metric(&json, "cpi"), 0.6);
    assert_eq!(metric(&json, "percentComplete"), 25.0);

    let response = get(
        build_test_app(pool),
        &format!("/api/projects/{project}/metrics?asOf=2024-01-05"),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(metric(&json, "plannedValue"), 150.0);
    assert_eq!(metric(&json, "spi"), 1.0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn metrics_without_spend_have_no_cpi(pool: PgPool) {
    let (project, ..) = seed_tree(&pool).await;

    let response = get(
        build_test_app(pool),
        &format!("/api/projects/{project}/metrics?asOf=2023-12-01"),
    )
    .await;
    let json = body_json(response).await;
    assert!(json["cpi"].is_null());
    assert!(json["spi"].is_null());
    assert_eq!(metric(&json, "earnedValue"), 0.0);
}
