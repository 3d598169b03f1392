mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create, create_item, create_project, delete, get, patch_json,
    post_json, seed_tree,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn codes_are_generated_from_the_parent(pool: PgPool) {
    let (project, summary, wp, a1, a2) = seed_tree(&pool).await;

    for (id, code) in [(summary, "1"), (wp, "1.1"), (a1, "1.1.1"), (a2, "1.1.2")] {
        let response = get(build_test_app(pool.clone()), &format!("/api/wbs/{id}")).await;
        assert_eq!(body_json(response).await["code"], code);
    }

    let response = get(build_test_app(pool), &format!("/api/wbs?projectId={project}")).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 4);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn activity_schedule_is_completed_from_duration(pool: PgPool) {
    let (_, _, _, a1, a2) = seed_tree(&pool).await;

    let response = get(build_test_app(pool.clone()), &format!("/api/wbs/{a1}")).await;
    assert_eq!(body_json(response).await["durationDays"], 10);

    let response = get(build_test_app(pool), &format!("/api/wbs/{a2}")).await;
    let json = body_json(response).await;
    assert_eq!(json["itemType"], "Activity");
    assert_eq!(json["endDate"], "2024-01-20");
    assert!(json["budget"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn activity_directly_under_summary_is_rejected(pool: PgPool) {
    let (project, summary, ..) = seed_tree(&pool).await;

    let response = post_json(
        build_test_app(pool),
        "/api/wbs",
        json!({"projectId": project, "parentId": summary, "name": "Survey", "itemType": "Activity"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn root_must_be_a_summary(pool: PgPool) {
    let project = create_project(&pool, 1000.0).await;

    let response = post_json(
        build_test_app(pool),
        "/api/wbs",
        json!({"projectId": project, "name": "Loose", "itemType": "WorkPackage", "budget": 10}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn type_specific_fields_are_enforced(pool: PgPool) {
    let (project, summary, wp, ..) = seed_tree(&pool).await;

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/wbs",
        json!({"projectId": project, "parentId": wp, "name": "Paid", "itemType": "Activity", "budget": 5}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        build_test_app(pool),
        "/api/wbs",
        json!({
            "projectId": project, "parentId": summary, "name": "Dated", "itemType": "WorkPackage",
            "startDate": "2024-01-01"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn child_budgets_cannot_exceed_parent(pool: PgPool) {
    let (project, summary, wp, ..) = seed_tree(&pool).await;

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/wbs",
        json!({"projectId": project, "parentId": summary, "name": "Roof", "itemType": "WorkPackage", "budget": 500}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = body_json(response).await["message"].as_str().unwrap().to_string();
    assert!(message.contains("400"), "unexpected message: {message}");

    create_item(
        &pool,
        json!({"projectId": project, "parentId": summary, "name": "Roof", "itemType": "WorkPackage", "budget": 400}),
    )
    .await;

    let response = patch_json(
        build_test_app(pool),
        &format!("/api/wbs/{wp}"),
        json!({"budget": 700}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn root_budgets_cannot_exceed_project(pool: PgPool) {
    let (project, ..) = seed_tree(&pool).await;

    let response = post_json(
        build_test_app(pool),
        "/api/wbs",
        json!({"projectId": project, "name": "Extras", "itemType": "Summary", "budget": 1500}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn parent_budget_cannot_drop_below_children(pool: PgPool) {
    let (_, summary, ..) = seed_tree(&pool).await;

    let response = patch_json(
        build_test_app(pool.clone()),
        &format!("/api/wbs/{summary}"),
        json!({"budget": 599}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = patch_json(
        build_test_app(pool),
        &format!("/api/wbs/{summary}"),
        json!({"budget": 600, "name": "Site works"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["budget"], 600.0);
    assert_eq!(json["name"], "Site works");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_code_is_a_conflict(pool: PgPool) {
    let (project, ..) = seed_tree(&pool).await;

    let response = post_json(
        build_test_app(pool),
        "/api/wbs",
        json!({"projectId": project, "code": "1", "name": "Again", "itemType": "Summary"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn moving_under_own_descendant_is_rejected(pool: PgPool) {
    let (project, summary, wp, ..) = seed_tree(&pool).await;
    let inner = create_item(
        &pool,
        json!({"projectId": project, "parentId": summary, "name": "Inner", "itemType": "Summary", "budget": 100}),
    )
    .await;

    let response = patch_json(
        build_test_app(pool.clone()),
        &format!("/api/wbs/{summary}"),
        json!({"parentId": inner}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = patch_json(
        build_test_app(pool),
        &format!("/api/wbs/{wp}"),
        json!({"parentId": inner}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST, "600 does not fit in 100");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn schedule_patch_keeps_duration_when_start_moves(pool: PgPool) {
    let (_, _, _, a1, _) = seed_tree(&pool).await;

    let response = patch_json(
        build_test_app(pool),
        &format!("/api/wbs/{a1}"),
        json!({"startDate": "2024-02-01"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["durationDays"], 10);
    assert_eq!(json["endDate"], "2024-02-10");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn progress_is_tracked_on_activities(pool: PgPool) {
    let (_, _, wp, a1, _) = seed_tree(&pool).await;

    let response = patch_json(
        build_test_app(pool.clone()),
        &format!("/api/wbs/{a1}/progress"),
        json!({"percentComplete": 40}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["percentComplete"], 40);

    let response = patch_json(
        build_test_app(pool.clone()),
        &format!("/api/wbs/{a1}/progress"),
        json!({"percentComplete": 140}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = patch_json(
        build_test_app(pool),
        &format!("/api/wbs/{wp}/progress"),
        json!({"percentComplete": 10}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn deleting_an_item_removes_its_subtree(pool: PgPool) {
    let (_, _, wp, a1, _) = seed_tree(&pool).await;

    let response = delete(build_test_app(pool.clone()), &format!("/api/wbs/{wp}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(build_test_app(pool), &format!("/api/wbs/{a1}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn tasks_live_under_activities(pool: PgPool) {
    let (_, _, wp, a1, _) = seed_tree(&pool).await;

    let task = create(
        &pool,
        &format!("/api/wbs/{a1}/tasks"),
        json!({"name": "Mark out", "startDate": "2024-01-01", "durationDays": 2}),
    )
    .await;
    assert_eq!(task["endDate"], "2024-01-02");
    assert_eq!(task["percentComplete"], 0);
    let task_id = task["id"].as_i64().unwrap();

    let response = get(build_test_app(pool.clone()), &format!("/api/wbs/{a1}/tasks")).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

    let response = patch_json(
        build_test_app(pool.clone()),
        &format!("/api/tasks/{task_id}"),
        json!({"endDate": "2024-01-04", "percentComplete": 50}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["durationDays"], 4);
    assert_eq!(json["percentComplete"], 50);

    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/wbs/{wp}/tasks"),
        json!({"name": "Wrong level"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = delete(build_test_app(pool.clone()), &format!("/api/tasks/{task_id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(build_test_app(pool), &format!("/api/tasks/{task_id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
