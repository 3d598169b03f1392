mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, create_project, get, post_csv, seed_tree};
use sqlx::PgPool;

const WBS_HEADER: &str = "wbsCode,wbsName,wbsType,amount,startDate,endDate,duration\n";

async fn item_count(pool: &PgPool, project: i64) -> usize {
    let response = get(build_test_app(pool.clone()), &format!("/api/wbs?projectId={project}")).await;
    body_json(response).await.as_array().unwrap().len()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wbs_import_builds_the_tree_parents_first(pool: PgPool) {
    let project = create_project(&pool, 2000.0).await;
    let csv = format!(
        "{WBS_HEADER}1.1.1,Dig,Activity,,2024-01-01,,5\n1.1,Earthworks,Work Package,600,,,\n1,Site,Summary,1000,,,\n"
    );

    let response = post_csv(
        build_test_app(pool.clone()),
        &format!("/api/wbs/import?projectId={project}"),
        &csv,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["imported"], 3);
    let codes: Vec<&str> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["1", "1.1", "1.1.1"]);
    assert_eq!(json["items"][2]["parentId"], json["items"][1]["id"]);
    assert_eq!(json["items"][2]["endDate"], "2024-01-05");

    let response = get(build_test_app(pool), &format!("/api/projects/{project}/tree")).await;
    let tree = body_json(response).await;
    assert_eq!(tree[0]["children"][0]["children"][0]["name"], "Dig");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wbs_import_is_all_or_nothing(pool: PgPool) {
    let project = create_project(&pool, 2000.0).await;
    let csv = format!(
        "{WBS_HEADER}1,Site,Summary,1000,,,\n1.1,Survey,Activity,,,,\n1.2,Earthworks,WorkPackage,abc,,,\n"
    );

    let response = post_csv(
        build_test_app(pool.clone()),
        &format!("/api/wbs/import?projectId={project}"),
        &csv,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "IMPORT_FAILED");
    let rows: Vec<u64> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["row"].as_u64().unwrap())
        .collect();
    assert_eq!(rows, vec![4]);
    assert_eq!(item_count(&pool, project).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wbs_import_checks_budgets_against_existing_items(pool: PgPool) {
    let (project, ..) = seed_tree(&pool).await;
    let csv = format!("{WBS_HEADER}1.2,Roof,WorkPackage,500,,,\n");

    let response = post_csv(
        build_test_app(pool.clone()),
        &format!("/api/wbs/import?projectId={project}"),
        &csv,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["errors"][0]["row"], 2);
    assert_eq!(item_count(&pool, project).await, 4);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn activity_import_only_accepts_activities(pool: PgPool) {
    let (project, ..) = seed_tree(&pool).await;

    let csv = format!("{WBS_HEADER}1.1.3,Compact,Activity,,2024-01-21,2024-01-25,\n");
    let response = post_csv(
        build_test_app(pool.clone()),
        &format!("/api/wbs/activities/import?projectId={project}"),
        &csv,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["items"][0]["durationDays"], 5);

    let csv = format!("{WBS_HEADER}1.3,Fitout,WorkPackage,100,,,\n");
    let response = post_csv(
        build_test_app(pool.clone()),
        &format!("/api/wbs/activities/import?projectId={project}"),
        &csv,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(item_count(&pool, project).await, 5);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cost_import_posts_every_row(pool: PgPool) {
    let (project, summary, wp, ..) = seed_tree(&pool).await;
    let csv = "WBS Code,Amount,Description,Entry Date\n1.1,\"1,200.50\",Crane,2024-01-04\n1.1,-200.50,Refund,01/05/2024\n1,75,Permits,2024/01/02\n";

    let response = post_csv(
        build_test_app(pool.clone()),
        &format!("/api/costs/import?projectId={project}"),
        csv,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["imported"], 3);

    let response = get(build_test_app(pool.clone()), &format!("/api/wbs/{wp}")).await;
    assert_eq!(body_json(response).await["actualCost"], 1000.0);
    let response = get(build_test_app(pool), &format!("/api/wbs/{summary}")).await;
    assert_eq!(body_json(response).await["actualCost"], 75.0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cost_import_rejects_unknown_codes_and_activities(pool: PgPool) {
    let (project, _, wp, ..) = seed_tree(&pool).await;
    let csv = "wbsCode,amount,entryDate\n1.1,10,2024-01-01\n9.9,10,2024-01-01\n1.1.1,10,2024-01-01\n";

    let response = post_csv(
        build_test_app(pool.clone()),
        &format!("/api/costs/import?projectId={project}"),
        csv,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["errors"].as_array().unwrap().len(), 2);

    let response = get(build_test_app(pool), &format!("/api/wbs/{wp}")).await;
    assert_eq!(body_json(response).await["actualCost"], 0.0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_upload_is_a_bad_request(pool: PgPool) {
    let project = create_project(&pool, 100.0).await;

    let response = post_csv(
        build_test_app(pool.clone()),
        &format!("/api/wbs/import?projectId={project}"),
        "",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_csv(
        build_test_app(pool),
        "/api/wbs/import?projectId=999999",
        WBS_HEADER,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
