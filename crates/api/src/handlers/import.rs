//! CSV import handlers.
//!
//! The request body is the raw CSV file. Every row is parsed and checked
//! before anything is written; any rejected row fails the whole import with
//! a 400 listing each `{ row, message }`, and accepted imports are written
//! in a single transaction.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use groundwork_core::import::{
    parse_cost_rows, parse_wbs_rows, plan_cost_import, plan_wbs_import, ExistingNode,
};
use groundwork_core::types::DbId;
use groundwork_db::models::cost_entry::{CostEntry, NewCostEntry};
use groundwork_db::models::wbs_item::WbsItem;
use groundwork_db::repositories::{CostEntryRepo, WbsItemRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extract::QueryParams;
use crate::handlers::project::find_project;
use crate::query::ProjectIdParams;
use crate::state::AppState;

/// Response body of a successful import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse<T: Serialize> {
    pub imported: usize,
    pub items: Vec<T>,
}

impl<T: Serialize> ImportResponse<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            imported: items.len(),
            items,
        }
    }
}

async fn existing_nodes(state: &AppState, project_id: DbId) -> AppResult<Vec<ExistingNode>> {
    let items = WbsItemRepo::list_by_project(&state.pool, project_id).await?;
    Ok(items
        .iter()
        .map(WbsItem::to_existing_node)
        .collect::<Result<Vec<_>, _>>()?)
}

fn require_body(body: &Bytes) -> AppResult<()> {
    if body.is_empty() {
        return Err(AppError::BadRequest("CSV body is empty".to_string()));
    }
    Ok(())
}

/// POST /api/costs/import?projectId=
pub async fn import_costs(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ProjectIdParams>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ImportResponse<CostEntry>>)> {
    find_project(&state, params.project_id).await?;
    require_body(&body)?;

    let rows = parse_cost_rows(&body)?;
    let nodes = existing_nodes(&state, params.project_id).await?;
    let planned = plan_cost_import(&nodes, rows)?;

    let entries: Vec<NewCostEntry> = planned
        .into_iter()
        .map(|(wbs_item_id, row)| NewCostEntry {
            wbs_item_id,
            amount: row.amount,
            description: row.description,
            entry_date: row.entry_date,
        })
        .collect();
    let created = CostEntryRepo::create_many(&state.pool, &entries).await?;
    tracing::info!(
        project_id = params.project_id,
        imported = created.len(),
        "Cost entries imported",
    );
    Ok((StatusCode::CREATED, Json(ImportResponse::new(created))))
}

/// POST /api/wbs/import?projectId=
pub async fn import_wbs(
    state: State<AppState>,
    params: QueryParams<ProjectIdParams>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ImportResponse<WbsItem>>)> {
    import_tree(state, params, body, false).await
}

/// POST /api/wbs/activities/import?projectId=
///
/// Only Activity rows are accepted, each under an existing or imported
/// WorkPackage.
pub async fn import_activities(
    state: State<AppState>,
    params: QueryParams<ProjectIdParams>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ImportResponse<WbsItem>>)> {
    import_tree(state, params, body, true).await
}

async fn import_tree(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ProjectIdParams>,
    body: Bytes,
    activities_only: bool,
) -> AppResult<(StatusCode, Json<ImportResponse<WbsItem>>)> {
    let project = find_project(&state, params.project_id).await?;
    require_body(&body)?;

    let rows = parse_wbs_rows(&body)?;
    let nodes = existing_nodes(&state, project.id).await?;
    let plan = plan_wbs_import(&nodes, rows, project.budget, activities_only)?;

    let created = WbsItemRepo::create_many(&state.pool, project.id, &plan).await?;
    tracing::info!(
        project_id = project.id,
        imported = created.len(),
        activities_only,
        "WBS items imported",
    );
    Ok((StatusCode::CREATED, Json(ImportResponse::new(created))))
}
