//! Handlers for the `/projects` resource.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use groundwork_core::evm::{self, ActivityProgress, ProjectMetrics, WorkPackageInput};
use groundwork_core::project::validate_project_fields;
use groundwork_core::schedule::validate_date_range;
use groundwork_core::types::{DbId, Money};
use groundwork_core::wbs::{check_budget_covers_children, WbsItemType};
use groundwork_db::models::project::{CreateProject, Project, UpdateProject};
use groundwork_db::models::wbs_item::{build_tree, WbsItem, WbsTreeNode};
use groundwork_db::repositories::{ProjectRepo, WbsItemRepo};

use crate::error::{AppError, AppResult};
use crate::extract::{QueryParams, ValidJson};
use crate::query::MetricsParams;
use crate::state::AppState;

/// Load a project or fail with 404.
pub(crate) async fn find_project(state: &AppState, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Project", id))
}

/// POST /api/projects
pub async fn create(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateProject>,
) -> AppResult<(StatusCode, Json<Project>)> {
    validate_project_fields(
        input.start_date,
        input.end_date,
        input.budget,
        input.currency.as_deref(),
    )?;
    let project = ProjectRepo::create(&state.pool, &input).await?;
    tracing::info!(project_id = project.id, name = %project.name, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Project>>> {
    let projects = ProjectRepo::list(&state.pool).await?;
    Ok(Json(projects))
}

/// GET /api/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Project>> {
    Ok(Json(find_project(&state, id).await?))
}

/// PATCH /api/projects/{id}
///
/// Lowering the budget below what the root items already claim is rejected.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateProject>,
) -> AppResult<Json<Project>> {
    let existing = find_project(&state, id).await?;

    validate_project_fields(None, None, input.budget, input.currency.as_deref())?;
    validate_date_range(
        input.start_date.or(existing.start_date),
        input.end_date.or(existing.end_date),
    )?;
    if let Some(budget) = input.budget.filter(|b| *b < existing.budget) {
        let allocated = WbsItemRepo::child_budgets(&state.pool, id, None, None).await?;
        check_budget_covers_children(budget, &allocated)?;
    }

    let project = ProjectRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Project", id))?;
    Ok(Json(project))
}

/// DELETE /api/projects/{id}
///
/// Removes the whole WBS, dependencies, costs and tasks with it.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if ProjectRepo::delete(&state.pool, id).await? {
        tracing::info!(project_id = id, "Project deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Project", id))
    }
}

/// GET /api/projects/{id}/tree
pub async fn tree(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Vec<WbsTreeNode>>> {
    find_project(&state, id).await?;
    let items = WbsItemRepo::list_by_project(&state.pool, id).await?;
    Ok(Json(build_tree(items)))
}

/// GET /api/projects/{id}/metrics?asOf=
pub async fn metrics(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    QueryParams(params): QueryParams<MetricsParams>,
) -> AppResult<Json<ProjectMetrics>> {
    find_project(&state, id).await?;
    let items = WbsItemRepo::list_by_project(&state.pool, id).await?;
    let (work_packages, summary_cost) = evm_inputs(&items)?;
    let as_of = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(evm::summarize(&work_packages, summary_cost, as_of)))
}

/// Group Activities under their WorkPackages and total the spend posted
/// directly to Summaries.
fn evm_inputs(items: &[WbsItem]) -> AppResult<(Vec<WorkPackageInput>, Money)> {
    let mut activities: HashMap<DbId, Vec<ActivityProgress>> = HashMap::new();
    let mut work_packages = Vec::new();
    let mut summary_cost = Money::ZERO;

    for item in items {
        match item.item_type()? {
            WbsItemType::Summary => summary_cost += item.actual_cost,
            WbsItemType::WorkPackage => work_packages.push(item),
            WbsItemType::Activity => {
                if let Some(parent_id) = item.parent_id {
                    activities.entry(parent_id).or_default().push(ActivityProgress {
                        percent_complete: item.percent_complete,
                        duration_days: item.duration_days,
                        start_date: item.start_date,
                        end_date: item.end_date,
                    });
                }
            }
        }
    }

    let inputs = work_packages
        .into_iter()
        .map(|wp| WorkPackageInput {
            id: wp.id,
            code: wp.code.clone(),
            name: wp.name.clone(),
            budget: wp.budget_or_zero(),
            actual_cost: wp.actual_cost,
            activities: activities.remove(&wp.id).unwrap_or_default(),
        })
        .collect();
    Ok((inputs, summary_cost))
}
