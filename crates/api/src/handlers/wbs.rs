//! Handlers for the `/wbs` resource.
//!
//! Every write loads the rows a rule needs, runs the pure checks from
//! `groundwork_core::wbs`, then persists.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use groundwork_core::error::CoreError;
use groundwork_core::schedule::{
    apply_schedule_patch, resolve_schedule, validate_percent_complete, Schedule,
};
use groundwork_core::types::{DbId, Money};
use groundwork_core::wbs::{self, WbsItemType};
use groundwork_db::models::project::Project;
use groundwork_db::models::wbs_item::{
    CreateWbsItem, NewWbsItem, UpdateProgress, UpdateWbsItem, WbsItem,
};
use groundwork_db::repositories::WbsItemRepo;

use crate::error::{AppError, AppResult};
use crate::extract::{QueryParams, ValidJson};
use crate::handlers::project::find_project;
use crate::query::ProjectIdParams;
use crate::state::AppState;

/// Load a WBS item or fail with 404.
pub(crate) async fn find_item(state: &AppState, id: DbId) -> AppResult<WbsItem> {
    WbsItemRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("WbsItem", id))
}

/// The prospective parent and its ancestors, nearest first, checked to
/// belong to `project_id`.
async fn parent_lineage(
    state: &AppState,
    project_id: DbId,
    parent_id: DbId,
) -> AppResult<Vec<WbsItem>> {
    let lineage = WbsItemRepo::lineage(&state.pool, parent_id).await?;
    match lineage.first() {
        None => Err(AppError::not_found("WbsItem", parent_id)),
        Some(parent) if parent.project_id != project_id => Err(CoreError::Validation(format!(
            "Parent item {parent_id} belongs to a different project"
        ))
        .into()),
        Some(_) => Ok(lineage),
    }
}

fn lineage_types(lineage: &[WbsItem]) -> AppResult<Vec<WbsItemType>> {
    Ok(lineage
        .iter()
        .map(WbsItem::item_type)
        .collect::<Result<Vec<_>, _>>()?)
}

/// Check the budget rollup for a budget-bearing item placed under `parent`
/// (or at the project root).
async fn check_rollup(
    state: &AppState,
    project: &Project,
    parent: Option<&WbsItem>,
    exclude_id: Option<DbId>,
    budget: Money,
) -> AppResult<()> {
    let siblings = WbsItemRepo::child_budgets(
        &state.pool,
        project.id,
        parent.map(|p| p.id),
        exclude_id,
    )
    .await?;
    let (label, available) = match parent {
        Some(p) => (format!("parent '{}'", p.code), p.budget_or_zero()),
        None => ("the project budget".to_string(), project.budget),
    };
    wbs::check_budget_rollup(&label, available, &siblings, budget)?;
    Ok(())
}

/// GET /api/wbs?projectId=
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ProjectIdParams>,
) -> AppResult<Json<Vec<WbsItem>>> {
    find_project(&state, params.project_id).await?;
    let items = WbsItemRepo::list_by_project(&state.pool, params.project_id).await?;
    Ok(Json(items))
}

/// GET /api/wbs/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<WbsItem>> {
    Ok(Json(find_item(&state, id).await?))
}

/// POST /api/wbs
pub async fn create(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateWbsItem>,
) -> AppResult<(StatusCode, Json<WbsItem>)> {
    let project = find_project(&state, input.project_id).await?;
    let lineage = match input.parent_id {
        Some(parent_id) => parent_lineage(&state, project.id, parent_id).await?,
        None => Vec::new(),
    };
    let parent = lineage.first();

    wbs::validate_placement(input.item_type, &lineage_types(&lineage)?)?;
    let schedule = resolve_schedule(input.start_date, input.end_date, input.duration_days)?;
    wbs::validate_type_fields(input.item_type, input.budget.is_some(), !schedule.is_empty())?;

    let budget = if input.item_type.is_budget_bearing() {
        let budget = input.budget.unwrap_or(Money::ZERO);
        wbs::validate_budget(budget)?;
        check_rollup(&state, &project, parent, None, budget).await?;
        Some(budget)
    } else {
        None
    };

    let code = match input.code {
        Some(code) => {
            wbs::validate_code(&code)?;
            code
        }
        None => {
            let siblings =
                WbsItemRepo::sibling_codes(&state.pool, project.id, input.parent_id).await?;
            wbs::next_child_code(parent.map(|p| p.code.as_str()), &siblings)?
        }
    };

    let new_item = NewWbsItem {
        project_id: project.id,
        parent_id: input.parent_id,
        code,
        name: input.name,
        description: input.description,
        item_type: input.item_type,
        budget,
        start_date: schedule.start_date,
        end_date: schedule.end_date,
        duration_days: schedule.duration_days,
        sort_order: input.sort_order.unwrap_or(0),
    };
    let item = WbsItemRepo::create(&state.pool, &new_item).await?;
    tracing::info!(
        wbs_item_id = item.id,
        project_id = item.project_id,
        code = %item.code,
        item_type = %item.item_type,
        "WBS item created",
    );
    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /api/wbs/{id}
///
/// Retyping, moving and budget changes are re-checked against the whole
/// neighbourhood: the new parent, the siblings there and the item's own
/// children.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateWbsItem>,
) -> AppResult<Json<WbsItem>> {
    let existing = find_item(&state, id).await?;
    let project = find_project(&state, existing.project_id).await?;
    let current_type = existing.item_type()?;
    let new_type = input.item_type.unwrap_or(current_type);

    let moving = input.parent_id.is_some() && input.parent_id != existing.parent_id;
    let retyping = new_type != current_type;
    let new_parent_id = input.parent_id.or(existing.parent_id);

    let lineage = match new_parent_id {
        Some(parent_id) => parent_lineage(&state, project.id, parent_id).await?,
        None => Vec::new(),
    };
    if moving {
        let ids: Vec<DbId> = lineage.iter().map(|i| i.id).collect();
        wbs::validate_reparent(id, &ids)?;
    }
    if moving || retyping {
        wbs::validate_placement(new_type, &lineage_types(&lineage)?)?;
        let children = WbsItemRepo::list_children(&state.pool, id).await?;
        let child_types = lineage_types(&children)?;
        wbs::validate_children_compatible(new_type, &child_types)?;
    }

    let current_schedule = Schedule {
        start_date: existing.start_date,
        end_date: existing.end_date,
        duration_days: existing.duration_days,
    };
    let patch = Schedule {
        start_date: input.start_date,
        end_date: input.end_date,
        duration_days: input.duration_days,
    };
    let schedule = apply_schedule_patch(current_schedule, patch)?;
    let budget = input.budget.or(existing.budget);
    wbs::validate_type_fields(new_type, budget.is_some(), !schedule.is_empty())?;

    if new_type.is_budget_bearing() {
        let new_budget = budget.unwrap_or(Money::ZERO);
        wbs::validate_budget(new_budget)?;
        if moving || retyping || input.budget.is_some() {
            check_rollup(&state, &project, lineage.first(), Some(id), new_budget).await?;
        }
        if input.budget.is_some() {
            let committed =
                WbsItemRepo::child_budgets(&state.pool, project.id, Some(id), None).await?;
            wbs::check_budget_covers_children(new_budget, &committed)?;
        }
    }

    if let Some(code) = &input.code {
        wbs::validate_code(code)?;
    }

    let normalized = UpdateWbsItem {
        parent_id: input.parent_id,
        code: input.code,
        name: input.name,
        description: input.description,
        item_type: Some(new_type),
        budget: input.budget,
        start_date: schedule.start_date,
        end_date: schedule.end_date,
        duration_days: schedule.duration_days,
        sort_order: input.sort_order,
    };
    let item = WbsItemRepo::update(&state.pool, id, &normalized)
        .await?
        .ok_or(AppError::not_found("WbsItem", id))?;
    if moving || retyping {
        tracing::info!(
            wbs_item_id = id,
            parent_id = ?item.parent_id,
            item_type = %item.item_type,
            "WBS item restructured",
        );
    }
    Ok(Json(item))
}

/// PATCH /api/wbs/{id}/progress
pub async fn set_progress(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateProgress>,
) -> AppResult<Json<WbsItem>> {
    let existing = find_item(&state, id).await?;
    if !existing.item_type()?.has_schedule() {
        return Err(CoreError::Validation(format!(
            "Progress is tracked on Activities; '{}' is a {}",
            existing.code, existing.item_type
        ))
        .into());
    }
    validate_percent_complete(input.percent_complete)?;

    let item = WbsItemRepo::set_progress(&state.pool, id, input.percent_complete)
        .await?
        .ok_or(AppError::not_found("WbsItem", id))?;
    tracing::debug!(wbs_item_id = id, percent = item.percent_complete, "Progress updated");
    Ok(Json(item))
}

/// DELETE /api/wbs/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if WbsItemRepo::delete(&state.pool, id).await? {
        tracing::info!(wbs_item_id = id, "WBS item deleted with its subtree");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("WbsItem", id))
    }
}
