//! Handlers for the `/costs` resource.
//!
//! Creating, editing and deleting an entry moves the owning item's actual
//! cost in the same transaction (see `CostEntryRepo`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use groundwork_core::cost::validate_cost_amount;
use groundwork_core::error::CoreError;
use groundwork_core::types::DbId;
use groundwork_db::models::cost_entry::{CostEntry, CreateCostEntry, NewCostEntry, UpdateCostEntry};
use groundwork_db::repositories::CostEntryRepo;

use crate::error::{AppError, AppResult};
use crate::extract::{QueryParams, ValidJson};
use crate::handlers::project::find_project;
use crate::handlers::wbs::find_item;
use crate::query::CostListParams;
use crate::state::AppState;

/// GET /api/costs?wbsItemId= | ?projectId=
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CostListParams>,
) -> AppResult<Json<Vec<CostEntry>>> {
    let entries = match (params.wbs_item_id, params.project_id) {
        (Some(wbs_item_id), _) => {
            find_item(&state, wbs_item_id).await?;
            CostEntryRepo::list_by_item(&state.pool, wbs_item_id).await?
        }
        (None, Some(project_id)) => {
            find_project(&state, project_id).await?;
            CostEntryRepo::list_by_project(&state.pool, project_id).await?
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either wbsItemId or projectId is required".to_string(),
            ))
        }
    };
    Ok(Json(entries))
}

/// GET /api/costs/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<CostEntry>> {
    let entry = CostEntryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("CostEntry", id))?;
    Ok(Json(entry))
}

/// POST /api/costs
pub async fn create(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateCostEntry>,
) -> AppResult<(StatusCode, Json<CostEntry>)> {
    let item = find_item(&state, input.wbs_item_id).await?;
    if !item.item_type()?.is_budget_bearing() {
        return Err(CoreError::Validation(format!(
            "Costs cannot be posted to Activity '{}'; post them to its WorkPackage",
            item.code
        ))
        .into());
    }
    validate_cost_amount(input.amount)?;

    let new_entry = NewCostEntry {
        wbs_item_id: item.id,
        amount: input.amount,
        description: input.description,
        entry_date: input.entry_date.unwrap_or_else(|| Utc::now().date_naive()),
    };
    let entry = CostEntryRepo::create(&state.pool, &new_entry).await?;
    tracing::info!(
        cost_entry_id = entry.id,
        wbs_item_id = entry.wbs_item_id,
        amount = %entry.amount,
        "Cost posted",
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PATCH /api/costs/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateCostEntry>,
) -> AppResult<Json<CostEntry>> {
    if let Some(amount) = input.amount {
        validate_cost_amount(amount)?;
    }
    let entry = CostEntryRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("CostEntry", id))?;
    if input.amount.is_some() {
        tracing::info!(cost_entry_id = id, amount = %entry.amount, "Cost amount changed");
    }
    Ok(Json(entry))
}

/// DELETE /api/costs/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if CostEntryRepo::delete(&state.pool, id).await? {
        tracing::info!(cost_entry_id = id, "Cost entry deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("CostEntry", id))
    }
}
