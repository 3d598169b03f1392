//! Handlers for the `/dependencies` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use groundwork_core::dependency::{validate_lag, validate_new_edge};
use groundwork_core::error::CoreError;
use groundwork_core::types::DbId;
use groundwork_core::wbs::WbsItemType;
use groundwork_db::models::dependency::{CreateDependency, Dependency, UpdateDependency};
use groundwork_db::models::wbs_item::WbsItem;
use groundwork_db::repositories::DependencyRepo;

use crate::error::{AppError, AppResult};
use crate::extract::{QueryParams, ValidJson};
use crate::handlers::project::find_project;
use crate::handlers::wbs::find_item;
use crate::query::ProjectIdParams;
use crate::state::AppState;

fn require_activity(item: &WbsItem, role: &str) -> AppResult<()> {
    if item.item_type()? != WbsItemType::Activity {
        return Err(CoreError::Validation(format!(
            "Dependencies link Activities; {role} '{}' is a {}",
            item.code, item.item_type
        ))
        .into());
    }
    Ok(())
}

/// GET /api/dependencies?projectId=
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ProjectIdParams>,
) -> AppResult<Json<Vec<Dependency>>> {
    find_project(&state, params.project_id).await?;
    let deps = DependencyRepo::list_by_project(&state.pool, params.project_id).await?;
    Ok(Json(deps))
}

/// POST /api/dependencies
pub async fn create(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateDependency>,
) -> AppResult<(StatusCode, Json<Dependency>)> {
    let predecessor = find_item(&state, input.predecessor_id).await?;
    let successor = find_item(&state, input.successor_id).await?;
    require_activity(&predecessor, "predecessor")?;
    require_activity(&successor, "successor")?;
    if predecessor.project_id != successor.project_id {
        return Err(CoreError::Validation(
            "Both activities must belong to the same project".to_string(),
        )
        .into());
    }

    let lag_days = input.lag_days.unwrap_or(0);
    validate_lag(lag_days)?;

    let project_id = predecessor.project_id;
    let edges = DependencyRepo::edges(&state.pool, project_id).await?;
    validate_new_edge(&edges, predecessor.id, successor.id)?;

    let dependency_type = input.dependency_type.unwrap_or_default();
    let dep = DependencyRepo::create(
        &state.pool,
        project_id,
        predecessor.id,
        successor.id,
        dependency_type,
        lag_days,
    )
    .await?;
    tracing::info!(
        dependency_id = dep.id,
        predecessor_id = dep.predecessor_id,
        successor_id = dep.successor_id,
        dependency_type = dependency_type.label(),
        "Dependency created",
    );
    Ok((StatusCode::CREATED, Json(dep)))
}

/// PATCH /api/dependencies/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateDependency>,
) -> AppResult<Json<Dependency>> {
    if let Some(lag) = input.lag_days {
        validate_lag(lag)?;
    }
    let dep = DependencyRepo::update(&state.pool, id, input.dependency_type, input.lag_days)
        .await?
        .ok_or(AppError::not_found("Dependency", id))?;
    Ok(Json(dep))
}

/// DELETE /api/dependencies/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if DependencyRepo::delete(&state.pool, id).await? {
        tracing::info!(dependency_id = id, "Dependency deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Dependency", id))
    }
}
