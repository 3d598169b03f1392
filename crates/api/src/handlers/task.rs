//! Handlers for tasks, nested under Activities for listing and creation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use groundwork_core::error::CoreError;
use groundwork_core::schedule::{apply_schedule_patch, resolve_schedule, Schedule};
use groundwork_core::types::DbId;
use groundwork_db::models::task::{CreateTask, Task, UpdateTask};
use groundwork_db::repositories::TaskRepo;

use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::handlers::wbs::find_item;
use crate::state::AppState;

async fn find_task(state: &AppState, id: DbId) -> AppResult<Task> {
    TaskRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Task", id))
}

/// GET /api/wbs/{id}/tasks
pub async fn list_by_activity(
    State(state): State<AppState>,
    Path(activity_id): Path<DbId>,
) -> AppResult<Json<Vec<Task>>> {
    find_item(&state, activity_id).await?;
    let tasks = TaskRepo::list_by_activity(&state.pool, activity_id).await?;
    Ok(Json(tasks))
}

/// POST /api/wbs/{id}/tasks
pub async fn create(
    State(state): State<AppState>,
    Path(activity_id): Path<DbId>,
    ValidJson(input): ValidJson<CreateTask>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let activity = find_item(&state, activity_id).await?;
    if !activity.item_type()?.has_schedule() {
        return Err(CoreError::Validation(format!(
            "Tasks belong to Activities; '{}' is a {}",
            activity.code, activity.item_type
        ))
        .into());
    }
    let schedule = resolve_schedule(input.start_date, input.end_date, input.duration_days)?;
    let input = CreateTask {
        start_date: schedule.start_date,
        end_date: schedule.end_date,
        duration_days: schedule.duration_days,
        ..input
    };

    let task = TaskRepo::create(&state.pool, activity_id, &input).await?;
    tracing::info!(task_id = task.id, activity_id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/tasks/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Task>> {
    Ok(Json(find_task(&state, id).await?))
}

/// PATCH /api/tasks/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UpdateTask>,
) -> AppResult<Json<Task>> {
    let existing = find_task(&state, id).await?;
    let schedule = apply_schedule_patch(
        Schedule {
            start_date: existing.start_date,
            end_date: existing.end_date,
            duration_days: existing.duration_days,
        },
        Schedule {
            start_date: input.start_date,
            end_date: input.end_date,
            duration_days: input.duration_days,
        },
    )?;
    let input = UpdateTask {
        start_date: schedule.start_date,
        end_date: schedule.end_date,
        duration_days: schedule.duration_days,
        ..input
    };

    let task = TaskRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Task", id))?;
    Ok(Json(task))
}

/// DELETE /api/tasks/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if TaskRepo::delete(&state.pool, id).await? {
        tracing::info!(task_id = id, "Task deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Task", id))
    }
}
