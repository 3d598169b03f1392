//! Route definitions for the `/wbs` resource, including nested tasks and
//! CSV imports.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{import, task, wbs};
use crate::state::AppState;

/// Routes mounted at `/wbs`.
///
/// ```text
/// GET    /?projectId=                     -> list
/// POST   /                                -> create
/// POST   /import?projectId=               -> import_wbs (CSV body)
/// POST   /activities/import?projectId=    -> import_activities (CSV body)
/// GET    /{id}                            -> get_by_id
/// PATCH  /{id}                            -> update
/// DELETE /{id}                            -> delete
/// PATCH  /{id}/progress                   -> set_progress
/// GET    /{id}/tasks                      -> list tasks of an Activity
/// POST   /{id}/tasks                      -> create task under an Activity
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(wbs::list).post(wbs::create))
        .route("/import", post(import::import_wbs))
        .route("/activities/import", post(import::import_activities))
        .route(
            "/{id}",
            get(wbs::get_by_id).patch(wbs::update).delete(wbs::delete),
        )
        .route("/{id}/progress", patch(wbs::set_progress))
        .route(
            "/{id}/tasks",
            get(task::list_by_activity).post(task::create),
        )
}
