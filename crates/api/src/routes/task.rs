//! Route definitions for the `/tasks` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::task;
use crate::state::AppState;

/// Routes mounted at `/tasks`. Listing and creation live under
/// `/wbs/{id}/tasks`.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        get(task::get_by_id).patch(task::update).delete(task::delete),
    )
}
