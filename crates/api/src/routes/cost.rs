//! Route definitions for the `/costs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{cost, import};
use crate::state::AppState;

/// Routes mounted at `/costs`.
///
/// ```text
/// GET    /?wbsItemId= | ?projectId=   -> list
/// POST   /                            -> create
/// POST   /import?projectId=           -> import_costs (CSV body)
/// GET    /{id}                        -> get_by_id
/// PATCH  /{id}                        -> update
/// DELETE /{id}                        -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cost::list).post(cost::create))
        .route("/import", post(import::import_costs))
        .route(
            "/{id}",
            get(cost::get_by_id).patch(cost::update).delete(cost::delete),
        )
}
