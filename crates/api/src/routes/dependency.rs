//! Route definitions for the `/dependencies` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::dependency;
use crate::state::AppState;

/// Routes mounted at `/dependencies`.
///
/// ```text
/// GET    /?projectId=     -> list
/// POST   /                -> create
/// PATCH  /{id}            -> update (type, lag)
/// DELETE /{id}            -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dependency::list).post(dependency::create))
        .route(
            "/{id}",
            patch(dependency::update).delete(dependency::delete),
        )
}
