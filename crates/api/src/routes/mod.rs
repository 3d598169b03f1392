pub mod cost;
pub mod dependency;
pub mod health;
pub mod project;
pub mod task;
pub mod wbs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                 list, create
/// /projects/{id}                            get, update, delete
/// /projects/{id}/tree                       nested WBS
/// /projects/{id}/metrics                    earned value summary
///
/// /wbs                                      list (?projectId=), create
/// /wbs/import                               CSV import (?projectId=)
/// /wbs/activities/import                    Activity CSV import (?projectId=)
/// /wbs/{id}                                 get, update, delete
/// /wbs/{id}/progress                        set percent complete
/// /wbs/{id}/tasks                           list, create
///
/// /tasks/{id}                               get, update, delete
///
/// /dependencies                             list (?projectId=), create
/// /dependencies/{id}                        update, delete
///
/// /costs                                    list (?wbsItemId= | ?projectId=), create
/// /costs/import                             CSV import (?projectId=)
/// /costs/{id}                               get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", project::router())
        .nest("/wbs", wbs::router())
        .nest("/tasks", task::router())
        .nest("/dependencies", dependency::router())
        .nest("/costs", cost::router())
}
