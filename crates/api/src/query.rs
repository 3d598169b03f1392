//! Shared query parameter types for API handlers.

use groundwork_core::types::{Date, DbId};
use serde::Deserialize;

/// `?projectId=` filter, required by list and import endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIdParams {
    pub project_id: DbId,
}

/// Cost listing filter: exactly one of `?wbsItemId=` or `?projectId=`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostListParams {
    pub wbs_item_id: Option<DbId>,
    pub project_id: Option<DbId>,
}

/// `?asOf=YYYY-MM-DD` for metrics; defaults to today (UTC).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsParams {
    pub as_of: Option<Date>,
}
