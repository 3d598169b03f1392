//! Activity dependency model and DTOs.

use groundwork_core::dependency::{DependencyType, Edge};
use groundwork_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `dependencies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub id: DbId,
    pub project_id: DbId,
    pub predecessor_id: DbId,
    pub successor_id: DbId,
    /// One of `FS`, `SS`, `FF`, `SF`.
    pub dependency_type: String,
    pub lag_days: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Dependency {
    pub fn edge(&self) -> Edge {
        Edge {
            predecessor_id: self.predecessor_id,
            successor_id: self.successor_id,
        }
    }
}

/// DTO for creating a dependency. The project is taken from the activities.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDependency {
    pub predecessor_id: DbId,
    pub successor_id: DbId,
    /// Defaults to Finish-to-Start.
    pub dependency_type: Option<DependencyType>,
    /// Negative values are leads. Defaults to 0.
    pub lag_days: Option<i32>,
}

/// DTO for updating a dependency's relation and lag.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDependency {
    pub dependency_type: Option<DependencyType>,
    pub lag_days: Option<i32>,
}
