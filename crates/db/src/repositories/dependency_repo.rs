//! Repository for the `dependencies` table.

use groundwork_core::dependency::{DependencyType, Edge};
use groundwork_core::types::DbId;
use sqlx::PgPool;

use crate::models::dependency::Dependency;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, project_id, predecessor_id, successor_id, dependency_type, lag_days, created_at, updated_at";

/// Provides CRUD operations for activity dependencies.
pub struct DependencyRepo;

impl DependencyRepo {
    /// Insert a dependency that has already passed the graph checks.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        predecessor_id: DbId,
        successor_id: DbId,
        dependency_type: DependencyType,
        lag_days: i32,
    ) -> Result<Dependency, sqlx::Error> {
        let query = format!(
            "INSERT INTO dependencies (project_id, predecessor_id, successor_id, dependency_type, lag_days)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dependency>(&query)
            .bind(project_id)
            .bind(predecessor_id)
            .bind(successor_id)
            .bind(dependency_type.as_str())
            .bind(lag_days)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Dependency>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dependencies WHERE id = $1");
        sqlx::query_as::<_, Dependency>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All dependencies of a project, oldest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Dependency>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM dependencies WHERE project_id = $1 ORDER BY id");
        sqlx::query_as::<_, Dependency>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// The project's dependency graph as bare edges.
    pub async fn edges(pool: &PgPool, project_id: DbId) -> Result<Vec<Edge>, sqlx::Error> {
        let rows: Vec<(DbId, DbId)> = sqlx::query_as(
            "SELECT predecessor_id, successor_id FROM dependencies WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(predecessor_id, successor_id)| Edge {
                predecessor_id,
                successor_id,
            })
            .collect())
    }

    /// Change a dependency's type and/or lag. The endpoints are fixed.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        dependency_type: Option<DependencyType>,
        lag_days: Option<i32>,
    ) -> Result<Option<Dependency>, sqlx::Error> {
        let query = format!(
            "UPDATE dependencies SET
                dependency_type = COALESCE($2, dependency_type),
                lag_days = COALESCE($3, lag_days)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dependency>(&query)
            .bind(id)
            .bind(dependency_type.map(DependencyType::as_str))
            .bind(lag_days)
            .fetch_optional(pool)
            .await
    }

    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dependencies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
