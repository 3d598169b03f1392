//! Repository for the `cost_entries` table.
//!
//! Every write here also moves the owning item's `actual_cost` by the same
//! amount, inside one transaction.

use groundwork_core::types::{DbId, Money};
use sqlx::{PgConnection, PgPool};

use crate::models::cost_entry::{CostEntry, NewCostEntry, UpdateCostEntry};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, wbs_item_id, amount, description, entry_date, created_at, updated_at";

const INSERT_SQL: &str = "INSERT INTO cost_entries (wbs_item_id, amount, description, entry_date)
     VALUES ($1, $2, $3, $4)";

/// Provides CRUD operations for cost entries.
pub struct CostEntryRepo;

impl CostEntryRepo {
    /// Insert a cost entry and add its amount to the item's actual cost.
    pub async fn create(pool: &PgPool, input: &NewCostEntry) -> Result<CostEntry, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let entry = Self::insert(&mut tx, input).await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Insert an imported batch in one transaction. Nothing is written if
    /// any row fails.
    pub async fn create_many(
        pool: &PgPool,
        inputs: &[NewCostEntry],
    ) -> Result<Vec<CostEntry>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            results.push(Self::insert(&mut tx, input).await?);
        }
        tx.commit().await?;
        Ok(results)
    }

    async fn insert(conn: &mut PgConnection, input: &NewCostEntry) -> Result<CostEntry, sqlx::Error> {
        let query = format!("{INSERT_SQL} RETURNING {COLUMNS}");
        let entry = sqlx::query_as::<_, CostEntry>(&query)
            .bind(input.wbs_item_id)
            .bind(input.amount)
            .bind(&input.description)
            .bind(input.entry_date)
            .fetch_one(&mut *conn)
            .await?;
        adjust_actual_cost(conn, entry.wbs_item_id, entry.amount).await?;
        Ok(entry)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CostEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cost_entries WHERE id = $1");
        sqlx::query_as::<_, CostEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Entries posted to one item, newest first.
    pub async fn list_by_item(
        pool: &PgPool,
        wbs_item_id: DbId,
    ) -> Result<Vec<CostEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cost_entries WHERE wbs_item_id = $1
             ORDER BY entry_date DESC, id DESC"
        );
        sqlx::query_as::<_, CostEntry>(&query)
            .bind(wbs_item_id)
            .fetch_all(pool)
            .await
    }

    /// Entries posted anywhere in a project, newest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<CostEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM cost_entries c
             JOIN wbs_items w ON w.id = c.wbs_item_id
             WHERE w.project_id = $1
             ORDER BY c.entry_date DESC, c.id DESC",
            prefixed_columns("c")
        );
        sqlx::query_as::<_, CostEntry>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Update an entry. A changed amount moves the item's actual cost by
    /// the difference.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCostEntry,
    ) -> Result<Option<CostEntry>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let previous: Option<Money> =
            sqlx::query_scalar("SELECT amount FROM cost_entries WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            return Ok(None);
        };

        let query = format!(
            "UPDATE cost_entries SET
                amount = COALESCE($2, amount),
                description = COALESCE($3, description),
                entry_date = COALESCE($4, entry_date)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, CostEntry>(&query)
            .bind(id)
            .bind(input.amount)
            .bind(&input.description)
            .bind(input.entry_date)
            .fetch_one(&mut *tx)
            .await?;

        let delta = entry.amount - previous;
        if !delta.is_zero() {
            adjust_actual_cost(&mut tx, entry.wbs_item_id, delta).await?;
        }

        tx.commit().await?;
        Ok(Some(entry))
    }

    /// Delete an entry and subtract its amount from the item's actual cost.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let removed: Option<(DbId, Money)> = sqlx::query_as(
            "DELETE FROM cost_entries WHERE id = $1 RETURNING wbs_item_id, amount",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((wbs_item_id, amount)) = removed else {
            return Ok(false);
        };
        adjust_actual_cost(&mut tx, wbs_item_id, -amount).await?;
        tx.commit().await?;
        Ok(true)
    }
}

async fn adjust_actual_cost(
    conn: &mut PgConnection,
    wbs_item_id: DbId,
    delta: Money,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE wbs_items SET actual_cost = actual_cost + $2 WHERE id = $1")
        .bind(wbs_item_id)
        .bind(delta)
        .execute(conn)
        .await?;
    Ok(())
}

fn prefixed_columns(alias: &str) -> String {
    COLUMNS
        .split(", ")
        .map(|col| format!("{alias}.{col}"))
        .collect::<Vec<_>>()
        .join(", ")
}
