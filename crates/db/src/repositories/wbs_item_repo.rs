//! Repository for the `wbs_items` table.

use groundwork_core::import::{ParentRef, PlannedItem};
use groundwork_core::types::{DbId, Money};
use groundwork_core::wbs::WbsItemType;
use sqlx::PgPool;

use crate::models::wbs_item::{NewWbsItem, UpdateWbsItem, WbsItem};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, parent_id, code, name, description, item_type, \
    budget, actual_cost, start_date, end_date, duration_days, percent_complete, sort_order, \
    created_at, updated_at";

/// Guard against runaway recursion when walking up the tree.
const MAX_LINEAGE_DEPTH: i32 = 64;

const INSERT_SQL: &str = "INSERT INTO wbs_items
        (project_id, parent_id, code, name, description, item_type, budget,
         start_date, end_date, duration_days, sort_order)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

/// Provides CRUD and tree queries for WBS items.
pub struct WbsItemRepo;

impl WbsItemRepo {
    /// Insert a validated item, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewWbsItem) -> Result<WbsItem, sqlx::Error> {
        let query = format!("{INSERT_SQL} RETURNING {COLUMNS}");
        sqlx::query_as::<_, WbsItem>(&query)
            .bind(input.project_id)
            .bind(input.parent_id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.item_type.as_str())
            .bind(input.budget)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.duration_days)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    /// Insert an imported plan in one transaction, parents before children.
    ///
    /// Returns the created rows in plan order. Nothing is written if any
    /// insert fails.
    pub async fn create_many(
        pool: &PgPool,
        project_id: DbId,
        plan: &[PlannedItem],
    ) -> Result<Vec<WbsItem>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created: Vec<WbsItem> = Vec::with_capacity(plan.len());
        let query = format!("{INSERT_SQL} RETURNING {COLUMNS}");

        for (position, planned) in plan.iter().enumerate() {
            let parent_id = match planned.parent {
                ParentRef::Root => None,
                ParentRef::Existing(id) => Some(id),
                ParentRef::Planned(idx) => Some(created.get(idx).map(|p| p.id).ok_or_else(|| {
                    sqlx::Error::Protocol(format!(
                        "import row {} references planned item {idx} before it was inserted",
                        planned.row.line
                    ))
                })?),
            };
            let row = &planned.row;
            let item = sqlx::query_as::<_, WbsItem>(&query)
                .bind(project_id)
                .bind(parent_id)
                .bind(&row.code)
                .bind(&row.name)
                .bind(None::<String>)
                .bind(row.item_type.as_str())
                .bind(row.budget)
                .bind(row.schedule.start_date)
                .bind(row.schedule.end_date)
                .bind(row.schedule.duration_days)
                .bind(position as i32)
                .fetch_one(&mut *tx)
                .await?;
            created.push(item);
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Find an item by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<WbsItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM wbs_items WHERE id = $1");
        sqlx::query_as::<_, WbsItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All items of a project in display order.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<WbsItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wbs_items WHERE project_id = $1 ORDER BY sort_order, code"
        );
        sqlx::query_as::<_, WbsItem>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Direct children of an item.
    pub async fn list_children(pool: &PgPool, parent_id: DbId) -> Result<Vec<WbsItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wbs_items WHERE parent_id = $1 ORDER BY sort_order, code"
        );
        sqlx::query_as::<_, WbsItem>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    /// The item followed by each of its ancestors, nearest first.
    ///
    /// Empty if the item does not exist.
    pub async fn lineage(pool: &PgPool, id: DbId) -> Result<Vec<WbsItem>, sqlx::Error> {
        let query = format!(
            "WITH RECURSIVE chain AS (
                SELECT w.*, 0 AS depth FROM wbs_items w WHERE w.id = $1
                UNION ALL
                SELECT p.*, c.depth + 1 FROM wbs_items p
                JOIN chain c ON p.id = c.parent_id
                WHERE c.depth < $2
             )
             SELECT {COLUMNS} FROM chain ORDER BY depth"
        );
        sqlx::query_as::<_, WbsItem>(&query)
            .bind(id)
            .bind(MAX_LINEAGE_DEPTH)
            .fetch_all(pool)
            .await
    }

    /// Codes of every item directly under `parent_id` (or at the root).
    pub async fn sibling_codes(
        pool: &PgPool,
        project_id: DbId,
        parent_id: Option<DbId>,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT code FROM wbs_items
             WHERE project_id = $1 AND parent_id IS NOT DISTINCT FROM $2",
        )
        .bind(project_id)
        .bind(parent_id)
        .fetch_all(pool)
        .await
    }

    /// Budgets of the budget-bearing children of `parent_id` (or of the
    /// project's roots), optionally leaving one item out.
    pub async fn child_budgets(
        pool: &PgPool,
        project_id: DbId,
        parent_id: Option<DbId>,
        exclude_id: Option<DbId>,
    ) -> Result<Vec<Money>, sqlx::Error> {
        sqlx::query_scalar::<_, Money>(
            "SELECT COALESCE(budget, 0) FROM wbs_items
             WHERE project_id = $1
               AND parent_id IS NOT DISTINCT FROM $2
               AND item_type <> $3
               AND ($4::BIGINT IS NULL OR id <> $4)",
        )
        .bind(project_id)
        .bind(parent_id)
        .bind(WbsItemType::Activity.as_str())
        .bind(exclude_id)
        .fetch_all(pool)
        .await
    }

    /// Update an item. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateWbsItem,
    ) -> Result<Option<WbsItem>, sqlx::Error> {
        let query = format!(
            "UPDATE wbs_items SET
                parent_id = COALESCE($2, parent_id),
                code = COALESCE($3, code),
                name = COALESCE($4, name),
                description = COALESCE($5, description),
                item_type = COALESCE($6, item_type),
                budget = COALESCE($7, budget),
                start_date = COALESCE($8, start_date),
                end_date = COALESCE($9, end_date),
                duration_days = COALESCE($10, duration_days),
                sort_order = COALESCE($11, sort_order)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WbsItem>(&query)
            .bind(id)
            .bind(input.parent_id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.item_type.map(WbsItemType::as_str))
            .bind(input.budget)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.duration_days)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Set an item's percent complete.
    pub async fn set_progress(
        pool: &PgPool,
        id: DbId,
        percent_complete: i32,
    ) -> Result<Option<WbsItem>, sqlx::Error> {
        let query = format!(
            "UPDATE wbs_items SET percent_complete = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WbsItem>(&query)
            .bind(id)
            .bind(percent_complete)
            .fetch_optional(pool)
            .await
    }

    /// Delete an item together with its subtree, dependencies, costs and
    /// tasks. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM wbs_items WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
