//! WBS item model, DTOs and the nested tree view.

use std::collections::HashMap;

use groundwork_core::error::CoreError;
use groundwork_core::import::ExistingNode;
use groundwork_core::types::{Date, DbId, Money, Timestamp};
use groundwork_core::wbs::WbsItemType;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `wbs_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WbsItem {
    pub id: DbId,
    pub project_id: DbId,
    pub parent_id: Option<DbId>,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    /// One of `Summary`, `WorkPackage`, `Activity`.
    pub item_type: String,
    pub budget: Option<Money>,
    pub actual_cost: Money,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub duration_days: Option<i32>,
    pub percent_complete: i32,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WbsItem {
    pub fn item_type(&self) -> Result<WbsItemType, CoreError> {
        WbsItemType::from_str_value(&self.item_type)
    }

    /// Budget treated as zero when unset.
    pub fn budget_or_zero(&self) -> Money {
        self.budget.unwrap_or(Money::ZERO)
    }

    /// Projection used by the import planner.
    pub fn to_existing_node(&self) -> Result<ExistingNode, CoreError> {
        Ok(ExistingNode {
            id: self.id,
            parent_id: self.parent_id,
            code: self.code.clone(),
            item_type: self.item_type()?,
            budget: self.budget,
        })
    }
}

/// DTO for creating a WBS item.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWbsItem {
    pub project_id: DbId,
    pub parent_id: Option<DbId>,
    /// Generated from the parent's code and its siblings if omitted.
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub item_type: WbsItemType,
    pub budget: Option<Money>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub duration_days: Option<i32>,
    pub sort_order: Option<i32>,
}

/// DTO for updating a WBS item. All fields are optional.
///
/// Moving an item is done by setting `parentId`; items cannot be moved
/// back to the root through an update.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWbsItem {
    pub parent_id: Option<DbId>,
    #[validate(length(min = 1, max = 50))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub item_type: Option<WbsItemType>,
    pub budget: Option<Money>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub duration_days: Option<i32>,
    pub sort_order: Option<i32>,
}

/// DTO for `PATCH /wbs/{id}/progress`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgress {
    #[validate(range(min = 0, max = 100, message = "percentComplete must be 0-100"))]
    pub percent_complete: i32,
}

/// A fully validated item ready for insertion.
#[derive(Debug, Clone)]
pub struct NewWbsItem {
    pub project_id: DbId,
    pub parent_id: Option<DbId>,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub item_type: WbsItemType,
    pub budget: Option<Money>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub duration_days: Option<i32>,
    pub sort_order: i32,
}

/// An item with its children nested beneath it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WbsTreeNode {
    #[serde(flatten)]
    pub item: WbsItem,
    pub children: Vec<WbsTreeNode>,
}

/// Nest a project's flat item list into a forest of root items.
///
/// Siblings are ordered by `sort_order`, then code. Items whose parent is
/// missing from `items` are dropped.
pub fn build_tree(items: Vec<WbsItem>) -> Vec<WbsTreeNode> {
    let mut by_parent: HashMap<Option<DbId>, Vec<WbsItem>> = HashMap::new();
    for item in items {
        by_parent.entry(item.parent_id).or_default().push(item);
    }
    attach(None, &mut by_parent)
}

fn attach(
    parent_id: Option<DbId>,
    by_parent: &mut HashMap<Option<DbId>, Vec<WbsItem>>,
) -> Vec<WbsTreeNode> {
    let mut items = by_parent.remove(&parent_id).unwrap_or_default();
    items.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.code.cmp(&b.code)));
    items
        .into_iter()
        .map(|item| {
            let children = attach(Some(item.id), by_parent);
            WbsTreeNode { item, children }
        })
        .collect()
}
