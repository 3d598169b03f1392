//! Cost entry model and DTOs.

use groundwork_core::types::{Date, DbId, Money, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `cost_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEntry {
    pub id: DbId,
    pub wbs_item_id: DbId,
    pub amount: Money,
    pub description: Option<String>,
    pub entry_date: Date,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for posting a cost against a Summary or WorkPackage.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCostEntry {
    pub wbs_item_id: DbId,
    pub amount: Money,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Defaults to today (UTC) if omitted.
    pub entry_date: Option<Date>,
}

/// DTO for editing a cost entry. A changed amount adjusts the item's
/// actual cost by the difference.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCostEntry {
    pub amount: Option<Money>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub entry_date: Option<Date>,
}

/// A validated cost row ready for batch insertion.
#[derive(Debug, Clone)]
pub struct NewCostEntry {
    pub wbs_item_id: DbId,
    pub amount: Money,
    pub description: Option<String>,
    pub entry_date: Date,
}
