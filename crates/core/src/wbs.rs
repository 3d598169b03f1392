//! Work Breakdown Structure rules.
//!
//! A project's WBS is a three-level tree:
//!
//! ```text
//! Summary ──┬── Summary ── ...
//!           └── WorkPackage ── Activity
//! ```
//!
//! Summaries and WorkPackages carry budgets; Activities carry dates and
//! progress. Every check here is a pure function over values the caller
//! loaded from the database.

use serde::{Deserialize, Serialize};

use crate::cost::validate_money;
use crate::error::CoreError;
use crate::types::{DbId, Money};

// ---------------------------------------------------------------------------
// Item types
// ---------------------------------------------------------------------------

pub const TYPE_SUMMARY: &str = "Summary";
pub const TYPE_WORK_PACKAGE: &str = "WorkPackage";
pub const TYPE_ACTIVITY: &str = "Activity";

/// All valid item type strings (stored in DB).
pub const VALID_ITEM_TYPES: &[&str] = &[TYPE_SUMMARY, TYPE_WORK_PACKAGE, TYPE_ACTIVITY];

/// Maximum length of a single WBS code.
pub const MAX_CODE_LENGTH: usize = 50;

/// The kind of node in the WBS tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WbsItemType {
    Summary,
    WorkPackage,
    Activity,
}

impl WbsItemType {
    /// Parse a stored or user-supplied type name.
    ///
    /// Matching ignores case, spaces, dashes and underscores, so
    /// `"work package"` and `"WORK_PACKAGE"` both resolve to
    /// [`WbsItemType::WorkPackage`].
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "summary" => Ok(Self::Summary),
            "workpackage" => Ok(Self::WorkPackage),
            "activity" => Ok(Self::Activity),
            _ => Err(CoreError::Validation(format!(
                "Invalid WBS type '{s}'. Must be one of: {}",
                VALID_ITEM_TYPES.join(", ")
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => TYPE_SUMMARY,
            Self::WorkPackage => TYPE_WORK_PACKAGE,
            Self::Activity => TYPE_ACTIVITY,
        }
    }

    /// Summaries and WorkPackages carry a budget and accumulate actual cost.
    pub fn is_budget_bearing(self) -> bool {
        !matches!(self, Self::Activity)
    }

    /// Only Activities carry dates, duration and progress.
    pub fn has_schedule(self) -> bool {
        matches!(self, Self::Activity)
    }

    /// Lowercase indefinite article plus the type name, for messages.
    pub fn with_article(self) -> &'static str {
        match self {
            Self::Summary => "a Summary",
            Self::WorkPackage => "a WorkPackage",
            Self::Activity => "an Activity",
        }
    }

    /// Types allowed as direct children of this type.
    pub fn allowed_children(self) -> &'static [WbsItemType] {
        match self {
            Self::Summary => &[Self::Summary, Self::WorkPackage],
            Self::WorkPackage => &[Self::Activity],
            Self::Activity => &[],
        }
    }
}

impl std::fmt::Display for WbsItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Only Summaries may sit at the top of the tree.
pub fn validate_root_type(item_type: WbsItemType) -> Result<(), CoreError> {
    match item_type {
        WbsItemType::Summary => Ok(()),
        WbsItemType::WorkPackage => Err(CoreError::Validation(
            "A WorkPackage must be placed under a Summary".to_string(),
        )),
        WbsItemType::Activity => Err(CoreError::Validation(
            "An Activity must be placed under a WorkPackage".to_string(),
        )),
    }
}

/// Check a child type against its parent type using the fixed lookup table.
pub fn validate_parent_child(parent: WbsItemType, child: WbsItemType) -> Result<(), CoreError> {
    if parent.allowed_children().contains(&child) {
        return Ok(());
    }
    let hint = match (parent, child) {
        (WbsItemType::Summary, WbsItemType::Activity) => {
            "; Activities belong to a WorkPackage".to_string()
        }
        (WbsItemType::Activity, _) => "; Activities cannot have children".to_string(),
        _ => {
            let allowed: Vec<&str> = parent.allowed_children().iter().map(|t| t.as_str()).collect();
            format!("; {} may only contain {}", parent.with_article(), allowed.join(" or "))
        }
    };
    Err(CoreError::Validation(format!(
        "{} cannot be created under {}{hint}",
        capitalize(child.with_article()),
        parent.with_article()
    )))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A branch may contain at most one WorkPackage level.
///
/// `ancestors` lists the types above the new item, nearest first.
pub fn validate_single_work_package_level(
    child: WbsItemType,
    ancestors: &[WbsItemType],
) -> Result<(), CoreError> {
    if child == WbsItemType::WorkPackage && ancestors.contains(&WbsItemType::WorkPackage) {
        return Err(CoreError::Validation(
            "Only one WorkPackage level is allowed per branch".to_string(),
        ));
    }
    Ok(())
}

/// Validate where an item of `item_type` is being placed.
///
/// `lineage` is the chain of types from the direct parent up to the root;
/// an empty lineage means the item is a root.
pub fn validate_placement(item_type: WbsItemType, lineage: &[WbsItemType]) -> Result<(), CoreError> {
    match lineage.first() {
        None => validate_root_type(item_type),
        Some(&parent) => {
            validate_parent_child(parent, item_type)?;
            validate_single_work_package_level(item_type, lineage)
        }
    }
}

/// Budget and schedule fields are type-specific.
pub fn validate_type_fields(
    item_type: WbsItemType,
    has_budget: bool,
    has_schedule: bool,
) -> Result<(), CoreError> {
    if has_budget && !item_type.is_budget_bearing() {
        return Err(CoreError::Validation(format!(
            "{} does not carry a budget",
            capitalize(item_type.with_article())
        )));
    }
    if has_schedule && !item_type.has_schedule() {
        return Err(CoreError::Validation(format!(
            "{} does not carry dates or a duration",
            capitalize(item_type.with_article())
        )));
    }
    Ok(())
}

/// Retyping an item must leave every existing child in a valid position.
pub fn validate_children_compatible(
    new_type: WbsItemType,
    child_types: &[WbsItemType],
) -> Result<(), CoreError> {
    for &child in child_types {
        validate_parent_child(new_type, child)?;
    }
    Ok(())
}

/// An item cannot be moved beneath itself or one of its descendants.
///
/// `new_parent_lineage` holds the ids from the proposed parent up to the
/// root, nearest first.
pub fn validate_reparent(item_id: DbId, new_parent_lineage: &[DbId]) -> Result<(), CoreError> {
    if new_parent_lineage.contains(&item_id) {
        return Err(CoreError::Validation(
            "An item cannot be moved under itself or one of its descendants".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Budget rollup
// ---------------------------------------------------------------------------

/// The children of a parent may not be budgeted above the parent.
///
/// `sibling_budgets` holds the budgets of every other budget-bearing child
/// of the same parent; the item being created or edited is passed
/// separately as `new_budget`. The total is recomputed from scratch on
/// every call.
pub fn check_budget_rollup(
    parent_label: &str,
    parent_budget: Money,
    sibling_budgets: &[Money],
    new_budget: Money,
) -> Result<(), CoreError> {
    let total: Money = sibling_budgets.iter().copied().sum::<Money>() + new_budget;
    if total > parent_budget {
        return Err(CoreError::Validation(format!(
            "Budget exceeds {parent_label}: children would total {total}, \
             but the available budget is {parent_budget} ({} remaining)",
            (parent_budget - (total - new_budget)).max(Money::ZERO)
        )));
    }
    Ok(())
}

/// A budget may not be lowered below what its children already claim.
pub fn check_budget_covers_children(
    new_budget: Money,
    child_budgets: &[Money],
) -> Result<(), CoreError> {
    let committed: Money = child_budgets.iter().copied().sum();
    if new_budget < committed {
        return Err(CoreError::Validation(format!(
            "Budget {new_budget} is below the {committed} already allocated to child items"
        )));
    }
    Ok(())
}

/// Budgets are non-negative and must fit the money column.
pub fn validate_budget(budget: Money) -> Result<(), CoreError> {
    if budget < Money::ZERO {
        return Err(CoreError::Validation("Budget must not be negative".to_string()));
    }
    validate_money("Budget", budget)
}

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

/// WBS codes are dot-separated segments of ASCII letters, digits, `-` or `_`.
pub fn validate_code(code: &str) -> Result<(), CoreError> {
    if code.is_empty() || code.len() > MAX_CODE_LENGTH {
        return Err(CoreError::Validation(format!(
            "WBS code must be 1-{MAX_CODE_LENGTH} characters"
        )));
    }
    let valid = code.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    });
    if !valid {
        return Err(CoreError::Validation(format!(
            "Invalid WBS code '{code}': expected dot-separated segments such as 1.2.3"
        )));
    }
    Ok(())
}

/// The code of the implied parent: `"1.2.3"` → `Some("1.2")`, `"1"` → `None`.
pub fn parent_code(code: &str) -> Option<&str> {
    code.rfind('.').map(|idx| &code[..idx])
}

/// Number of segments in a code (`"1.2.3"` → 3).
pub fn code_depth(code: &str) -> usize {
    code.split('.').count()
}

/// Generate the next numeric code below `parent` (or at the root).
///
/// Uses one more than the highest numeric final segment among the
/// existing siblings, so gaps left by deletions are not reused. Fails when
/// that number no longer fits in a `u32`; the caller must then pass an
/// explicit code.
pub fn next_child_code(
    parent: Option<&str>,
    sibling_codes: &[String],
) -> Result<String, CoreError> {
    let highest = sibling_codes
        .iter()
        .filter_map(|code| code.rsplit('.').next())
        .filter_map(|last| last.parse::<u64>().ok())
        .max();
    let next = match highest {
        None => 1,
        Some(max) => max
            .checked_add(1)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Cannot generate a code after sibling number {max}; supply a code explicitly"
                ))
            })?,
    };
    Ok(match parent {
        Some(prefix) => format!("{prefix}.{next}"),
        None => next.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
