//! CSV import of cost entries and WBS items.
//!
//! Parsing and planning are pure: the caller loads the project's existing
//! WBS, hands it in with the uploaded bytes, and receives either a plan it
//! can insert in one transaction or the full list of rejected rows.
//!
//! Cost import columns: `wbsCode, amount, description?, entryDate`.
//! WBS import columns: `wbsCode, wbsName, wbsType, amount?, startDate?,
//! endDate?, duration?`.

use std::collections::HashMap;
use std::str::FromStr;

use crate::cost::validate_cost_amount;
use crate::error::{CoreError, ImportRowError};
use crate::schedule::{resolve_schedule, Schedule};
use crate::types::{Date, DbId, Money};
use crate::wbs::{self, WbsItemType};

/// Maximum number of data rows accepted in a single upload.
pub const MAX_IMPORT_ROWS: usize = 5000;

/// Accepted date spellings, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

// ---------------------------------------------------------------------------
// CSV table
// ---------------------------------------------------------------------------

/// A parsed CSV file: normalised headers plus data rows tagged with their
/// line number.
#[derive(Debug)]
struct CsvTable {
    headers: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

impl CsvTable {
    fn parse(data: &[u8]) -> Result<Self, CoreError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| CoreError::Validation(format!("CSV is not valid UTF-8: {e}")))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut lines = split_records(text).into_iter();
        let headers = loop {
            match lines.next() {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line)) => break parse_csv_line(line),
                None => return Err(CoreError::Validation("CSV is empty".to_string())),
            }
        };
        let headers: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let rows: Vec<(usize, Vec<String>)> = lines
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| (idx + 1, parse_csv_line(line)))
            .collect();

        if rows.is_empty() {
            return Err(CoreError::Validation("CSV contains no data rows".to_string()));
        }
        if rows.len() > MAX_IMPORT_ROWS {
            return Err(CoreError::Validation(format!(
                "CSV has {} data rows; the limit is {MAX_IMPORT_ROWS}",
                rows.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    fn column(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name);
        self.headers.iter().position(|h| *h == wanted)
    }

    fn require_column(&self, name: &str) -> Result<usize, CoreError> {
        self.column(name).ok_or_else(|| {
            CoreError::Validation(format!("CSV is missing required column '{name}'"))
        })
    }
}

/// `wbsCode`, `wbs_code` and `WBS Code` all normalise to `wbscode`.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Split text into records tagged with their zero-based starting line.
///
/// A newline inside a quoted cell continues the record, so row numbers in
/// errors point at the line where the row begins.
fn split_records(text: &str) -> Vec<(usize, &str)> {
    let mut records = Vec::new();
    let mut start = 0;
    let mut start_line = 0;
    let mut line = 0;
    let mut in_quotes = false;

    for (idx, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\n' => {
                if !in_quotes {
                    records.push((start_line, text[start..idx].trim_end_matches('\r')));
                    start = idx + 1;
                    start_line = line + 1;
                }
                line += 1;
            }
            _ => {}
        }
    }
    if start < text.len() {
        records.push((start_line, text[start..].trim_end_matches('\r')));
    }
    records
}

/// Parse a single CSV record, handling quoted fields.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match (in_quotes, ch) {
            (true, '"') if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            (true, '"') => in_quotes = false,
            (false, '"') => in_quotes = true,
            (false, ',') => result.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    result.push(current);
    result
}

/// Trimmed cell value, `None` when the column is absent or the cell blank.
fn cell(values: &[String], column: Option<usize>) -> Option<&str> {
    column
        .and_then(|idx| values.get(idx))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Cell parsers
// ---------------------------------------------------------------------------

/// Parse an amount, tolerating a leading currency symbol and thousands
/// separators. Rounded to cents.
pub fn parse_amount(raw: &str) -> Result<Money, String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    Money::from_str(&cleaned)
        .map(|m| m.round_dp(2))
        .map_err(|_| format!("invalid amount '{raw}'"))
}

/// Parse a calendar date in one of the accepted formats.
pub fn parse_date(raw: &str) -> Result<Date, String> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| Date::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| format!("invalid date '{raw}' (expected YYYY-MM-DD)"))
}

fn parse_duration(raw: &str) -> Result<i32, String> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid duration '{raw}'"))
}

// ---------------------------------------------------------------------------
// Cost rows
// ---------------------------------------------------------------------------

/// One data row of a cost import.
#[derive(Debug, Clone, PartialEq)]
pub struct CostImportRow {
    pub line: usize,
    pub wbs_code: String,
    pub amount: Money,
    pub description: Option<String>,
    pub entry_date: Date,
}

/// Parse a cost import file, collecting every row error.
pub fn parse_cost_rows(data: &[u8]) -> Result<Vec<CostImportRow>, CoreError> {
    let table = CsvTable::parse(data)?;
    let code_col = table.require_column("wbsCode")?;
    let amount_col = table.require_column("amount")?;
    let date_col = table.require_column("entryDate")?;
    let description_col = table.column("description");

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut errors = Vec::new();

    for (line, values) in &table.rows {
        let line = *line;
        let result = (|| -> Result<CostImportRow, String> {
            let wbs_code = cell(values, Some(code_col)).ok_or("wbsCode is required")?;
            let amount = parse_amount(cell(values, Some(amount_col)).ok_or("amount is required")?)?;
            validate_cost_amount(amount).map_err(|e| core_message(&e))?;
            let entry_date =
                parse_date(cell(values, Some(date_col)).ok_or("entryDate is required")?)?;
            Ok(CostImportRow {
                line,
                wbs_code: wbs_code.to_string(),
                amount,
                description: cell(values, description_col).map(str::to_string),
                entry_date,
            })
        })();
        match result {
            Ok(row) => rows.push(row),
            Err(message) => errors.push(ImportRowError {
                row: line,
                message,
            }),
        }
    }

    if errors.is_empty() {
        Ok(rows)
    } else {
        Err(CoreError::ImportRows(errors))
    }
}

// ---------------------------------------------------------------------------
// WBS rows
// ---------------------------------------------------------------------------

/// One data row of a WBS import.
#[derive(Debug, Clone, PartialEq)]
pub struct WbsImportRow {
    pub line: usize,
    pub code: String,
    pub name: String,
    pub item_type: WbsItemType,
    pub budget: Option<Money>,
    pub schedule: Schedule,
}

/// Parse a WBS import file, collecting every row error.
///
/// Row-local rules are applied here (code format, type-specific fields,
/// schedule consistency, duplicate codes within the file); rules that need
/// the rest of the tree are applied by [`plan_wbs_import`].
pub fn parse_wbs_rows(data: &[u8]) -> Result<Vec<WbsImportRow>, CoreError> {
    let table = CsvTable::parse(data)?;
    let code_col = table.require_column("wbsCode")?;
    let name_col = table.require_column("wbsName")?;
    let type_col = table.require_column("wbsType")?;
    let amount_col = table.column("amount");
    let start_col = table.column("startDate");
    let end_col = table.column("endDate");
    let duration_col = table.column("duration");

    let mut rows: Vec<WbsImportRow> = Vec::with_capacity(table.rows.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut errors = Vec::new();

    for (line, values) in &table.rows {
        let line = *line;
        let result = (|| -> Result<WbsImportRow, String> {
            let code = cell(values, Some(code_col)).ok_or("wbsCode is required")?;
            wbs::validate_code(code).map_err(|e| core_message(&e))?;
            if let Some(first) = seen.get(code) {
                return Err(format!("duplicate wbsCode '{code}' (first seen on line {first})"));
            }
            let name = cell(values, Some(name_col)).ok_or("wbsName is required")?;
            let item_type =
                WbsItemType::from_str_value(cell(values, Some(type_col)).ok_or("wbsType is required")?)
                    .map_err(|e| core_message(&e))?;

            let budget = cell(values, amount_col).map(parse_amount).transpose()?;
            if let Some(b) = budget {
                wbs::validate_budget(b).map_err(|e| core_message(&e))?;
            }
            let start = cell(values, start_col).map(parse_date).transpose()?;
            let end = cell(values, end_col).map(parse_date).transpose()?;
            let duration = cell(values, duration_col).map(parse_duration).transpose()?;
            let schedule = resolve_schedule(start, end, duration).map_err(|e| core_message(&e))?;

            wbs::validate_type_fields(item_type, budget.is_some(), !schedule.is_empty())
                .map_err(|e| core_message(&e))?;

            Ok(WbsImportRow {
                line,
                code: code.to_string(),
                name: name.to_string(),
                item_type,
                budget,
                schedule,
            })
        })();
        match result {
            Ok(row) => {
                seen.insert(row.code.clone(), line);
                rows.push(row);
            }
            Err(message) => errors.push(ImportRowError {
                row: line,
                message,
            }),
        }
    }

    if errors.is_empty() {
        Ok(rows)
    } else {
        Err(CoreError::ImportRows(errors))
    }
}

/// Sort rows so every parent precedes its children. Stable within a depth.
pub fn order_by_depth(rows: &mut [WbsImportRow]) {
    rows.sort_by_key(|row| wbs::code_depth(&row.code));
}

fn core_message(err: &CoreError) -> String {
    match err {
        CoreError::Validation(msg) | CoreError::Conflict(msg) | CoreError::Internal(msg) => {
            msg.clone()
        }
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Planning against the existing tree
// ---------------------------------------------------------------------------

/// An item already stored for the project.
#[derive(Debug, Clone)]
pub struct ExistingNode {
    pub id: DbId,
    pub parent_id: Option<DbId>,
    pub code: String,
    pub item_type: WbsItemType,
    pub budget: Option<Money>,
}

/// Where a planned item attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentRef {
    Root,
    Existing(DbId),
    /// Index of an earlier item in the same plan.
    Planned(usize),
}

/// A validated row ready for insertion, in insertion order.
#[derive(Debug, Clone)]
pub struct PlannedItem {
    pub row: WbsImportRow,
    pub parent: ParentRef,
}

/// Resolve parents by code and apply the hierarchy and budget rules to the
/// combined tree (existing items plus every imported row).
///
/// With `activities_only`, every row must be an Activity placed under an
/// existing or imported WorkPackage.
pub fn plan_wbs_import(
    existing: &[ExistingNode],
    mut rows: Vec<WbsImportRow>,
    project_budget: Money,
    activities_only: bool,
) -> Result<Vec<PlannedItem>, CoreError> {
    order_by_depth(&mut rows);

    let by_id: HashMap<DbId, &ExistingNode> = existing.iter().map(|n| (n.id, n)).collect();
    let by_code: HashMap<&str, &ExistingNode> =
        existing.iter().map(|n| (n.code.as_str(), n)).collect();

    let mut planned: Vec<PlannedItem> = Vec::with_capacity(rows.len());
    let mut planned_lineage: Vec<Vec<WbsItemType>> = Vec::with_capacity(rows.len());
    let mut planned_by_code: HashMap<String, usize> = HashMap::new();
    let mut errors = Vec::new();

    for row in rows {
        let line = row.line;
        let result = (|| -> Result<(ParentRef, Vec<WbsItemType>), String> {
            if activities_only && row.item_type != WbsItemType::Activity {
                return Err(format!(
                    "only Activity rows may be imported here, got {}",
                    row.item_type
                ));
            }
            if by_code.contains_key(row.code.as_str()) {
                return Err(format!("wbsCode '{}' already exists in this project", row.code));
            }

            let (parent, lineage) = match wbs::parent_code(&row.code) {
                None => (ParentRef::Root, Vec::new()),
                Some(pc) => {
                    if let Some(&idx) = planned_by_code.get(pc) {
                        let mut lineage = vec![planned[idx].row.item_type];
                        lineage.extend_from_slice(&planned_lineage[idx]);
                        (ParentRef::Planned(idx), lineage)
                    } else if let Some(node) = by_code.get(pc) {
                        (ParentRef::Existing(node.id), existing_lineage(node, &by_id))
                    } else {
                        return Err(format!("parent '{pc}' of '{}' was not found", row.code));
                    }
                }
            };
            wbs::validate_placement(row.item_type, &lineage).map_err(|e| core_message(&e))?;
            Ok((parent, lineage))
        })();

        match result {
            Ok((parent, lineage)) => {
                planned_by_code.insert(row.code.clone(), planned.len());
                planned_lineage.push(lineage);
                planned.push(PlannedItem { row, parent });
            }
            Err(message) => errors.push(ImportRowError {
                row: line,
                message,
            }),
        }
    }

    if errors.is_empty() {
        errors.extend(check_import_budgets(existing, &planned, project_budget));
    }

    if errors.is_empty() {
        Ok(planned)
    } else {
        errors.sort_by_key(|e| e.row);
        Err(CoreError::ImportRows(errors))
    }
}

/// Types from the node itself up to the root, nearest first.
fn existing_lineage(node: &ExistingNode, by_id: &HashMap<DbId, &ExistingNode>) -> Vec<WbsItemType> {
    let mut lineage = vec![node.item_type];
    let mut current = node.parent_id;
    while let Some(id) = current {
        match by_id.get(&id) {
            Some(parent) if lineage.len() <= by_id.len() => {
                lineage.push(parent.item_type);
                current = parent.parent_id;
            }
            _ => break,
        }
    }
    lineage
}

/// Re-run the rollup for every parent that gains budget-bearing children.
fn check_import_budgets(
    existing: &[ExistingNode],
    planned: &[PlannedItem],
    project_budget: Money,
) -> Vec<ImportRowError> {
    let mut groups: HashMap<ParentRef, (Vec<Money>, usize)> = HashMap::new();
    for item in planned.iter().filter(|p| p.row.item_type.is_budget_bearing()) {
        let entry = groups.entry(item.parent).or_insert_with(|| (Vec::new(), item.row.line));
        entry.0.push(item.row.budget.unwrap_or(Money::ZERO));
        entry.1 = entry.1.max(item.row.line);
    }

    let mut errors = Vec::new();
    for (parent, (new_budgets, last_line)) in groups {
        let (label, parent_budget, siblings) = match parent {
            ParentRef::Root => (
                "the project budget".to_string(),
                project_budget,
                existing_child_budgets(existing, None),
            ),
            ParentRef::Existing(id) => {
                let node = existing.iter().find(|n| n.id == id);
                (
                    format!("parent '{}'", node.map(|n| n.code.as_str()).unwrap_or("?")),
                    node.and_then(|n| n.budget).unwrap_or(Money::ZERO),
                    existing_child_budgets(existing, Some(id)),
                )
            }
            ParentRef::Planned(idx) => (
                format!("parent '{}'", planned[idx].row.code),
                planned[idx].row.budget.unwrap_or(Money::ZERO),
                Vec::new(),
            ),
        };
        let all: Vec<Money> = siblings.into_iter().chain(new_budgets).collect();
        if let Err(e) = wbs::check_budget_rollup(&label, parent_budget, &all, Money::ZERO) {
            errors.push(ImportRowError {
                row: last_line,
                message: core_message(&e),
            });
        }
    }
    errors
}

fn existing_child_budgets(existing: &[ExistingNode], parent_id: Option<DbId>) -> Vec<Money> {
    existing
        .iter()
        .filter(|n| n.parent_id == parent_id && n.item_type.is_budget_bearing())
        .map(|n| n.budget.unwrap_or(Money::ZERO))
        .collect()
}

/// Resolve every cost row to a budget-bearing item by code.
pub fn plan_cost_import(
    existing: &[ExistingNode],
    rows: Vec<CostImportRow>,
) -> Result<Vec<(DbId, CostImportRow)>, CoreError> {
    let by_code: HashMap<&str, &ExistingNode> =
        existing.iter().map(|n| (n.code.as_str(), n)).collect();

    let mut planned = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();
    for row in rows {
        match by_code.get(row.wbs_code.as_str()) {
            None => errors.push(ImportRowError {
                row: row.line,
                message: format!("wbsCode '{}' was not found in this project", row.wbs_code),
            }),
            Some(node) if !node.item_type.is_budget_bearing() => errors.push(ImportRowError {
                row: row.line,
                message: format!(
                    "costs cannot be posted to Activity '{}'; use its WorkPackage",
                    row.wbs_code
                ),
            }),
            Some(node) => planned.push((node.id, row)),
        }
    }

    if errors.is_empty() {
        Ok(planned)
    } else {
        Err(CoreError::ImportRows(errors))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
