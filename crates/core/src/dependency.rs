//! Activity dependency rules.
//!
//! Dependencies are directed edges between Activities of the same project.
//! The graph must stay free of self loops, duplicate edges and cycles.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Largest lead or lag accepted on a dependency, in days.
pub const MAX_LAG_DAYS: i32 = 3650;

pub const TYPE_FS: &str = "FS";
pub const TYPE_SS: &str = "SS";
pub const TYPE_FF: &str = "FF";
pub const TYPE_SF: &str = "SF";

/// All valid dependency type strings (stored in DB).
pub const VALID_DEPENDENCY_TYPES: &[&str] = &[TYPE_FS, TYPE_SS, TYPE_FF, TYPE_SF];

/// How the successor's dates relate to the predecessor's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyType {
    #[default]
    #[serde(rename = "FS", alias = "Finish-to-Start")]
    FinishToStart,
    #[serde(rename = "SS", alias = "Start-to-Start")]
    StartToStart,
    #[serde(rename = "FF", alias = "Finish-to-Finish")]
    FinishToFinish,
    #[serde(rename = "SF", alias = "Start-to-Finish")]
    StartToFinish,
}

impl DependencyType {
    /// Accepts both the short (`FS`) and long (`Finish-to-Start`) spellings.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_uppercase)
            .collect();
        match normalized.as_str() {
            "FS" | "FINISHTOSTART" => Ok(Self::FinishToStart),
            "SS" | "STARTTOSTART" => Ok(Self::StartToStart),
            "FF" | "FINISHTOFINISH" => Ok(Self::FinishToFinish),
            "SF" | "STARTTOFINISH" => Ok(Self::StartToFinish),
            _ => Err(CoreError::Validation(format!(
                "Invalid dependency type '{s}'. Must be one of: {}",
                VALID_DEPENDENCY_TYPES.join(", ")
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FinishToStart => TYPE_FS,
            Self::StartToStart => TYPE_SS,
            Self::FinishToFinish => TYPE_FF,
            Self::StartToFinish => TYPE_SF,
        }
    }

    /// Human-readable label for display in the UI.
    pub fn label(self) -> &'static str {
        match self {
            Self::FinishToStart => "Finish-to-Start",
            Self::StartToStart => "Start-to-Start",
            Self::FinishToFinish => "Finish-to-Finish",
            Self::StartToFinish => "Start-to-Finish",
        }
    }
}

/// An existing edge in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub predecessor_id: DbId,
    pub successor_id: DbId,
}

/// Validate a lead (negative) or lag (positive) in days.
pub fn validate_lag(lag_days: i32) -> Result<(), CoreError> {
    if !(-MAX_LAG_DAYS..=MAX_LAG_DAYS).contains(&lag_days) {
        return Err(CoreError::Validation(format!(
            "Lag must be between -{MAX_LAG_DAYS} and {MAX_LAG_DAYS} days"
        )));
    }
    Ok(())
}

/// Validate a proposed edge `predecessor -> successor` against the graph.
///
/// Rejects self loops, duplicates of an existing edge, and any edge that
/// would close a cycle.
pub fn validate_new_edge(
    edges: &[Edge],
    predecessor_id: DbId,
    successor_id: DbId,
) -> Result<(), CoreError> {
    if predecessor_id == successor_id {
        return Err(CoreError::Validation(
            "An activity cannot depend on itself".to_string(),
        ));
    }
    if edges
        .iter()
        .any(|e| e.predecessor_id == predecessor_id && e.successor_id == successor_id)
    {
        return Err(CoreError::Validation(format!(
            "Dependency from {predecessor_id} to {successor_id} already exists"
        )));
    }
    if let Some(path) = find_path(edges, successor_id, predecessor_id) {
        let chain: Vec<String> = path.iter().map(|id| id.to_string()).collect();
        return Err(CoreError::Validation(format!(
            "Dependency would create a cycle: {predecessor_id} -> {}",
            chain.join(" -> ")
        )));
    }
    Ok(())
}

/// Depth-first search for a path `from -> ... -> to` over existing edges.
///
/// Returns the path including both endpoints, or `None` when `to` is
/// unreachable.
pub fn find_path(edges: &[Edge], from: DbId, to: DbId) -> Option<Vec<DbId>> {
    let mut outgoing: HashMap<DbId, Vec<DbId>> = HashMap::new();
    for edge in edges {
        outgoing
            .entry(edge.predecessor_id)
            .or_default()
            .push(edge.successor_id);
    }

    let mut visited: HashSet<DbId> = HashSet::new();
    let mut parent: HashMap<DbId, DbId> = HashMap::new();
    let mut stack = vec![from];

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        if node == to {
            let mut path = vec![to];
            let mut current = to;
            while let Some(&prev) = parent.get(&current) {
                path.push(prev);
                current = prev;
            }
            path.reverse();
            return Some(path);
        }
        for &next in outgoing.get(&node).map(Vec::as_slice).unwrap_or_default() {
            if !visited.contains(&next) {
                parent.entry(next).or_insert(node);
                stack.push(next);
            }
        }
    }
    None
}
