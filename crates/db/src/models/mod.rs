//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` + `Validate` create DTO for inserts
//! - A `Deserialize` + `Validate` update DTO (all `Option` fields) for patches
//!
//! JSON field names are camelCase to match the dashboard client.

pub mod cost_entry;
pub mod dependency;
pub mod project;
pub mod task;
pub mod wbs_item;
