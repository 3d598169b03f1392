//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod cost_entry_repo;
pub mod dependency_repo;
pub mod project_repo;
pub mod task_repo;
pub mod wbs_item_repo;

pub use cost_entry_repo::CostEntryRepo;
pub use dependency_repo::DependencyRepo;
pub use project_repo::ProjectRepo;
pub use task_repo::TaskRepo;
pub use wbs_item_repo::WbsItemRepo;
