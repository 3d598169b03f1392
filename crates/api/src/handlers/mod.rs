//! Request handlers, one module per resource.

pub mod cost;
pub mod dependency;
pub mod import;
pub mod project;
pub mod task;
pub mod wbs;
