//! Domain logic for the Groundwork project-management backend.
//!
//! Nothing in this crate touches the database. Callers load rows through
//! `groundwork-db` and hand plain values to the checks defined here.

pub mod cost;
pub mod dependency;
pub mod error;
pub mod evm;
pub mod import;
pub mod project;
pub mod schedule;
pub mod types;
pub mod wbs;
