//! Chart module - the shared artifact participants collaborate on.
//!
//! # Components
//!
//! - [`Chart`] - structure plus users; unit of sync and persistence
//! - [`ChartStructure`] - objectives, alternatives and metadata, no users
//! - [`Alternative`] - one candidate with values per primitive objective
//! - [`diff`] - human-readable change list between two structures
//! - [`repair_users`] - brings preferences in line with a new structure

mod alternative;
#[allow(clippy::module_inception)]
mod chart;
mod diff;
mod repair;

pub use alternative::Alternative;
pub use chart::{Chart, ChartStructure, ChartType, UserUpsert};
pub use diff::{diff, StructureChange};
pub use repair::{repair_user, repair_users, RepairReport};
