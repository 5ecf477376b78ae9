//! Domain layer containing the decision model and session logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, state machine)
//! - `objective` - Objective hierarchy and attribute domains
//! - `score_function` - Discrete and continuous score functions
//! - `preference` - Users, weight maps and score function maps
//! - `chart` - Charts, alternatives, structural diffs and preference repair
//! - `redistribution` - Weight resizing and pumping
//! - `analysis` - Utilities, rankings and rendering accessors
//! - `history` - Undo/redo of preference edits
//! - `collaboration` - Host and participant sessions and their protocol

pub mod analysis;
pub mod chart;
pub mod collaboration;
pub mod foundation;
pub mod history;
pub mod objective;
pub mod preference;
pub mod redistribution;
pub mod score_function;
