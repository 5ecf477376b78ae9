//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait and error types
//! that form the vocabulary of the ValueChart domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ChartId, ConnectionId, ObjectiveId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;

/// Tolerance used when comparing accumulated floating point weights and scores.
pub const EPSILON: f64 = 1e-9;

/// Tolerance used when validating that a user's weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
