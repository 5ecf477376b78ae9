//! Chart validator port - structural and preference validation.
//!
//! Validation never fails with an error. Implementations return a list of
//! human-readable problems, empty when the input is acceptable.

use crate::domain::chart::Chart;
use crate::domain::preference::User;

/// Port for validating charts before structural or user changes are accepted.
///
/// # Contract
///
/// Implementations must be pure: no I/O, no blocking, no mutation.
pub trait ChartValidator: Send + Sync {
    /// Problems with the chart's objectives, alternatives and users' weights.
    fn validate_structure(&self, chart: &Chart) -> Vec<String>;

    /// Problems with one user's preferences against the chart's structure.
    fn validate_user(&self, chart: &Chart, user: &User) -> Vec<String>;
}
