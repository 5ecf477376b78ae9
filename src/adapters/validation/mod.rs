//! Validation Adapters - Chart and preference validation.

mod standard_chart_validator;

pub use standard_chart_validator::StandardChartValidator;
