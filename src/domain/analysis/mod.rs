//! Analysis module - aggregated views over participants' preferences.
//!
//! Everything here is a pure computation over a [`Chart`](crate::domain::chart::Chart)
//! and feeds the rendering layer through pull accessors.

mod aggregator;

pub use aggregator::{
    AggregationError, AlternativeUtility, ChartRanking, ObjectiveWeight, PreferenceAggregator,
    ScoreContribution, UserRanking,
};
