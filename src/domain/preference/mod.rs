//! Preferences - what each participant brings to a chart.
//!
//! - [`WeightMap`] - importance of each primitive objective
//! - [`ScoreFunctionMap`] - one utility curve per primitive objective
//! - [`User`] - identity plus both maps

mod user;
mod weight_map;

pub use user::{ScoreFunctionMap, User};
pub use weight_map::WeightMap;
