//! Weight redistribution - interactive weight edits that keep every sibling
//! group summing to its parent.
//!
//! Weight only ever moves between two siblings; it is never created or
//! destroyed, so no renormalisation pass is needed afterwards.
//!
//! - [`resize_neighbors`] - shift a delta between a sibling and its neighbour
//! - [`resize_siblings`] - split two siblings' combined weight in a proportion
//! - [`pump`] - nudge one primitive by 1% of the total weight

mod pump;
mod resize;

pub use pump::{pump, PumpDirection, PUMP_STEP};
pub use resize::{resize_neighbors, resize_siblings};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::ObjectiveId;
use crate::domain::objective::Objective;
use crate::domain::preference::WeightMap;

/// Errors raised by redistribution operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RedistributionError {
    #[error("Unknown objective '{0}'")]
    UnknownObjective(ObjectiveId),

    #[error("Objective '{0}' has no sibling to exchange weight with")]
    NoNeighbor(ObjectiveId),

    #[error("Sibling index {index} out of range (group has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Objective '{0}' is not primitive")]
    NotPrimitive(ObjectiveId),

    #[error("Objectives '{first}' and '{second}' are not siblings")]
    NotSiblings {
        first: ObjectiveId,
        second: ObjectiveId,
    },

    #[error("Proportion {0} is outside [0, 1]")]
    InvalidProportion(f64),

    #[error("Weight change {0} is not a finite number")]
    InvalidDelta(f64),
}

/// One entry of a flattened sibling group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiblingWeight {
    pub objective_id: ObjectiveId,
    pub weight: f64,
    pub is_abstract: bool,
    /// Number of primitive leaves under this entry; 1 for a primitive.
    pub child_count: usize,
}

/// The ordered sibling group containing `objective_id`, with current weights.
pub fn sibling_weights(
    root: &Objective,
    weights: &WeightMap,
    objective_id: &ObjectiveId,
) -> Result<Vec<SiblingWeight>, RedistributionError> {
    let siblings = root
        .siblings_of(objective_id)
        .ok_or_else(|| RedistributionError::UnknownObjective(objective_id.clone()))?;
    Ok(siblings
        .iter()
        .map(|node| SiblingWeight {
            objective_id: node.id().clone(),
            weight: weights.objective_weight(root, node.id()),
            is_abstract: !node.is_primitive(),
            child_count: node.primitives().len(),
        })
        .collect())
}
