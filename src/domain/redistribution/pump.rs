//! Click-driven weight pump.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ObjectiveId, EPSILON};
use crate::domain::objective::Objective;
use crate::domain::preference::WeightMap;

use super::{resize_neighbors, sibling_weights, RedistributionError};

/// Fraction of the total weight moved by one pump.
pub const PUMP_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpDirection {
    Increase,
    Decrease,
}

/// Moves one step of weight onto (or off) a primitive objective, trading it
/// with the nearest sibling by the neighbour-resize rule.
///
/// Returns the weight moved onto the objective.
pub fn pump(
    weights: &mut WeightMap,
    root: &Objective,
    objective_id: &ObjectiveId,
    direction: PumpDirection,
) -> Result<f64, RedistributionError> {
    let node = root
        .find(objective_id)
        .ok_or_else(|| RedistributionError::UnknownObjective(objective_id.clone()))?;
    if !node.is_primitive() {
        return Err(RedistributionError::NotPrimitive(objective_id.clone()));
    }

    let total = weights.objective_weight(root, root.id());
    let step = if total <= EPSILON { PUMP_STEP } else { total * PUMP_STEP };
    let delta = match direction {
        PumpDirection::Increase => step,
        PumpDirection::Decrease => -step,
    };

    let siblings = sibling_weights(root, weights, objective_id)?;
    let index = siblings
        .iter()
        .position(|s| &s.objective_id == objective_id)
        .ok_or_else(|| RedistributionError::UnknownObjective(objective_id.clone()))?;
    resize_neighbors(weights, root, &siblings, index, delta)
}
