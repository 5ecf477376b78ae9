//! Neighbour and sibling resize.

use crate::domain::foundation::{ObjectiveId, EPSILON};
use crate::domain::objective::Objective;
use crate::domain::preference::WeightMap;

use super::{RedistributionError, SiblingWeight};

/// Moves up to `delta` weight onto `siblings[target_index]` from its neighbour.
///
/// The neighbour is the next sibling, or the previous one when the target is
/// last. A negative `delta` moves weight the other way. The transfer is
/// clamped so the donor ends at exactly 0 rather than below it.
///
/// Returns the weight actually transferred onto the target.
///
/// # Errors
///
/// - `InvalidDelta` if `delta` is NaN or infinite
/// - `IndexOutOfRange` if `target_index` is not in `siblings`
/// - `NoNeighbor` if the group has a single member
/// - `UnknownObjective` if a sibling is not in `root`
pub fn resize_neighbors(
    weights: &mut WeightMap,
    root: &Objective,
    siblings: &[SiblingWeight],
    target_index: usize,
    delta: f64,
) -> Result<f64, RedistributionError> {
    if !delta.is_finite() {
        return Err(RedistributionError::InvalidDelta(delta));
    }
    let target = siblings
        .get(target_index)
        .ok_or(RedistributionError::IndexOutOfRange {
            index: target_index,
            len: siblings.len(),
        })?;
    let neighbor_index = if target_index + 1 < siblings.len() {
        target_index + 1
    } else if target_index > 0 {
        target_index - 1
    } else {
        return Err(RedistributionError::NoNeighbor(target.objective_id.clone()));
    };
    let neighbor = &siblings[neighbor_index];

    transfer(weights, root, &neighbor.objective_id, &target.objective_id, delta)
}

/// Splits the combined weight of two siblings so `first` holds
/// `first_proportion` of it.
///
/// Returns the weight moved onto `first` (negative if it lost weight).
pub fn resize_siblings(
    weights: &mut WeightMap,
    root: &Objective,
    first: &ObjectiveId,
    second: &ObjectiveId,
    first_proportion: f64,
) -> Result<f64, RedistributionError> {
    if !(0.0..=1.0).contains(&first_proportion) {
        return Err(RedistributionError::InvalidProportion(first_proportion));
    }
    let siblings = root
        .siblings_of(first)
        .ok_or_else(|| RedistributionError::UnknownObjective(first.clone()))?;
    if first == second || !siblings.iter().any(|s| s.id() == second) {
        return Err(RedistributionError::NotSiblings {
            first: first.clone(),
            second: second.clone(),
        });
    }

    let first_weight = weights.objective_weight(root, first);
    let combined = first_weight + weights.objective_weight(root, second);
    let delta = combined * first_proportion - first_weight;

    transfer(weights, root, second, first, delta)
}

/// Moves `delta` from `donor` to `receiver`, clamped to what the losing side holds.
fn transfer(
    weights: &mut WeightMap,
    root: &Objective,
    donor: &ObjectiveId,
    receiver: &ObjectiveId,
    delta: f64,
) -> Result<f64, RedistributionError> {
    if !delta.is_finite() {
        return Err(RedistributionError::InvalidDelta(delta));
    }
    let donor_weight = weights.objective_weight(root, donor);
    let receiver_weight = weights.objective_weight(root, receiver);
    let amount = delta.clamp(-receiver_weight, donor_weight);
    if amount.abs() <= EPSILON {
        return Ok(0.0);
    }

    add_weight(weights, root, receiver, amount)?;
    add_weight(weights, root, donor, -amount)?;
    Ok(amount)
}

/// Adds `amount` to an objective, spreading it over primitive leaves for
/// abstract objectives.
fn add_weight(
    weights: &mut WeightMap,
    root: &Objective,
    id: &ObjectiveId,
    amount: f64,
) -> Result<(), RedistributionError> {
    let node = root
        .find(id)
        .ok_or_else(|| RedistributionError::UnknownObjective(id.clone()))?;
    let leaves: Vec<(ObjectiveId, f64)> = node
        .primitives()
        .into_iter()
        .map(|p| (p.id.clone(), weights.weight(&p.id).unwrap_or(0.0)))
        .collect();
    if leaves.is_empty() {
        return Ok(());
    }

    let updated = if amount >= 0.0 {
        let share = amount / leaves.len() as f64;
        leaves.into_iter().map(|(id, w)| (id, w + share)).collect()
    } else {
        drain(leaves, -amount)
    };
    for (id, weight) in updated {
        weights.set_objective_weight(id, weight);
    }
    Ok(())
}

/// Removes `amount` from `leaves` as evenly as possible without taking any
/// leaf below 0. Leaves that run dry are set to exactly 0.
fn drain(mut leaves: Vec<(ObjectiveId, f64)>, amount: f64) -> Vec<(ObjectiveId, f64)> {
    let total: f64 = leaves.iter().map(|(_, w)| w).sum();
    if amount >= total - EPSILON {
        return leaves.into_iter().map(|(id, _)| (id, 0.0)).collect();
    }

    leaves.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut remaining = amount;
    let mut left = leaves.len();
    for (_, weight) in leaves.iter_mut() {
        let share = remaining / left as f64;
        let taken = share.min(*weight);
        *weight = if taken >= *weight { 0.0 } else { *weight - taken };
        remaining -= taken;
        left -= 1;
    }
    leaves
}
