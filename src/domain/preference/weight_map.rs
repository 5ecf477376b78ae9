//! Per-user importance weights over primitive objectives.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{ObjectiveId, EPSILON};
use crate::domain::objective::Objective;

/// Mapping from primitive objective id to a non-negative weight.
///
/// Only primitives are stored. The weight of an abstract objective is the
/// sum over its primitive descendants, so every sibling group sums to its
/// parent's weight without further bookkeeping. The root's total is expected
/// to be 1 but is never assumed exact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap {
    weights: BTreeMap<ObjectiveId, f64>,
}

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(primitive id, weight)` pairs.
    pub fn from_weights<I, K>(weights: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<ObjectiveId>,
    {
        Self {
            weights: weights.into_iter().map(|(k, w)| (k.into(), w)).collect(),
        }
    }

    /// Equal weights over every primitive of `root`.
    pub fn uniform(root: &Objective) -> Self {
        let ids = root.primitive_ids();
        let share = if ids.is_empty() { 0.0 } else { 1.0 / ids.len() as f64 };
        Self::from_weights(ids.into_iter().map(|id| (id, share)))
    }

    /// Stored weight of a primitive, if any.
    pub fn weight(&self, id: &ObjectiveId) -> Option<f64> {
        self.weights.get(id).copied()
    }

    pub fn set_objective_weight(&mut self, id: ObjectiveId, weight: f64) {
        self.weights.insert(id, weight);
    }

    pub fn remove_objective_weight(&mut self, id: &ObjectiveId) -> Option<f64> {
        self.weights.remove(id)
    }

    pub fn contains(&self, id: &ObjectiveId) -> bool {
        self.weights.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectiveId, f64)> {
        self.weights.iter().map(|(k, w)| (k, *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight of any objective in `root`.
    ///
    /// Primitives return their stored weight, abstract objectives the sum over
    /// their primitive descendants. Unknown ids weigh 0.
    pub fn objective_weight(&self, root: &Objective, id: &ObjectiveId) -> f64 {
        match root.find(id) {
            Some(Objective::Primitive(p)) => self.weight(&p.id).unwrap_or(0.0),
            Some(node) => node
                .primitives()
                .iter()
                .map(|p| self.weight(&p.id).unwrap_or(0.0))
                .sum(),
            None => 0.0,
        }
    }

    /// Sum of every stored weight.
    pub fn weight_total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Objective weight divided by the root's total weight.
    pub fn normalized_weight(&self, root: &Objective, id: &ObjectiveId) -> f64 {
        let total = self.objective_weight(root, root.id());
        if total <= EPSILON {
            return 0.0;
        }
        self.objective_weight(root, id) / total
    }

    /// Rescales stored weights proportionally so they sum to 1.
    ///
    /// If every weight is zero the total is split evenly instead.
    pub fn normalize(&mut self) {
        let total = self.weight_total();
        if self.weights.is_empty() {
            return;
        }
        if total <= EPSILON {
            let share = 1.0 / self.weights.len() as f64;
            self.weights.values_mut().for_each(|w| *w = share);
            return;
        }
        self.weights.values_mut().for_each(|w| *w /= total);
    }
}
