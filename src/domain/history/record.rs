//! Change records - owned snapshots of one piece of chart state.

use crate::domain::chart::Chart;
use crate::domain::foundation::{ObjectiveId, Timestamp};
use crate::domain::preference::WeightMap;
use crate::domain::score_function::ScoreFunction;

/// Which kind of state a record restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    WeightMapChange,
    ScoreFunctionChange,
    AlternativeOrderChange,
}

/// Identifies the piece of state a record snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordTarget {
    WeightMap { username: String },
    ScoreFunction { username: String, objective_id: ObjectiveId },
    AlternativeOrder,
}

impl RecordTarget {
    pub fn change_type(&self) -> ChangeType {
        match self {
            RecordTarget::WeightMap { .. } => ChangeType::WeightMapChange,
            RecordTarget::ScoreFunction { .. } => ChangeType::ScoreFunctionChange,
            RecordTarget::AlternativeOrder => ChangeType::AlternativeOrderChange,
        }
    }
}

/// Deep copy of the snapshotted state. Never shares data with the live chart.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    WeightMap(WeightMap),
    ScoreFunction(ScoreFunction),
    AlternativeOrder(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub target: RecordTarget,
    pub snapshot: Snapshot,
    pub recorded_at: Timestamp,
}

impl ChangeRecord {
    /// Snapshots the current state of `target` in `chart`.
    ///
    /// Returns `None` if the user or score function no longer exists.
    pub fn capture(chart: &Chart, target: RecordTarget) -> Option<Self> {
        let snapshot = match &target {
            RecordTarget::WeightMap { username } => {
                Snapshot::WeightMap(chart.user(username)?.weight_map().clone())
            }
            RecordTarget::ScoreFunction {
                username,
                objective_id,
            } => Snapshot::ScoreFunction(
                chart.user(username)?.score_function(objective_id)?.memento(),
            ),
            RecordTarget::AlternativeOrder => Snapshot::AlternativeOrder(chart.alternative_order()),
        };
        Some(Self {
            target,
            snapshot,
            recorded_at: Timestamp::now(),
        })
    }

    pub fn change_type(&self) -> ChangeType {
        self.target.change_type()
    }

    /// True if the chart still holds exactly the snapshotted state.
    pub fn matches(&self, chart: &Chart) -> bool {
        match (&self.target, &self.snapshot) {
            (RecordTarget::WeightMap { username }, Snapshot::WeightMap(map)) => chart
                .user(username)
                .is_some_and(|u| u.weight_map() == map),
            (
                RecordTarget::ScoreFunction {
                    username,
                    objective_id,
                },
                Snapshot::ScoreFunction(function),
            ) => chart
                .user(username)
                .and_then(|u| u.score_function(objective_id))
                .is_some_and(|f| f == function),
            (RecordTarget::AlternativeOrder, Snapshot::AlternativeOrder(order)) => {
                &chart.alternative_order() == order
            }
            _ => false,
        }
    }

    /// Writes the snapshot back into `chart`.
    ///
    /// Returns false if the target no longer exists.
    pub fn apply(self, chart: &mut Chart) -> bool {
        match (self.target, self.snapshot) {
            (RecordTarget::WeightMap { username }, Snapshot::WeightMap(map)) => {
                match chart.user_mut(&username) {
                    Some(user) => {
                        user.set_weight_map(map);
                        true
                    }
                    None => false,
                }
            }
            (
                RecordTarget::ScoreFunction {
                    username,
                    objective_id,
                },
                Snapshot::ScoreFunction(function),
            ) => match chart.user_mut(&username) {
                Some(user) => {
                    user.score_functions_mut().set(objective_id, function);
                    true
                }
                None => false,
            },
            (RecordTarget::AlternativeOrder, Snapshot::AlternativeOrder(order)) => {
                chart.reorder_alternatives(&order);
                true
            }
            _ => false,
        }
    }
}
