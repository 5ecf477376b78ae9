//! Two-stack undo/redo over change records.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::chart::Chart;
use crate::domain::foundation::ObjectiveId;

use super::{ChangeRecord, ChangeType, RecordTarget};

/// One undo step: the records of every target one user action touched.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEntry {
    records: Vec<ChangeRecord>,
}

impl ChangeEntry {
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn change_types(&self) -> Vec<ChangeType> {
        self.records.iter().map(ChangeRecord::change_type).collect()
    }
}

/// Undo and redo stacks for one participant's local edits.
///
/// Records are saved before the edit they guard. Within an open action
/// (between [`begin_action`](Self::begin_action) and
/// [`finish_action`](Self::finish_action)) only the first record per target
/// is kept, and all of them undo together in one step. Outside an action
/// every save is its own step.
#[derive(Debug, Default)]
pub struct ChangeStack {
    undo: Vec<ChangeEntry>,
    redo: Vec<ChangeEntry>,
    action: Option<OpenAction>,
}

#[derive(Debug, Default)]
struct OpenAction {
    records: Vec<ChangeRecord>,
    targets: HashSet<RecordTarget>,
}

impl ChangeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo steps.
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn in_action(&self) -> bool {
        self.action.is_some()
    }

    /// Opens a user action. No-op if one is already open.
    pub fn begin_action(&mut self) {
        if self.action.is_none() {
            self.action = Some(OpenAction::default());
        }
    }

    /// Closes the open action, pushing its changed records as one step.
    ///
    /// Returns true if a step was pushed; an action with no net change
    /// leaves the history untouched.
    pub fn finish_action(&mut self, chart: &Chart) -> bool {
        let Some(action) = self.action.take() else {
            return false;
        };
        let records: Vec<ChangeRecord> = action
            .records
            .into_iter()
            .filter(|record| !record.matches(chart))
            .collect();
        if records.is_empty() {
            return false;
        }
        self.undo.push(ChangeEntry { records });
        self.redo.clear();
        true
    }

    pub fn save_weight_map_record(&mut self, chart: &Chart, username: &str) {
        self.save(
            chart,
            RecordTarget::WeightMap {
                username: username.to_string(),
            },
        );
    }

    pub fn save_score_function_record(
        &mut self,
        chart: &Chart,
        username: &str,
        objective_id: &ObjectiveId,
    ) {
        self.save(
            chart,
            RecordTarget::ScoreFunction {
                username: username.to_string(),
                objective_id: objective_id.clone(),
            },
        );
    }

    pub fn save_alternative_order_record(&mut self, chart: &Chart) {
        self.save(chart, RecordTarget::AlternativeOrder);
    }

    /// Snapshots `target` before it is edited.
    pub fn save(&mut self, chart: &Chart, target: RecordTarget) {
        if let Some(action) = &mut self.action {
            if action.targets.contains(&target) {
                return;
            }
            if let Some(record) = ChangeRecord::capture(chart, target.clone()) {
                action.targets.insert(target);
                action.records.push(record);
            }
            return;
        }
        let Some(record) = ChangeRecord::capture(chart, target) else {
            return;
        };
        self.undo.push(ChangeEntry {
            records: vec![record],
        });
        self.redo.clear();
    }

    /// Deletes records whose target is unchanged.
    ///
    /// Inside an action this prunes the action's records, so a later save
    /// of a pruned target snapshots it again. Outside an action only the
    /// most recent step is checked. Returns how many records were removed.
    pub fn remove_unnecessary_records(&mut self, chart: &Chart) -> usize {
        if let Some(action) = &mut self.action {
            let before = action.records.len();
            let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut action.records)
                .into_iter()
                .partition(|record| !record.matches(chart));
            for record in &dropped {
                action.targets.remove(&record.target);
            }
            action.records = kept;
            return before - action.records.len();
        }

        let Some(entry) = self.undo.last_mut() else {
            return 0;
        };
        let before = entry.records.len();
        entry.records.retain(|record| !record.matches(chart));
        let removed = before - entry.records.len();
        if entry.records.is_empty() {
            self.undo.pop();
        }
        removed
    }

    /// Restores the most recent step. No-op on an empty stack.
    ///
    /// An open action is finished first.
    pub fn undo(&mut self, chart: &mut Chart) -> Option<Vec<ChangeType>> {
        self.finish_action(chart);
        let entry = self.undo.pop()?;
        let (change_types, inverse) = Self::swap(entry, chart)?;
        self.redo.push(inverse);
        debug!(change_types = ?change_types, "Undid change");
        Some(change_types)
    }

    /// Re-applies the most recently undone step. No-op on an empty stack.
    pub fn redo(&mut self, chart: &mut Chart) -> Option<Vec<ChangeType>> {
        self.finish_action(chart);
        let entry = self.redo.pop()?;
        let (change_types, inverse) = Self::swap(entry, chart)?;
        self.undo.push(inverse);
        debug!(change_types = ?change_types, "Redid change");
        Some(change_types)
    }

    /// Applies `entry` and returns the step that restores what it replaced.
    ///
    /// Records whose target no longer exists are skipped.
    fn swap(entry: ChangeEntry, chart: &mut Chart) -> Option<(Vec<ChangeType>, ChangeEntry)> {
        let mut change_types = Vec::new();
        let mut inverse = Vec::new();
        for record in entry.records.into_iter().rev() {
            let Some(current) = ChangeRecord::capture(chart, record.target.clone()) else {
                continue;
            };
            let change_type = record.change_type();
            if record.apply(chart) {
                change_types.push(change_type);
                inverse.push(current);
            }
        }
        if inverse.is_empty() {
            return None;
        }
        Some((change_types, ChangeEntry { records: inverse }))
    }

    /// Discards all history, e.g. when the session ends.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.action = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::{Alternative, ChartStructure};
    use crate::domain::foundation::ChartId;
    use crate::domain::objective::{Domain, DomainValue, Objective};
    use crate::domain::preference::User;
    use crate::domain::redistribution::{pump, PumpDirection};
    use crate::domain::score_function::Scoring;

    fn chart() -> Chart {
        let root = Objective::group(
            "root",
            "Root",
            vec![
                Objective::primitive("a", "A", Domain::continuous(0.0, 10.0)),
                Objective::primitive("b", "B", Domain::categorical(["x", "y"])),
            ],
        );
        let mut structure = ChartStructure::new(ChartId::new(), "Test", "alice", root);
        structure.alternatives = vec![Alternative::new("One"), Alternative::new("Two")];
        let mut chart = Chart::new(structure);
        let alice = User::with_defaults("alice", chart.root_objective()).unwrap();
        chart.upsert_user(alice);
        chart
    }

    fn pump_a(chart: &mut Chart) {
        let root = chart.root_objective().clone();
        let user = chart.user_mut("alice").unwrap();
        pump(user.weight_map_mut(), &root, &"a".into(), PumpDirection::Increase).unwrap();
    }

    #[test]
    fn undo_on_empty_stack_is_noop() {
        let mut chart = chart();
        let before = chart.clone();
        let mut stack = ChangeStack::new();
        assert_eq!(stack.undo(&mut chart), None);
        assert_eq!(stack.redo(&mut chart), None);
        assert_eq!(chart, before);
    }

    #[test]
    fn undo_then_redo_is_symmetric() {
        let mut chart = chart();
        let original = chart.clone();
        let mut stack = ChangeStack::new();

        stack.save_weight_map_record(&chart, "alice");
        pump_a(&mut chart);
        let edited = chart.clone();

        assert_eq!(stack.undo(&mut chart), Some(vec![ChangeType::WeightMapChange]));
        assert_eq!(chart, original);
        assert_eq!(stack.redo(&mut chart), Some(vec![ChangeType::WeightMapChange]));
        assert_eq!(chart, edited);
    }

    #[test]
    fn gesture_collapses_into_one_record() {
        let mut chart = chart();
        let original = chart.clone();
        let mut stack = ChangeStack::new();

        stack.begin_action();
        for _ in 0..5 {
            stack.save_weight_map_record(&chart, "alice");
            pump_a(&mut chart);
        }
        stack.finish_action(&chart);

        assert_eq!(stack.undo_len(), 1);
        stack.undo(&mut chart);
        assert_eq!(chart, original);
    }

    #[test]
    fn gesture_over_several_targets_undoes_in_one_step() {
        let mut chart = chart();
        let original = chart.clone();
        let mut stack = ChangeStack::new();
        let b: ObjectiveId = "b".into();

        stack.begin_action();
        stack.save_weight_map_record(&chart, "alice");
        pump_a(&mut chart);
        stack.save_score_function_record(&chart, "alice", &b);
        chart
            .user_mut("alice")
            .unwrap()
            .score_functions_mut()
            .get_mut(&b)
            .unwrap()
            .set_element_score(&DomainValue::from("x"), 0.4)
            .unwrap();
        stack.save_alternative_order_record(&chart);
        chart.move_alternative(0, 1);
        assert!(stack.finish_action(&chart));
        let edited = chart.clone();

        assert_eq!(stack.undo_len(), 1);
        let undone = stack.undo(&mut chart).unwrap();
        assert_eq!(undone.len(), 3);
        assert_eq!(chart, original);
        stack.redo(&mut chart);
        assert_eq!(chart, edited);
    }

    #[test]
    fn pruning_inside_action_keeps_redo_and_allows_resave() {
        let mut chart = chart();
        let mut stack = ChangeStack::new();
        stack.save_alternative_order_record(&chart);
        chart.move_alternative(0, 1);
        stack.undo(&mut chart);
        assert!(stack.can_redo());

        stack.begin_action();
        stack.save_weight_map_record(&chart, "alice");
        assert_eq!(stack.remove_unnecessary_records(&chart), 1);
        stack.save_weight_map_record(&chart, "alice");
        pump_a(&mut chart);
        assert!(stack.can_redo());
        assert!(stack.finish_action(&chart));

        assert_eq!(stack.undo_len(), 1);
        assert!(!stack.can_redo());
    }

    #[test]
    fn action_without_net_change_leaves_no_record() {
        let mut chart = chart();
        let mut stack = ChangeStack::new();

        stack.begin_action();
        stack.save_weight_map_record(&chart, "alice");
        stack.save_alternative_order_record(&chart);
        stack.finish_action(&chart);

        assert!(!stack.can_undo());
    }

    #[test]
    fn snapshots_are_not_aliased_to_live_functions() {
        let mut chart = chart();
        let mut stack = ChangeStack::new();
        let id: ObjectiveId = "b".into();

        stack.save_score_function_record(&chart, "alice", &id);
        let function = chart
            .user_mut("alice")
            .unwrap()
            .score_functions_mut()
            .get_mut(&id)
            .unwrap();
        function.set_element_score(&DomainValue::from("x"), 0.9).unwrap();

        stack.undo(&mut chart);
        let restored = chart.user("alice").unwrap().score_function(&id).unwrap();
        assert_eq!(restored.evaluate(&DomainValue::from("x")), Ok(0.0));
    }

    #[test]
    fn alternative_order_round_trips_and_new_edit_clears_redo() {
        let mut chart = chart();
        let mut stack = ChangeStack::new();

        stack.save_alternative_order_record(&chart);
        chart.move_alternative(0, 1);
        stack.undo(&mut chart);
        assert_eq!(chart.alternative_order(), vec!["One", "Two"]);
        assert!(stack.can_redo());

        stack.save_weight_map_record(&chart, "alice");
        assert!(!stack.can_redo());
    }
}
