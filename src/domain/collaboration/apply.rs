//! Structural changes and user validation shared by host and participants.

use tracing::{debug, warn};

use crate::domain::chart::{diff, repair_users, Chart, ChartStructure, RepairReport, StructureChange};
use crate::domain::preference::User;
use crate::ports::ChartValidator;

use super::SessionError;

/// What applying a new structure did to the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureUpdate {
    pub changes: Vec<StructureChange>,
    pub repairs: Vec<RepairReport>,
    /// Users whose repaired preferences still fail validation.
    pub invalid_users: Vec<String>,
}

impl StructureUpdate {
    /// Change descriptions for notifying the local user.
    pub fn messages(&self) -> Vec<String> {
        self.changes.iter().map(ToString::to_string).collect()
    }
}

/// Validates `structure` and, if it differs from the current one, applies it.
///
/// Existing users are kept, repaired against the new hierarchy and
/// revalidated. Returns `Ok(None)` when the structure is unchanged, so
/// applying the same payload twice has no further effect.
///
/// # Errors
///
/// - `ChartMismatch` if the structure belongs to another chart
/// - `StructureRejected` if validation reports problems; the chart is untouched
pub fn apply_structure(
    chart: &mut Chart,
    structure: ChartStructure,
    validator: &dyn ChartValidator,
) -> Result<Option<StructureUpdate>, SessionError> {
    if structure.id != chart.id() {
        return Err(SessionError::ChartMismatch {
            expected: chart.id(),
            actual: structure.id,
        });
    }
    if &structure == chart.structure() {
        debug!(chart_id = %chart.id(), "Structure unchanged, nothing to apply");
        return Ok(None);
    }

    let problems = validator.validate_structure(&Chart::new(structure.clone()));
    if !problems.is_empty() {
        warn!(chart_id = %chart.id(), problems = ?problems, "Rejected chart structure");
        return Err(SessionError::StructureRejected(problems));
    }

    let changes = diff(chart.structure(), &structure);
    let old = chart.replace_structure(structure);
    let (new, users) = chart.structure_and_users_mut();
    let repairs = repair_users(&old, new, users);
    let invalid_users = revalidate_users(chart, validator);

    debug!(
        chart_id = %chart.id(),
        changes = changes.len(),
        repaired = repairs.len(),
        invalid = invalid_users.len(),
        "Applied chart structure"
    );
    Ok(Some(StructureUpdate {
        changes,
        repairs,
        invalid_users,
    }))
}

/// Validates every user and records the outcome on each.
///
/// Returns the usernames now marked invalid.
pub fn revalidate_users(chart: &mut Chart, validator: &dyn ChartValidator) -> Vec<String> {
    let verdicts: Vec<Vec<String>> = chart
        .users()
        .iter()
        .map(|user| validator.validate_user(chart, user))
        .collect();

    let mut invalid = Vec::new();
    for (user, reasons) in chart.users_mut().iter_mut().zip(verdicts) {
        if !reasons.is_empty() {
            warn!(username = %user.username(), reasons = ?reasons, "User preferences invalid");
            invalid.push(user.username().to_string());
        }
        user.mark_validation(reasons);
    }
    invalid
}

/// Validates `user` against `chart` and records the outcome on it.
pub fn validate_user(chart: &Chart, mut user: User, validator: &dyn ChartValidator) -> User {
    let reasons = validator.validate_user(chart, &user);
    user.mark_validation(reasons);
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::validation::StandardChartValidator;
    use crate::domain::chart::Alternative;
    use crate::domain::foundation::{ChartId, ObjectiveId, WEIGHT_SUM_TOLERANCE};
    use crate::domain::objective::{Domain, Objective};
    use crate::domain::preference::{ScoreFunctionMap, WeightMap};

    fn chart() -> Chart {
        let root = Objective::group(
            "hotel",
            "Hotel",
            vec![
                Objective::primitive("rate", "Rate", Domain::continuous(100.0, 200.0)),
                Objective::primitive("size", "Size", Domain::continuous(200.0, 350.0)),
            ],
        );
        let mut structure = ChartStructure::new(ChartId::new(), "Hotels", "owner", root);
        structure.alternatives = vec![Alternative::new("Hyatt")
            .with_value("rate", 120.0)
            .with_value("size", 200.0)];
        let mut chart = Chart::new(structure);
        let alice = User::new(
            "alice",
            WeightMap::from_weights([("rate", 0.4), ("size", 0.6)]),
            ScoreFunctionMap::defaults_for(chart.root_objective()),
        )
        .unwrap();
        chart.upsert_user(alice);
        chart
    }

    fn without_size(chart: &Chart) -> ChartStructure {
        let size = ObjectiveId::from("size");
        let mut next = chart.structure().clone();
        next.root_objective.remove_descendant(&size);
        for alternative in &mut next.alternatives {
            alternative.values.remove(&size);
        }
        next
    }

    #[test]
    fn applying_structure_repairs_existing_users() {
        let mut chart = chart();
        let next = without_size(&chart);

        let update = apply_structure(&mut chart, next, &StandardChartValidator::new())
            .unwrap()
            .expect("structure differs");

        assert!(!update.changes.is_empty());
        assert_eq!(update.repairs.len(), 1);
        assert!(update.invalid_users.is_empty());
        let alice = chart.user("alice").unwrap();
        assert!(alice.weight_map().weight(&ObjectiveId::from("size")).is_none());
        assert!((alice.weight_map().weight_total() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
    }

    #[test]
    fn applying_same_structure_twice_is_noop() {
        let mut chart = chart();
        let next = without_size(&chart);
        let validator = StandardChartValidator::new();

        apply_structure(&mut chart, next.clone(), &validator).unwrap();
        let once = chart.clone();
        let again = apply_structure(&mut chart, next, &validator).unwrap();

        assert!(again.is_none());
        assert_eq!(chart, once);
    }

    #[test]
    fn invalid_structure_leaves_chart_untouched() {
        let mut chart = chart();
        let before = chart.clone();
        let mut next = chart.structure().clone();
        next.alternatives[0].values.remove(&ObjectiveId::from("rate"));

        let result = apply_structure(&mut chart, next, &StandardChartValidator::new());

        assert!(matches!(result, Err(SessionError::StructureRejected(_))));
        assert_eq!(chart, before);
    }
}
