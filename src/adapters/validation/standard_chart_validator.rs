//! Standard Chart Validator - Implementation of ChartValidator.
//!
//! Checks chart structures and user preferences against the rules every
//! session relies on. Each problem is reported as a human-readable message so
//! hosts can relay them to authors unchanged.

use std::collections::HashSet;

use crate::domain::chart::Chart;
use crate::domain::foundation::WEIGHT_SUM_TOLERANCE;
use crate::domain::objective::Objective;
use crate::domain::preference::User;
use crate::ports::ChartValidator;

/// Rule-based validator with no runtime state.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` and can be shared across sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardChartValidator;

impl StandardChartValidator {
    pub fn new() -> Self {
        Self
    }

    fn objective_problems(root: &Objective) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        for objective in root.descendants() {
            if !seen.insert(objective.id().clone()) {
                problems.push(format!("Objective id '{}' is used more than once", objective.id()));
            }
            if objective.name().trim().is_empty() {
                problems.push(format!("Objective '{}' has no name", objective.id()));
            }
            match objective.as_primitive() {
                Some(primitive) => {
                    for problem in primitive.domain.problems() {
                        problems.push(format!("Objective '{}': {}", primitive.name, problem));
                    }
                    if let Some(default) = &primitive.default_score_function {
                        for problem in default.problems_against(&primitive.domain) {
                            problems.push(format!(
                                "Default score function of '{}': {}",
                                primitive.name, problem
                            ));
                        }
                    }
                }
                None if objective.children().is_empty() => {
                    problems.push(format!(
                        "Abstract objective '{}' has no children",
                        objective.name()
                    ));
                }
                None => {}
            }
        }
        problems
    }

    fn alternative_problems(chart: &Chart) -> Vec<String> {
        let mut problems = Vec::new();
        let mut names = HashSet::new();
        let primitives = chart.structure().primitives();

        for alternative in chart.alternatives() {
            if alternative.name.trim().is_empty() {
                problems.push("An alternative has no name".to_string());
            }
            if !names.insert(alternative.name.as_str()) {
                problems.push(format!(
                    "Alternative name '{}' is used more than once",
                    alternative.name
                ));
            }
            for primitive in &primitives {
                match alternative.value_of(&primitive.id) {
                    None => problems.push(format!(
                        "Alternative '{}' has no value for '{}'",
                        alternative.name, primitive.name
                    )),
                    Some(value) if !primitive.domain.contains(value) => problems.push(format!(
                        "Value {} of alternative '{}' is outside the domain of '{}'",
                        value, alternative.name, primitive.name
                    )),
                    Some(_) => {}
                }
            }
            for id in alternative.values.keys() {
                if chart.structure().find_primitive(id).is_none() {
                    problems.push(format!(
                        "Alternative '{}' has a value for unknown objective '{}'",
                        alternative.name, id
                    ));
                }
            }
        }
        problems
    }
}

impl ChartValidator for StandardChartValidator {
    fn validate_structure(&self, chart: &Chart) -> Vec<String> {
        let mut problems = Vec::new();
        if chart.name().trim().is_empty() {
            problems.push("Chart has no name".to_string());
        }
        if chart.creator().trim().is_empty() {
            problems.push("Chart has no creator".to_string());
        }
        if chart.root_objective().primitives().is_empty() {
            problems.push("Chart has no primitive objectives".to_string());
        }
        problems.extend(Self::objective_problems(chart.root_objective()));
        problems.extend(Self::alternative_problems(chart));
        problems
    }

    fn validate_user(&self, chart: &Chart, user: &User) -> Vec<String> {
        let mut problems = Vec::new();
        let weights = user.weight_map();

        for primitive in chart.structure().primitives() {
            match weights.weight(&primitive.id) {
                None => problems.push(format!("No weight for '{}'", primitive.name)),
                Some(w) if w < 0.0 || !w.is_finite() => {
                    problems.push(format!("Weight of '{}' is negative", primitive.name))
                }
                Some(_) => {}
            }
            match user.score_function(&primitive.id) {
                None => problems.push(format!("No score function for '{}'", primitive.name)),
                Some(function) => {
                    for problem in function.problems_against(&primitive.domain) {
                        problems.push(format!(
                            "Score function of '{}': {}",
                            primitive.name, problem
                        ));
                    }
                }
            }
        }

        for (id, _) in weights.iter() {
            if chart.structure().find_primitive(id).is_none() {
                problems.push(format!("Weight for unknown objective '{}'", id));
            }
        }

        let total = weights.objective_weight(chart.root_objective(), chart.root_objective().id());
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            problems.push(format!("Weights sum to {:.4} instead of 1", total));
        }
        problems
    }
}
