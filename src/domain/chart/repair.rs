//! Preference repair after a structural edit.
//!
//! Brings each user's weights and score functions in line with a new
//! objective hierarchy:
//!
//! - entries for objectives that no longer exist are dropped and the
//!   remaining weights renormalised proportionally to sum to 1
//! - new primitives get weight 0 and the objective's default score function
//! - a domain kind change resets the score function to the default
//! - a continuous range change resets the score function to the default
//! - categorical or interval elements that disappeared are dropped and the
//!   function is rescaled; new elements take the default function's score
//!
//! Repair never validates. Callers validate the result and mark users whose
//! preferences still fail.

use crate::domain::foundation::{ObjectiveId, EPSILON};
use crate::domain::objective::{Domain, Objective, PrimitiveObjective};
use crate::domain::preference::User;
use crate::domain::score_function::{ScoreFunction, Scoring};

use super::ChartStructure;

/// Messages produced while repairing one user.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairReport {
    pub username: String,
    pub messages: Vec<String>,
}

/// Repairs every user in place and returns a report for each user that changed.
pub fn repair_users(
    old: &ChartStructure,
    new: &ChartStructure,
    users: &mut [User],
) -> Vec<RepairReport> {
    users
        .iter_mut()
        .filter_map(|user| {
            let messages = repair_user(&old.root_objective, &new.root_objective, user);
            (!messages.is_empty()).then(|| RepairReport {
                username: user.username().to_string(),
                messages,
            })
        })
        .collect()
}

/// Repairs one user against the move from `old_root` to `new_root`.
pub fn repair_user(old_root: &Objective, new_root: &Objective, user: &mut User) -> Vec<String> {
    let mut messages = Vec::new();
    let primitives = new_root.primitives();
    let current: Vec<&ObjectiveId> = primitives.iter().map(|p| &p.id).collect();

    drop_removed(old_root, &current, user, &mut messages);

    for primitive in primitives {
        complete_missing(primitive, user, &mut messages);
        let old_domain = old_root.find_primitive(&primitive.id).map(|p| &p.domain);
        if let Some(old_domain) = old_domain {
            if old_domain != &primitive.domain {
                repair_domain(old_domain, primitive, user, &mut messages);
            }
        }
    }
    messages
}

fn drop_removed(
    old_root: &Objective,
    current: &[&ObjectiveId],
    user: &mut User,
    messages: &mut Vec<String>,
) {
    let stale_weights: Vec<ObjectiveId> = user
        .weight_map()
        .iter()
        .map(|(id, _)| id.clone())
        .filter(|id| !current.contains(&id))
        .collect();
    let mut lost_weight = 0.0;
    for id in &stale_weights {
        lost_weight += user.weight_map_mut().remove_objective_weight(id).unwrap_or(0.0);
        messages.push(format!(
            "Weight for removed objective '{}' was dropped",
            objective_label(old_root, id)
        ));
    }
    if lost_weight > EPSILON {
        user.weight_map_mut().normalize();
        messages.push("Remaining weights were renormalised to sum to 1".to_string());
    }

    let stale_functions: Vec<ObjectiveId> = user
        .score_functions()
        .ids()
        .into_iter()
        .filter(|id| !current.contains(&id))
        .collect();
    for id in &stale_functions {
        user.score_functions_mut().remove(id);
        messages.push(format!(
            "Score function for removed objective '{}' was dropped",
            objective_label(old_root, id)
        ));
    }
}

fn complete_missing(primitive: &PrimitiveObjective, user: &mut User, messages: &mut Vec<String>) {
    if !user.weight_map().contains(&primitive.id) {
        user.weight_map_mut()
            .set_objective_weight(primitive.id.clone(), 0.0);
        messages.push(format!("Objective '{}' starts with weight 0", primitive.name));
    }
    if !user.score_functions().contains(&primitive.id) {
        user.score_functions_mut()
            .set(primitive.id.clone(), primitive.default_score_function());
        messages.push(format!(
            "Objective '{}' uses the default score function",
            primitive.name
        ));
    }
}

fn repair_domain(
    old_domain: &Domain,
    primitive: &PrimitiveObjective,
    user: &mut User,
    messages: &mut Vec<String>,
) {
    let default = primitive.default_score_function();
    let Some(function) = user.score_functions_mut().get_mut(&primitive.id) else {
        return;
    };

    let kind_changed = old_domain.kind() != primitive.domain.kind()
        || function.kind() != primitive.domain.score_function_kind();
    let range_changed = matches!(primitive.domain, Domain::Continuous(_))
        && old_domain.range() != primitive.domain.range();

    if kind_changed || range_changed {
        *function = default;
        messages.push(format!(
            "Score function for '{}' was reset because its domain changed",
            primitive.name
        ));
        return;
    }

    let removed = function.retain_domain_elements(&primitive.domain);
    for key in &removed {
        messages.push(format!(
            "Element '{}' was removed from the score function for '{}'",
            key, primitive.name
        ));
    }

    if let ScoreFunction::Discrete(discrete) = &mut *function {
        for value in primitive.domain.elements() {
            if discrete.contains(&value.element_key()) {
                continue;
            }
            let score = default.evaluate(&value).unwrap_or(0.0);
            discrete.set_element_score(&value, score);
            messages.push(format!(
                "Element '{}' was added to the score function for '{}'",
                value, primitive.name
            ));
        }
    }

    if !removed.is_empty() && function.rescale() {
        messages.push(format!(
            "Score function for '{}' was rescaled to span 0 to 1",
            primitive.name
        ));
    }
}

fn objective_label(root: &Objective, id: &ObjectiveId) -> String {
    root.find(id)
        .map(|o| o.name().to_string())
        .unwrap_or_else(|| id.to_string())
}
