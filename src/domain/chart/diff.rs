//! Human-readable differences between two chart structures.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::foundation::ObjectiveId;
use crate::domain::objective::{Domain, DomainKind, Objective};

use super::{Alternative, ChartStructure};

/// One observed difference between an old and a new structure.
#[derive(Debug, Clone, PartialEq)]
pub enum StructureChange {
    NameChanged { from: String, to: String },
    DescriptionChanged,
    TypeChanged,
    ObjectiveAdded { id: ObjectiveId, name: String },
    ObjectiveRemoved { id: ObjectiveId, name: String },
    ObjectiveRenamed { id: ObjectiveId, from: String, to: String },
    ObjectiveMoved { id: ObjectiveId, name: String },
    DomainKindChanged { id: ObjectiveId, name: String, from: DomainKind, to: DomainKind },
    DomainChanged { id: ObjectiveId, name: String },
    AlternativeAdded { name: String },
    AlternativeRemoved { name: String },
    AlternativeChanged { name: String },
    AlternativesReordered,
}

impl StructureChange {
    /// True for changes that may invalidate existing preferences.
    pub fn affects_preferences(&self) -> bool {
        matches!(
            self,
            StructureChange::ObjectiveAdded { .. }
                | StructureChange::ObjectiveRemoved { .. }
                | StructureChange::DomainKindChanged { .. }
                | StructureChange::DomainChanged { .. }
        )
    }
}

impl fmt::Display for StructureChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureChange::NameChanged { from, to } => {
                write!(f, "Chart name changed from '{}' to '{}'", from, to)
            }
            StructureChange::DescriptionChanged => f.write_str("Chart description changed"),
            StructureChange::TypeChanged => f.write_str("Chart type changed"),
            StructureChange::ObjectiveAdded { name, .. } => {
                write!(f, "Objective '{}' was added", name)
            }
            StructureChange::ObjectiveRemoved { name, .. } => {
                write!(f, "Objective '{}' was removed", name)
            }
            StructureChange::ObjectiveRenamed { from, to, .. } => {
                write!(f, "Objective '{}' was renamed to '{}'", from, to)
            }
            StructureChange::ObjectiveMoved { name, .. } => {
                write!(f, "Objective '{}' was moved", name)
            }
            StructureChange::DomainKindChanged { name, from, to, .. } => write!(
                f,
                "Domain of objective '{}' changed from {} to {}",
                name, from, to
            ),
            StructureChange::DomainChanged { name, .. } => {
                write!(f, "Domain of objective '{}' changed", name)
            }
            StructureChange::AlternativeAdded { name } => {
                write!(f, "Alternative '{}' was added", name)
            }
            StructureChange::AlternativeRemoved { name } => {
                write!(f, "Alternative '{}' was removed", name)
            }
            StructureChange::AlternativeChanged { name } => {
                write!(f, "Alternative '{}' was changed", name)
            }
            StructureChange::AlternativesReordered => f.write_str("Alternatives were reordered"),
        }
    }
}

/// Lists every difference from `old` to `new`, metadata first, then
/// objectives in pre-order, then alternatives.
pub fn diff(old: &ChartStructure, new: &ChartStructure) -> Vec<StructureChange> {
    let mut changes = Vec::new();

    if old.name != new.name {
        changes.push(StructureChange::NameChanged {
            from: old.name.clone(),
            to: new.name.clone(),
        });
    }
    if old.description != new.description {
        changes.push(StructureChange::DescriptionChanged);
    }
    if old.chart_type != new.chart_type {
        changes.push(StructureChange::TypeChanged);
    }

    diff_objectives(&old.root_objective, &new.root_objective, &mut changes);
    diff_alternatives(&old.alternatives, &new.alternatives, &mut changes);
    changes
}

fn diff_objectives(old_root: &Objective, new_root: &Objective, changes: &mut Vec<StructureChange>) {
    let old_nodes = index_objectives(old_root);
    let new_nodes = index_objectives(new_root);

    for node in old_root.descendants() {
        if !new_nodes.contains_key(node.id()) {
            changes.push(StructureChange::ObjectiveRemoved {
                id: node.id().clone(),
                name: node.name().to_string(),
            });
        }
    }

    for node in new_root.descendants() {
        let id = node.id();
        let Some((old_node, old_parent)) = old_nodes.get(id) else {
            changes.push(StructureChange::ObjectiveAdded {
                id: id.clone(),
                name: node.name().to_string(),
            });
            continue;
        };
        let new_parent = new_nodes.get(id).and_then(|(_, parent)| parent.clone());

        if old_node.name() != node.name() {
            changes.push(StructureChange::ObjectiveRenamed {
                id: id.clone(),
                from: old_node.name().to_string(),
                to: node.name().to_string(),
            });
        }
        if *old_parent != new_parent {
            changes.push(StructureChange::ObjectiveMoved {
                id: id.clone(),
                name: node.name().to_string(),
            });
        }
        if let Some(change) = domain_change(old_node, node) {
            changes.push(change);
        }
    }
}

fn domain_change(old: &Objective, new: &Objective) -> Option<StructureChange> {
    let old_domain = domain_of(old);
    let new_domain = domain_of(new);
    match (old_domain, new_domain) {
        (Some(a), Some(b)) if a.kind() != b.kind() => Some(StructureChange::DomainKindChanged {
            id: new.id().clone(),
            name: new.name().to_string(),
            from: a.kind(),
            to: b.kind(),
        }),
        (Some(a), Some(b)) if a != b => Some(StructureChange::DomainChanged {
            id: new.id().clone(),
            name: new.name().to_string(),
        }),
        (Some(_), None) | (None, Some(_)) => Some(StructureChange::DomainChanged {
            id: new.id().clone(),
            name: new.name().to_string(),
        }),
        _ => None,
    }
}

fn domain_of(objective: &Objective) -> Option<&Domain> {
    objective.as_primitive().map(|p| &p.domain)
}

/// Maps each objective id to its node and the id of its parent.
fn index_objectives(root: &Objective) -> BTreeMap<&ObjectiveId, (&Objective, Option<ObjectiveId>)> {
    let mut index = BTreeMap::new();
    index.insert(root.id(), (root, None));
    for node in root.descendants() {
        for child in node.children() {
            index.insert(child.id(), (child, Some(node.id().clone())));
        }
    }
    index
}

fn diff_alternatives(old: &[Alternative], new: &[Alternative], changes: &mut Vec<StructureChange>) {
    for alternative in old {
        if !new.iter().any(|a| a.name == alternative.name) {
            changes.push(StructureChange::AlternativeRemoved {
                name: alternative.name.clone(),
            });
        }
    }
    for alternative in new {
        match old.iter().find(|a| a.name == alternative.name) {
            None => changes.push(StructureChange::AlternativeAdded {
                name: alternative.name.clone(),
            }),
            Some(previous) if previous != alternative => {
                changes.push(StructureChange::AlternativeChanged {
                    name: alternative.name.clone(),
                })
            }
            Some(_) => {}
        }
    }

    let common_old: Vec<&str> = old
        .iter()
        .map(|a| a.name.as_str())
        .filter(|n| new.iter().any(|a| a.name == *n))
        .collect();
    let common_new: Vec<&str> = new
        .iter()
        .map(|a| a.name.as_str())
        .filter(|n| old.iter().any(|a| a.name == *n))
        .collect();
    if common_old != common_new {
        changes.push(StructureChange::AlternativesReordered);
    }
}
