//! Objective hierarchy - abstract grouping nodes over primitive criteria.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ObjectiveId;
use crate::domain::score_function::{ScoreFunction, ScoreFunctionShape};

use super::Domain;

/// An objective that only groups other objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractObjective {
    pub id: ObjectiveId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub children: Vec<Objective>,
}

/// A leaf criterion with a value domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveObjective {
    pub id: ObjectiveId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub domain: Domain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_score_function: Option<ScoreFunction>,
}

impl PrimitiveObjective {
    pub fn new(id: impl Into<ObjectiveId>, name: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            domain,
            default_score_function: None,
        }
    }

    /// The function new or reset users start from.
    ///
    /// Falls back to a positive linear curve when the author declared none.
    pub fn default_score_function(&self) -> ScoreFunction {
        self.default_score_function
            .as_ref()
            .filter(|f| f.kind() == self.domain.score_function_kind())
            .map(ScoreFunction::memento)
            .unwrap_or_else(|| {
                ScoreFunction::initial(&self.domain, ScoreFunctionShape::PositiveLinear)
            })
    }
}

/// A node of the objective tree.
///
/// Children are owned by value, so the hierarchy is acyclic and every node
/// except the root has exactly one parent by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Objective {
    Abstract(AbstractObjective),
    Primitive(PrimitiveObjective),
}

impl Objective {
    /// Creates an abstract objective over `children`.
    pub fn group(
        id: impl Into<ObjectiveId>,
        name: impl Into<String>,
        children: Vec<Objective>,
    ) -> Self {
        Objective::Abstract(AbstractObjective {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            children,
        })
    }

    /// Creates a primitive objective.
    pub fn primitive(id: impl Into<ObjectiveId>, name: impl Into<String>, domain: Domain) -> Self {
        Objective::Primitive(PrimitiveObjective::new(id, name, domain))
    }

    pub fn id(&self) -> &ObjectiveId {
        match self {
            Objective::Abstract(o) => &o.id,
            Objective::Primitive(o) => &o.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Objective::Abstract(o) => &o.name,
            Objective::Primitive(o) => &o.name,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Objective::Primitive(_))
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveObjective> {
        match self {
            Objective::Primitive(p) => Some(p),
            Objective::Abstract(_) => None,
        }
    }

    /// Direct children; empty for primitives.
    pub fn children(&self) -> &[Objective] {
        match self {
            Objective::Abstract(o) => &o.children,
            Objective::Primitive(_) => &[],
        }
    }

    /// Every node of the subtree in pre-order, starting with `self`.
    pub fn descendants(&self) -> Vec<&Objective> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().iter().rev());
        }
        out
    }

    /// Primitive leaves of the subtree in pre-order.
    pub fn primitives(&self) -> Vec<&PrimitiveObjective> {
        self.descendants()
            .into_iter()
            .filter_map(Objective::as_primitive)
            .collect()
    }

    pub fn primitive_ids(&self) -> Vec<ObjectiveId> {
        self.primitives().into_iter().map(|p| p.id.clone()).collect()
    }

    pub fn find(&self, id: &ObjectiveId) -> Option<&Objective> {
        self.descendants().into_iter().find(|o| o.id() == id)
    }

    pub fn find_primitive(&self, id: &ObjectiveId) -> Option<&PrimitiveObjective> {
        self.find(id).and_then(Objective::as_primitive)
    }

    pub fn find_mut(&mut self, id: &ObjectiveId) -> Option<&mut Objective> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Objective::Abstract(o) => o.children.iter_mut().find_map(|c| c.find_mut(id)),
            Objective::Primitive(_) => None,
        }
    }

    /// Parent of the objective `id`; `None` for the root or unknown ids.
    pub fn parent_of(&self, id: &ObjectiveId) -> Option<&Objective> {
        self.descendants()
            .into_iter()
            .find(|node| node.children().iter().any(|c| c.id() == id))
    }

    /// The ordered sibling group containing `id`, the objective itself included.
    pub fn siblings_of(&self, id: &ObjectiveId) -> Option<&[Objective]> {
        if self.id() == id {
            return Some(std::slice::from_ref(self));
        }
        self.parent_of(id).map(Objective::children)
    }

    /// Detaches the descendant `id` (and its subtree) from the tree.
    pub fn remove_descendant(&mut self, id: &ObjectiveId) -> Option<Objective> {
        let Objective::Abstract(node) = self else {
            return None;
        };
        if let Some(index) = node.children.iter().position(|c| c.id() == id) {
            return Some(node.children.remove(index));
        }
        node.children
            .iter_mut()
            .find_map(|child| child.remove_descendant(id))
    }

    /// Appends `child` under the abstract objective `parent`.
    ///
    /// Returns false if `parent` is unknown or primitive.
    pub fn add_child(&mut self, parent: &ObjectiveId, child: Objective) -> bool {
        match self.find_mut(parent) {
            Some(Objective::Abstract(node)) => {
                node.children.push(child);
                true
            }
            _ => false,
        }
    }
}
