//! Chart aggregate - the unit of synchronization and persistence.
//!
//! A chart is its [`ChartStructure`] (objectives, alternatives, metadata)
//! plus the participating [`User`]s. Structure messages never carry users,
//! so replacing the structure keeps the user list in place.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChartId, ObjectiveId, ValidationError};
use crate::domain::objective::{Objective, PrimitiveObjective};
use crate::domain::preference::User;

use super::Alternative;

/// Whether a chart belongs to one decision maker or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    #[default]
    Individual,
    Group,
}

/// Everything about a chart except its users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartStructure {
    pub id: ChartId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Username of the structural owner.
    pub creator: String,
    #[serde(default)]
    pub chart_type: ChartType,
    pub root_objective: Objective,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

impl ChartStructure {
    pub fn new(
        id: ChartId,
        name: impl Into<String>,
        creator: impl Into<String>,
        root_objective: Objective,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            creator: creator.into(),
            chart_type: ChartType::default(),
            root_objective,
            alternatives: Vec::new(),
        }
    }

    pub fn primitives(&self) -> Vec<&PrimitiveObjective> {
        self.root_objective.primitives()
    }

    pub fn find_primitive(&self, id: &ObjectiveId) -> Option<&PrimitiveObjective> {
        self.root_objective.find_primitive(id)
    }

    pub fn alternative(&self, name: &str) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.name == name)
    }
}

/// Outcome of inserting or replacing a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserUpsert {
    Added,
    Changed,
    Unchanged,
}

/// Chart aggregate.
///
/// # Invariants
///
/// - usernames are unique within `users`
/// - alternative names are unique (enforced by structural validation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(flatten)]
    structure: ChartStructure,
    #[serde(default)]
    users: Vec<User>,
}

impl Chart {
    pub fn new(structure: ChartStructure) -> Self {
        Self {
            structure,
            users: Vec::new(),
        }
    }

    /// Reassembles a chart from persisted parts.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if two users share a username
    pub fn reconstitute(structure: ChartStructure, users: Vec<User>) -> Result<Self, ValidationError> {
        let mut chart = Self::new(structure);
        for user in users {
            if chart.user(user.username()).is_some() {
                return Err(ValidationError::invalid_format(
                    "users",
                    format!("duplicate username '{}'", user.username()),
                ));
            }
            chart.users.push(user);
        }
        Ok(chart)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ChartId {
        self.structure.id
    }

    pub fn name(&self) -> &str {
        &self.structure.name
    }

    pub fn creator(&self) -> &str {
        &self.structure.creator
    }

    pub fn structure(&self) -> &ChartStructure {
        &self.structure
    }

    pub fn root_objective(&self) -> &Objective {
        &self.structure.root_objective
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.structure.alternatives
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Users whose preferences passed validation; the ones shown in aggregates.
    pub fn valid_users(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter(|u| u.is_valid())
    }

    pub fn user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username() == username)
    }

    pub fn user_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.username() == username)
    }

    pub(crate) fn users_mut(&mut self) -> &mut [User] {
        &mut self.users
    }

    /// The structure alongside mutable users, for repairs that read one and edit the other.
    pub(crate) fn structure_and_users_mut(&mut self) -> (&ChartStructure, &mut [User]) {
        (&self.structure, &mut self.users)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Inserts `user` or replaces the user with the same username.
    pub fn upsert_user(&mut self, user: User) -> UserUpsert {
        match self.users.iter_mut().find(|u| u.username() == user.username()) {
            Some(existing) if *existing == user => UserUpsert::Unchanged,
            Some(existing) => {
                *existing = user;
                UserUpsert::Changed
            }
            None => {
                self.users.push(user);
                UserUpsert::Added
            }
        }
    }

    pub fn remove_user(&mut self, username: &str) -> Option<User> {
        let index = self.users.iter().position(|u| u.username() == username)?;
        Some(self.users.remove(index))
    }

    /// Swaps in a new structure, keeping the current users, and returns the old one.
    pub fn replace_structure(&mut self, structure: ChartStructure) -> ChartStructure {
        std::mem::replace(&mut self.structure, structure)
    }

    /// Names of the alternatives in display order.
    pub fn alternative_order(&self) -> Vec<String> {
        self.structure
            .alternatives
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    /// Reorders alternatives to follow `names`.
    ///
    /// Names that no longer exist are skipped; alternatives missing from
    /// `names` keep their relative order after the listed ones.
    pub fn reorder_alternatives(&mut self, names: &[String]) {
        let mut remaining = std::mem::take(&mut self.structure.alternatives);
        let mut ordered = Vec::with_capacity(remaining.len());
        for name in names {
            if let Some(index) = remaining.iter().position(|a| &a.name == name) {
                ordered.push(remaining.remove(index));
            }
        }
        ordered.append(&mut remaining);
        self.structure.alternatives = ordered;
    }

    /// Moves the alternative at `from` to position `to`.
    ///
    /// Returns false if either index is out of range.
    pub fn move_alternative(&mut self, from: usize, to: usize) -> bool {
        let alternatives = &mut self.structure.alternatives;
        if from >= alternatives.len() || to >= alternatives.len() {
            return false;
        }
        let alternative = alternatives.remove(from);
        alternatives.insert(to, alternative);
        true
    }
}
