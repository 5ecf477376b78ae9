//! Participants and their preferences.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{ObjectiveId, ValidationError};
use crate::domain::objective::Objective;
use crate::domain::score_function::ScoreFunction;

use super::WeightMap;

/// One score function per primitive objective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreFunctionMap {
    functions: BTreeMap<ObjectiveId, ScoreFunction>,
}

impl ScoreFunctionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every primitive of `root` mapped to its default score function.
    pub fn defaults_for(root: &Objective) -> Self {
        Self {
            functions: root
                .primitives()
                .into_iter()
                .map(|p| (p.id.clone(), p.default_score_function()))
                .collect(),
        }
    }

    pub fn get(&self, id: &ObjectiveId) -> Option<&ScoreFunction> {
        self.functions.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectiveId) -> Option<&mut ScoreFunction> {
        self.functions.get_mut(id)
    }

    /// Stores `function`, returning the one it replaced.
    pub fn set(&mut self, id: ObjectiveId, function: ScoreFunction) -> Option<ScoreFunction> {
        self.functions.insert(id, function)
    }

    pub fn remove(&mut self, id: &ObjectiveId) -> Option<ScoreFunction> {
        self.functions.remove(id)
    }

    pub fn contains(&self, id: &ObjectiveId) -> bool {
        self.functions.contains_key(id)
    }

    pub fn ids(&self) -> Vec<ObjectiveId> {
        self.functions.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectiveId, &ScoreFunction)> {
        self.functions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ObjectiveId, &mut ScoreFunction)> {
        self.functions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// A participant: identity plus their weights and score functions.
///
/// Each user is edited by exactly one participant; other sessions only ever
/// replace the record wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    username: String,
    #[serde(default)]
    color: String,
    weight_map: WeightMap,
    score_functions: ScoreFunctionMap,
    /// Why the preferences fail validation against the current structure.
    /// Recomputed locally; never sent over the wire.
    #[serde(skip)]
    invalid_reasons: Vec<String>,
}

impl User {
    /// Creates a user with the given preferences.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the username is blank
    pub fn new(
        username: impl Into<String>,
        weight_map: WeightMap,
        score_functions: ScoreFunctionMap,
    ) -> Result<Self, ValidationError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(ValidationError::empty_field("username"));
        }
        Ok(Self {
            username,
            color: String::new(),
            weight_map,
            score_functions,
            invalid_reasons: Vec::new(),
        })
    }

    /// A user with uniform weights and default score functions for `root`.
    pub fn with_defaults(
        username: impl Into<String>,
        root: &Objective,
    ) -> Result<Self, ValidationError> {
        Self::new(
            username,
            WeightMap::uniform(root),
            ScoreFunctionMap::defaults_for(root),
        )
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn weight_map(&self) -> &WeightMap {
        &self.weight_map
    }

    pub fn weight_map_mut(&mut self) -> &mut WeightMap {
        &mut self.weight_map
    }

    pub fn set_weight_map(&mut self, weight_map: WeightMap) {
        self.weight_map = weight_map;
    }

    pub fn score_functions(&self) -> &ScoreFunctionMap {
        &self.score_functions
    }

    pub fn score_functions_mut(&mut self) -> &mut ScoreFunctionMap {
        &mut self.score_functions
    }

    pub fn score_function(&self, id: &ObjectiveId) -> Option<&ScoreFunction> {
        self.score_functions.get(id)
    }

    /// Returns true unless the last validation marked this user invalid.
    pub fn is_valid(&self) -> bool {
        self.invalid_reasons.is_empty()
    }

    pub fn invalid_reasons(&self) -> &[String] {
        &self.invalid_reasons
    }

    /// Records the outcome of validating this user against a structure.
    pub fn mark_validation(&mut self, reasons: Vec<String>) {
        self.invalid_reasons = reasons;
    }

    /// True if both users hold the same identity and preferences.
    pub fn same_preferences(&self, other: &User) -> bool {
        self.username == other.username
            && self.color == other.color
            && self.weight_map == other.weight_map
            && self.score_functions == other.score_functions
    }
}
