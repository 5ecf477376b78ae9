//! Discrete score functions: exact lookup, no interpolation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::objective::DomainValue;

use super::ScoreFunctionError;

/// Maps each element of a categorical or interval domain to a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscreteScoreFunction {
    scores: BTreeMap<String, f64>,
}

impl DiscreteScoreFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a function from `(element, score)` pairs.
    pub fn from_scores<I, S>(scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            scores: scores.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Looks up the score of a declared element.
    ///
    /// # Errors
    ///
    /// - `UnknownElement` if the element has never been scored
    pub fn evaluate(&self, value: &DomainValue) -> Result<f64, ScoreFunctionError> {
        let key = value.element_key();
        self.scores
            .get(&key)
            .copied()
            .ok_or(ScoreFunctionError::UnknownElement(key))
    }

    pub fn set_element_score(&mut self, value: &DomainValue, score: f64) {
        self.scores.insert(value.element_key(), score);
    }

    pub fn remove_element(&mut self, key: &str) -> Option<f64> {
        self.scores.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.scores.contains_key(key)
    }

    /// Scored elements in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub(super) fn scores_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.scores.values_mut()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_returns_exact_score() {
        let f = DiscreteScoreFunction::from_scores([("low", 0.0), ("high", 1.0)]);
        assert_eq!(f.evaluate(&"high".into()).unwrap(), 1.0);
    }

    #[test]
    fn evaluate_rejects_undeclared_element() {
        let f = DiscreteScoreFunction::from_scores([("low", 0.0)]);
        assert_eq!(
            f.evaluate(&"medium".into()),
            Err(ScoreFunctionError::UnknownElement("medium".to_string()))
        );
    }

    #[test]
    fn numeric_values_resolve_through_their_key() {
        let mut f = DiscreteScoreFunction::new();
        f.set_element_score(&DomainValue::Number(3.0), 0.7);
        assert_eq!(f.evaluate(&"3".into()).unwrap(), 0.7);
    }

    #[test]
    fn set_element_score_overwrites() {
        let mut f = DiscreteScoreFunction::from_scores([("a", 0.2)]);
        f.set_element_score(&"a".into(), 0.9);
        assert_eq!(f.len(), 1);
        assert_eq!(f.evaluate(&"a".into()).unwrap(), 0.9);
    }
}
