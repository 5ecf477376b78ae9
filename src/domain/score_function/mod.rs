//! Score functions - per-user utility curves over a primitive objective's domain.
//!
//! Two variants share one contract ([`Scoring`]):
//!
//! - [`DiscreteScoreFunction`] - exact lookup for categorical and interval domains
//! - [`ContinuousScoreFunction`] - sampled control points joined by an
//!   [`Interpolation`] strategy (linear by default)
//!
//! [`ScoreFunction`] is the tagged union stored in charts and sent over the wire.
//! Snapshots taken with [`ScoreFunction::memento`] own their data outright, so
//! later edits to the live function never reach them.

mod continuous;
mod discrete;
mod interpolation;

pub use continuous::ContinuousScoreFunction;
pub use discrete::DiscreteScoreFunction;
pub use interpolation::{Interpolation, LinearInterpolation, ScorePoint};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::EPSILON;
use crate::domain::objective::{Domain, DomainValue};

/// Errors raised while evaluating or editing a score function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreFunctionError {
    #[error("Element '{0}' has no score")]
    UnknownElement(String),

    #[error("Continuous score function has no samples")]
    NoSamples,

    #[error("Value '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Score {0} is not a finite number")]
    InvalidScore(f64),
}

/// Discriminator of the two score function variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFunctionKind {
    Discrete,
    Continuous,
}

impl fmt::Display for ScoreFunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreFunctionKind::Discrete => f.write_str("discrete"),
            ScoreFunctionKind::Continuous => f.write_str("continuous"),
        }
    }
}

/// Starting curve used when a function is initialised for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFunctionShape {
    Flat,
    #[default]
    PositiveLinear,
    NegativeLinear,
}

impl ScoreFunctionShape {
    fn score_at(self, position: f64) -> f64 {
        match self {
            ScoreFunctionShape::Flat => 0.5,
            ScoreFunctionShape::PositiveLinear => position,
            ScoreFunctionShape::NegativeLinear => 1.0 - position,
        }
    }
}

/// Contract shared by both score function variants.
pub trait Scoring {
    /// Score of a domain value.
    fn evaluate(&self, value: &DomainValue) -> Result<f64, ScoreFunctionError>;

    /// Inserts or overwrites the score of one domain value.
    fn set_element_score(&mut self, value: &DomainValue, score: f64)
        -> Result<(), ScoreFunctionError>;

    /// Every stored score, in no particular order.
    fn scores(&self) -> Vec<f64>;

    /// Remaps stored scores linearly so the lowest becomes 0 and the highest 1.
    ///
    /// Returns true if any score changed.
    fn rescale(&mut self) -> bool;
}

impl Scoring for DiscreteScoreFunction {
    fn evaluate(&self, value: &DomainValue) -> Result<f64, ScoreFunctionError> {
        DiscreteScoreFunction::evaluate(self, value)
    }

    fn set_element_score(
        &mut self,
        value: &DomainValue,
        score: f64,
    ) -> Result<(), ScoreFunctionError> {
        ensure_finite(score)?;
        DiscreteScoreFunction::set_element_score(self, value, score);
        Ok(())
    }

    fn scores(&self) -> Vec<f64> {
        self.entries().map(|(_, s)| s).collect()
    }

    fn rescale(&mut self) -> bool {
        rescale_scores(self.scores_mut().collect())
    }
}

impl Scoring for ContinuousScoreFunction {
    fn evaluate(&self, value: &DomainValue) -> Result<f64, ScoreFunctionError> {
        let number = value
            .as_number()
            .ok_or_else(|| ScoreFunctionError::NotNumeric(value.element_key()))?;
        ContinuousScoreFunction::evaluate(self, number)
    }

    fn set_element_score(
        &mut self,
        value: &DomainValue,
        score: f64,
    ) -> Result<(), ScoreFunctionError> {
        ensure_finite(score)?;
        let number = value
            .as_number()
            .filter(|n| n.is_finite())
            .ok_or_else(|| ScoreFunctionError::NotNumeric(value.element_key()))?;
        ContinuousScoreFunction::set_element_score(self, number, score);
        Ok(())
    }

    fn scores(&self) -> Vec<f64> {
        self.points().iter().map(|p| p.score).collect()
    }

    fn rescale(&mut self) -> bool {
        rescale_scores(self.scores_mut().collect())
    }
}

fn ensure_finite(score: f64) -> Result<(), ScoreFunctionError> {
    if score.is_finite() {
        Ok(())
    } else {
        Err(ScoreFunctionError::InvalidScore(score))
    }
}

fn rescale_scores(mut scores: Vec<&mut f64>) -> bool {
    let (min, max) = scores
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(**s), hi.max(**s))
        });
    let range = max - min;
    if !range.is_finite() || range <= EPSILON {
        return false;
    }
    if min.abs() <= EPSILON && (max - 1.0).abs() <= EPSILON {
        return false;
    }
    for score in scores.iter_mut() {
        **score = (**score - min) / range;
    }
    true
}

/// A user's utility curve for one primitive objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreFunction {
    Discrete(DiscreteScoreFunction),
    Continuous(ContinuousScoreFunction),
}

impl ScoreFunction {
    /// Builds a fresh function for `domain` following `shape`.
    ///
    /// Discrete domains score their elements evenly from 0 to 1 in declared
    /// order. Continuous domains are sampled at both bounds and three evenly
    /// spaced interior points.
    pub fn initial(domain: &Domain, shape: ScoreFunctionShape) -> Self {
        match domain {
            Domain::Categorical(_) | Domain::Interval(_) => {
                let keys = domain.element_keys();
                let last = keys.len().saturating_sub(1);
                let scores = keys.into_iter().enumerate().map(|(i, key)| {
                    let position = if last == 0 { 1.0 } else { i as f64 / last as f64 };
                    (key, shape.score_at(position))
                });
                ScoreFunction::Discrete(DiscreteScoreFunction::from_scores(scores))
            }
            Domain::Continuous(d) => {
                let mut function = ContinuousScoreFunction::new(d.min, d.max);
                for step in 0..=4 {
                    let position = step as f64 / 4.0;
                    function.set_element_score(
                        d.min + (d.max - d.min) * position,
                        shape.score_at(position),
                    );
                }
                ScoreFunction::Continuous(function)
            }
        }
    }

    pub fn kind(&self) -> ScoreFunctionKind {
        match self {
            ScoreFunction::Discrete(_) => ScoreFunctionKind::Discrete,
            ScoreFunction::Continuous(_) => ScoreFunctionKind::Continuous,
        }
    }

    /// Deep, independent copy for undo records and change detection.
    pub fn memento(&self) -> ScoreFunction {
        self.clone()
    }

    /// Sampled `(value, score)` pairs for plotting, in domain order.
    pub fn samples(&self, domain: &Domain) -> Vec<(DomainValue, f64)> {
        match self {
            ScoreFunction::Discrete(f) => domain
                .elements()
                .into_iter()
                .filter_map(|value| f.evaluate(&value).ok().map(|score| (value, score)))
                .collect(),
            ScoreFunction::Continuous(f) => f
                .points()
                .iter()
                .map(|p| (DomainValue::Number(p.value), p.score))
                .collect(),
        }
    }

    /// Drops discrete entries whose element is no longer declared by `domain`.
    ///
    /// Returns the removed element keys.
    pub fn retain_domain_elements(&mut self, domain: &Domain) -> Vec<String> {
        let ScoreFunction::Discrete(f) = self else {
            return Vec::new();
        };
        let keep = domain.element_keys();
        let stale: Vec<String> = f
            .entries()
            .map(|(k, _)| k.to_string())
            .filter(|k| !keep.contains(k))
            .collect();
        for key in &stale {
            f.remove_element(key);
        }
        stale
    }

    /// Lists why this function cannot score every value of `domain`.
    pub fn problems_against(&self, domain: &Domain) -> Vec<String> {
        let mut problems = Vec::new();
        if self.kind() != domain.score_function_kind() {
            problems.push(format!(
                "{} score function cannot score a {} domain",
                self.kind(),
                domain.kind()
            ));
            return problems;
        }
        match self {
            ScoreFunction::Discrete(f) => {
                for key in domain.element_keys() {
                    if !f.contains(&key) {
                        problems.push(format!("element '{}' has no score", key));
                    }
                }
            }
            ScoreFunction::Continuous(f) => {
                if f.points().is_empty() {
                    problems.push("continuous score function has no samples".to_string());
                }
            }
        }
        for score in self.scores() {
            if !(0.0..=1.0).contains(&score) {
                problems.push(format!("score {} is outside [0, 1]", score));
                break;
            }
        }
        problems
    }
}

impl Scoring for ScoreFunction {
    fn evaluate(&self, value: &DomainValue) -> Result<f64, ScoreFunctionError> {
        match self {
            ScoreFunction::Discrete(f) => Scoring::evaluate(f, value),
            ScoreFunction::Continuous(f) => Scoring::evaluate(f, value),
        }
    }

    fn set_element_score(
        &mut self,
        value: &DomainValue,
        score: f64,
    ) -> Result<(), ScoreFunctionError> {
        match self {
            ScoreFunction::Discrete(f) => Scoring::set_element_score(f, value, score),
            ScoreFunction::Continuous(f) => Scoring::set_element_score(f, value, score),
        }
    }

    fn scores(&self) -> Vec<f64> {
        match self {
            ScoreFunction::Discrete(f) => Scoring::scores(f),
            ScoreFunction::Continuous(f) => Scoring::scores(f),
        }
    }

    fn rescale(&mut self) -> bool {
        match self {
            ScoreFunction::Discrete(f) => Scoring::rescale(f),
            ScoreFunction::Continuous(f) => Scoring::rescale(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memento_is_not_aliased_to_original() {
        let mut live = ScoreFunction::initial(&Domain::continuous(0.0, 10.0), Default::default());
        let memento = live.memento();

        live.set_element_score(&5.0.into(), 0.9).unwrap();
        live.set_element_score(&7.0.into(), 0.1).unwrap();

        assert!((memento.evaluate(&5.0.into()).unwrap() - 0.5).abs() < 1e-12);
        assert_ne!(memento, live);
    }

    #[test]
    fn initial_discrete_spaces_scores_evenly() {
        let f = ScoreFunction::initial(
            &Domain::categorical(["bad", "ok", "good"]),
            ScoreFunctionShape::PositiveLinear,
        );
        assert_eq!(f.evaluate(&"bad".into()).unwrap(), 0.0);
        assert_eq!(f.evaluate(&"ok".into()).unwrap(), 0.5);
        assert_eq!(f.evaluate(&"good".into()).unwrap(), 1.0);
    }

    #[test]
    fn initial_continuous_negative_line() {
        let f = ScoreFunction::initial(
            &Domain::continuous(100.0, 200.0),
            ScoreFunctionShape::NegativeLinear,
        );
        assert!((f.evaluate(&150.0.into()).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(f.evaluate(&100.0.into()).unwrap(), 1.0);
    }

    #[test]
    fn initial_flat_scores_half_everywhere() {
        let f = ScoreFunction::initial(
            &Domain::interval(0.0, 3.0, 1.0),
            ScoreFunctionShape::Flat,
        );
        assert_eq!(f.scores(), vec![0.5; 4]);
    }

    #[test]
    fn rescale_stretches_scores_to_unit_range() {
        let mut f = ScoreFunction::Discrete(DiscreteScoreFunction::from_scores([
            ("a", 0.2),
            ("b", 0.4),
            ("c", 0.6),
        ]));
        assert!(f.rescale());
        assert!((f.evaluate(&"a".into()).unwrap() - 0.0).abs() < 1e-12);
        assert!((f.evaluate(&"b".into()).unwrap() - 0.5).abs() < 1e-12);
        assert!((f.evaluate(&"c".into()).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rescale_reports_no_change_when_already_spanning() {
        let mut f = ScoreFunction::initial(&Domain::continuous(0.0, 1.0), Default::default());
        assert!(!f.rescale());
    }

    #[test]
    fn rescale_leaves_constant_functions_alone() {
        let mut f = ScoreFunction::initial(&Domain::categorical(["x", "y"]), ScoreFunctionShape::Flat);
        assert!(!f.rescale());
        assert_eq!(f.scores(), vec![0.5, 0.5]);
    }

    #[test]
    fn set_element_score_rejects_non_finite() {
        let mut f = ScoreFunction::initial(&Domain::categorical(["x"]), Default::default());
        assert_eq!(
            f.set_element_score(&"x".into(), f64::NAN).map_err(|e| e.to_string()),
            Err("Score NaN is not a finite number".to_string())
        );
    }

    #[test]
    fn problems_against_flags_kind_mismatch_and_missing_elements() {
        let discrete = ScoreFunction::initial(&Domain::categorical(["a"]), Default::default());
        assert_eq!(discrete.problems_against(&Domain::continuous(0.0, 1.0)).len(), 1);

        let missing = discrete.problems_against(&Domain::categorical(["a", "b"]));
        assert_eq!(missing, vec!["element 'b' has no score".to_string()]);
    }

    #[test]
    fn retain_domain_elements_drops_removed_categories() {
        let mut f = ScoreFunction::initial(&Domain::categorical(["a", "b", "c"]), Default::default());
        let removed = f.retain_domain_elements(&Domain::categorical(["a", "c"]));
        assert_eq!(removed, vec!["b".to_string()]);
        assert!(f.evaluate(&"b".into()).is_err());
    }

    #[test]
    fn score_function_serializes_with_type_tag() {
        let f = ScoreFunction::initial(&Domain::categorical(["a"]), Default::default());
        let json = serde_json::to_string(&f).unwrap();
        assert!(json.contains(r#""type":"discrete""#));
        let back: ScoreFunction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}
