//! Continuous score functions: sparse samples joined by interpolation.
//!
//! # Boundary policy
//!
//! A query between two samples is interpolated. A query with samples on one
//! side only saturates at the nearest sample's score; the tracked domain
//! bounds never invent a score of their own. A function with no samples
//! cannot be evaluated.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::EPSILON;

use super::interpolation::{Interpolation, LinearInterpolation, ScorePoint};
use super::ScoreFunctionError;

/// Piecewise score function over a bounded numeric domain.
///
/// # Invariants
///
/// - `points` is sorted by value with no duplicate values
/// - `min_domain_value <= every sampled value <= max_domain_value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuousScoreFunction {
    min_domain_value: f64,
    max_domain_value: f64,
    #[serde(default)]
    points: Vec<ScorePoint>,
}

impl ContinuousScoreFunction {
    /// Creates an empty function over `[min, max]`.
    pub fn new(min_domain_value: f64, max_domain_value: f64) -> Self {
        Self {
            min_domain_value: min_domain_value.min(max_domain_value),
            max_domain_value: max_domain_value.max(min_domain_value),
            points: Vec::new(),
        }
    }

    pub fn min_domain_value(&self) -> f64 {
        self.min_domain_value
    }

    pub fn max_domain_value(&self) -> f64 {
        self.max_domain_value
    }

    /// Sampled control points in ascending value order.
    pub fn points(&self) -> &[ScorePoint] {
        &self.points
    }

    /// Inserts or overwrites a sample and widens the tracked bounds to include it.
    pub fn set_element_score(&mut self, value: f64, score: f64) {
        self.min_domain_value = self.min_domain_value.min(value);
        self.max_domain_value = self.max_domain_value.max(value);

        match self.position_of(value) {
            Ok(i) => self.points[i].score = score,
            Err(i) => self.points.insert(i, ScorePoint::new(value, score)),
        }
    }

    /// Removes the sample at exactly `value`, if any.
    pub fn remove_element(&mut self, value: f64) -> Option<f64> {
        match self.position_of(value) {
            Ok(i) => Some(self.points.remove(i).score),
            Err(_) => None,
        }
    }

    /// Evaluates with the default linear strategy.
    pub fn evaluate(&self, value: f64) -> Result<f64, ScoreFunctionError> {
        self.evaluate_with(value, &LinearInterpolation)
    }

    /// Evaluates with a caller-chosen interpolation strategy.
    ///
    /// # Errors
    ///
    /// - `NoSamples` if the function has never been sampled
    /// - `NotNumeric` if `value` is NaN
    pub fn evaluate_with(
        &self,
        value: f64,
        interpolation: &dyn Interpolation,
    ) -> Result<f64, ScoreFunctionError> {
        if value.is_nan() {
            return Err(ScoreFunctionError::NotNumeric(value.to_string()));
        }
        if self.points.is_empty() {
            return Err(ScoreFunctionError::NoSamples);
        }

        let index = match self.position_of(value) {
            Ok(i) => return Ok(self.points[i].score),
            Err(i) => i,
        };

        let below = index.checked_sub(1).map(|i| self.points[i]);
        let above = self.points.get(index).copied();

        match (below, above) {
            (Some(below), Some(above)) => Ok(interpolation.interpolate(below, above, value)),
            (Some(edge), None) | (None, Some(edge)) => Ok(edge.score),
            (None, None) => Err(ScoreFunctionError::NoSamples),
        }
    }

    pub(super) fn scores_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.points.iter_mut().map(|p| &mut p.score)
    }

    // Binary search that treats values within EPSILON as the same sample.
    fn position_of(&self, value: f64) -> Result<usize, usize> {
        let i = self.points.partition_point(|p| p.value < value - EPSILON);
        match self.points.get(i) {
            Some(p) if (p.value - value).abs() <= EPSILON => Ok(i),
            _ => Err(i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampled(points: &[(f64, f64)]) -> ContinuousScoreFunction {
        let mut f = ContinuousScoreFunction::new(0.0, 0.0);
        for (v, s) in points {
            f.set_element_score(*v, *s);
        }
        f
    }

    #[test]
    fn evaluates_midpoint_of_two_samples() {
        let f = sampled(&[(0.0, 0.0), (10.0, 10.0)]);
        assert!((f.evaluate(5.0).unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn evaluates_between_inner_samples() {
        let f = sampled(&[(0.0, 0.0), (10.0, 10.0), (100.0, 33.0), (111.0, 8.0)]);
        assert!((f.evaluate(61.0).unwrap() - 23.033_333).abs() < 1e-4);
        assert!((f.evaluate(107.0).unwrap() - 17.090_909).abs() < 1e-4);
    }

    #[test]
    fn exact_sample_is_returned_directly() {
        let f = sampled(&[(0.0, 0.2), (10.0, 0.8)]);
        assert_eq!(f.evaluate(10.0).unwrap(), 0.8);
    }

    #[test]
    fn falling_line_across_domain() {
        let mut f = ContinuousScoreFunction::new(100.0, 200.0);
        f.set_element_score(100.0, 1.0);
        f.set_element_score(200.0, 0.0);
        assert!((f.evaluate(150.0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn queries_outside_samples_saturate() {
        let mut f = ContinuousScoreFunction::new(0.0, 100.0);
        f.set_element_score(20.0, 0.3);
        f.set_element_score(80.0, 0.9);

        assert_eq!(f.evaluate(5.0).unwrap(), 0.3);
        assert_eq!(f.evaluate(95.0).unwrap(), 0.9);
        assert_eq!(f.evaluate(500.0).unwrap(), 0.9);
    }

    #[test]
    fn empty_function_cannot_be_evaluated() {
        let f = ContinuousScoreFunction::new(0.0, 1.0);
        assert_eq!(f.evaluate(0.5), Err(ScoreFunctionError::NoSamples));
    }

    #[test]
    fn setting_scores_tracks_bounds() {
        let mut f = ContinuousScoreFunction::new(10.0, 20.0);
        f.set_element_score(5.0, 0.0);
        f.set_element_score(25.0, 1.0);
        assert_eq!(f.min_domain_value(), 5.0);
        assert_eq!(f.max_domain_value(), 25.0);
    }

    #[test]
    fn points_stay_sorted_and_unique() {
        let f = sampled(&[(5.0, 0.5), (1.0, 0.1), (3.0, 0.3), (3.0, 0.35)]);
        let values: Vec<f64> = f.points().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 3.0, 5.0]);
        assert_eq!(f.evaluate(3.0).unwrap(), 0.35);
    }

    #[test]
    fn remove_element_drops_sample() {
        let mut f = sampled(&[(0.0, 0.0), (5.0, 0.2), (10.0, 1.0)]);
        assert_eq!(f.remove_element(5.0), Some(0.2));
        assert!((f.evaluate(5.0).unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(f.remove_element(5.0), None);
    }
}
