//! Interpolation strategies for continuous score functions.

use serde::{Deserialize, Serialize};

/// One sampled control point of a continuous score function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub value: f64,
    pub score: f64,
}

impl ScorePoint {
    pub fn new(value: f64, score: f64) -> Self {
        Self { value, score }
    }
}

/// Derives the score between two sampled points.
///
/// Callers guarantee `below.value < value < above.value`.
pub trait Interpolation: Send + Sync {
    fn interpolate(&self, below: ScorePoint, above: ScorePoint, value: f64) -> f64;
}

/// Straight line through the two neighbouring samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinearInterpolation;

impl Interpolation for LinearInterpolation {
    fn interpolate(&self, below: ScorePoint, above: ScorePoint, value: f64) -> f64 {
        let slope = (above.score - below.score) / (above.value - below.value);
        let offset = below.score - slope * below.value;
        slope * value + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_interpolation_hits_midpoint() {
        let score = LinearInterpolation.interpolate(
            ScorePoint::new(100.0, 1.0),
            ScorePoint::new(200.0, 0.0),
            150.0,
        );
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn linear_interpolation_reproduces_endpoints() {
        let below = ScorePoint::new(10.0, 10.0);
        let above = ScorePoint::new(100.0, 33.0);
        assert!((LinearInterpolation.interpolate(below, above, 10.0) - 10.0).abs() < 1e-9);
        assert!((LinearInterpolation.interpolate(below, above, 100.0) - 33.0).abs() < 1e-9);
    }
}
