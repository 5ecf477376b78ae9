//! Value domains owned by primitive objectives.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::EPSILON;
use crate::domain::score_function::ScoreFunctionKind;

/// A value an alternative assigns to a primitive objective.
///
/// Categorical and interval domains use the textual key of the value;
/// continuous domains use the number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainValue {
    Number(f64),
    Category(String),
}

impl DomainValue {
    /// Returns the numeric reading of the value, parsing categories that hold numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DomainValue::Number(n) => Some(*n),
            DomainValue::Category(s) => s.trim().parse().ok(),
        }
    }

    /// Returns the key under which discrete score functions store this value.
    pub fn element_key(&self) -> String {
        match self {
            DomainValue::Number(n) => n.to_string(),
            DomainValue::Category(s) => s.clone(),
        }
    }
}

impl fmt::Display for DomainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.element_key())
    }
}

impl From<f64> for DomainValue {
    fn from(n: f64) -> Self {
        DomainValue::Number(n)
    }
}

impl From<&str> for DomainValue {
    fn from(s: &str) -> Self {
        DomainValue::Category(s.to_string())
    }
}

/// Discriminator of the three domain shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Categorical,
    Interval,
    Continuous,
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DomainKind::Categorical => "categorical",
            DomainKind::Interval => "interval",
            DomainKind::Continuous => "continuous",
        };
        f.write_str(s)
    }
}

/// A finite, author-declared set of labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalDomain {
    pub elements: Vec<String>,
    /// Whether the declared order is meaningful (e.g. "low" < "medium" < "high").
    #[serde(default)]
    pub ordered: bool,
}

/// Evenly spaced numbers between `min` and `max`, scored discretely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalDomain {
    pub min: f64,
    pub max: f64,
    pub interval: f64,
}

impl IntervalDomain {
    /// Largest number of values an interval domain may declare.
    pub const MAX_VALUES: usize = 10_000;

    /// Number of steps past `min`, or `None` if the domain is malformed or
    /// would declare more than [`Self::MAX_VALUES`] values.
    fn step_count(&self) -> Option<usize> {
        if !(self.min.is_finite() && self.max.is_finite() && self.interval.is_finite())
            || self.interval <= 0.0
            || self.max < self.min
        {
            return None;
        }
        let steps = ((self.max - self.min) / self.interval + EPSILON).floor();
        (steps < Self::MAX_VALUES as f64).then_some(steps as usize)
    }

    /// Returns every value of the interval, `min` and `max` inclusive.
    ///
    /// Empty for malformed or oversized domains.
    pub fn values(&self) -> Vec<f64> {
        let Some(steps) = self.step_count() else {
            return Vec::new();
        };
        (0..=steps)
            .map(|i| round_step(self.min + self.interval * i as f64))
            .collect()
    }

    /// Returns true if `n` is one of the interval's values.
    pub fn contains(&self, n: f64) -> bool {
        let Some(steps) = self.step_count() else {
            return false;
        };
        if !n.is_finite() {
            return false;
        }
        let step = ((n - self.min) / self.interval).round();
        step >= 0.0
            && step <= steps as f64
            && (round_step(self.min + self.interval * step) - n).abs() <= EPSILON
    }
}

// Keeps keys such as 0.1 * 3 stable as "0.3".
fn round_step(value: f64) -> f64 {
    (value * 1e10).round() / 1e10
}

/// A bounded numeric range, scored by interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousDomain {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// The set or range of legal values for a primitive objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    Categorical(CategoricalDomain),
    Interval(IntervalDomain),
    Continuous(ContinuousDomain),
}

impl Domain {
    /// Convenience constructor for a categorical domain.
    pub fn categorical<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Domain::Categorical(CategoricalDomain {
            elements: elements.into_iter().map(Into::into).collect(),
            ordered: false,
        })
    }

    /// Convenience constructor for a continuous domain.
    pub fn continuous(min: f64, max: f64) -> Self {
        Domain::Continuous(ContinuousDomain {
            min,
            max,
            unit: None,
        })
    }

    /// Convenience constructor for an interval domain.
    pub fn interval(min: f64, max: f64, interval: f64) -> Self {
        Domain::Interval(IntervalDomain { min, max, interval })
    }

    pub fn kind(&self) -> DomainKind {
        match self {
            Domain::Categorical(_) => DomainKind::Categorical,
            Domain::Interval(_) => DomainKind::Interval,
            Domain::Continuous(_) => DomainKind::Continuous,
        }
    }

    /// Which score function variant can score this domain.
    pub fn score_function_kind(&self) -> ScoreFunctionKind {
        match self {
            Domain::Categorical(_) | Domain::Interval(_) => ScoreFunctionKind::Discrete,
            Domain::Continuous(_) => ScoreFunctionKind::Continuous,
        }
    }

    /// Returns the declared elements of a discrete domain; empty for continuous ones.
    pub fn elements(&self) -> Vec<DomainValue> {
        match self {
            Domain::Categorical(d) => d
                .elements
                .iter()
                .map(|e| DomainValue::Category(e.clone()))
                .collect(),
            Domain::Interval(d) => d.values().into_iter().map(DomainValue::Number).collect(),
            Domain::Continuous(_) => Vec::new(),
        }
    }

    /// Element keys of a discrete domain, in declared order.
    pub fn element_keys(&self) -> Vec<String> {
        self.elements().iter().map(DomainValue::element_key).collect()
    }

    /// Numeric bounds for interval and continuous domains.
    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            Domain::Categorical(_) => None,
            Domain::Interval(d) => Some((d.min, d.max)),
            Domain::Continuous(d) => Some((d.min, d.max)),
        }
    }

    /// Returns true if `value` is a legal value of this domain.
    pub fn contains(&self, value: &DomainValue) -> bool {
        match self {
            Domain::Categorical(d) => {
                let key = value.element_key();
                d.elements.iter().any(|e| *e == key)
            }
            Domain::Interval(d) => value.as_number().is_some_and(|n| d.contains(n)),
            Domain::Continuous(d) => value
                .as_number()
                .is_some_and(|n| n >= d.min - EPSILON && n <= d.max + EPSILON),
        }
    }

    /// Lists everything malformed about the domain itself.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        match self {
            Domain::Categorical(d) => {
                if d.elements.is_empty() {
                    problems.push("categorical domain has no elements".to_string());
                }
                for (i, element) in d.elements.iter().enumerate() {
                    if element.trim().is_empty() {
                        problems.push("categorical domain has a blank element".to_string());
                    } else if d.elements[..i].contains(element) {
                        problems.push(format!("categorical domain repeats element '{}'", element));
                    }
                }
            }
            Domain::Interval(d) => {
                if !(d.min.is_finite() && d.max.is_finite() && d.interval.is_finite()) {
                    problems.push("interval domain bounds must be finite".to_string());
                } else if d.min >= d.max {
                    problems.push(format!(
                        "interval domain minimum {} must be below maximum {}",
                        d.min, d.max
                    ));
                } else if d.interval <= 0.0 || d.interval > d.max - d.min {
                    problems.push(format!(
                        "interval {} does not fit between {} and {}",
                        d.interval, d.min, d.max
                    ));
                } else if d.step_count().is_none() {
                    problems.push(format!(
                        "interval domain declares more than {} values",
                        IntervalDomain::MAX_VALUES
                    ));
                }
            }
            Domain::Continuous(d) => {
                if !(d.min.is_finite() && d.max.is_finite()) {
                    problems.push("continuous domain bounds must be finite".to_string());
                } else if d.min >= d.max {
                    problems.push(format!(
                        "continuous domain minimum {} must be below maximum {}",
                        d.min, d.max
                    ));
                }
            }
        }
        problems
    }
}
