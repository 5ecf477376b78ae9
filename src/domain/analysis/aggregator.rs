//! Preference Aggregator - weighted utility of alternatives per user.
//!
//! `total_utility(user, alternative) = Σ weight(p) × score_p(value_p)` over
//! the primitive objectives `p` of the hierarchy.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use crate::domain::chart::{Alternative, Chart};
use crate::domain::foundation::{ObjectiveId, EPSILON};
use crate::domain::objective::{DomainValue, Objective};
use crate::domain::preference::User;
use crate::domain::score_function::{ScoreFunctionError, Scoring};

/// Errors raised while aggregating one user's preferences.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("User '{username}' has no score function for objective '{objective_id}'")]
    MissingScoreFunction {
        username: String,
        objective_id: ObjectiveId,
    },

    #[error("Cannot score objective '{objective_id}' for alternative '{alternative}': {source}")]
    Score {
        objective_id: ObjectiveId,
        alternative: String,
        #[source]
        source: ScoreFunctionError,
    },
}

/// Share of one primitive objective in an alternative's total utility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreContribution {
    pub objective_id: ObjectiveId,
    pub weight: f64,
    /// `None` when the alternative has no value for the objective yet.
    pub score: Option<f64>,
    pub contribution: f64,
}

/// Total utility of one alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeUtility {
    pub alternative: String,
    pub total: f64,
}

/// One user's alternatives, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRanking {
    pub username: String,
    pub alternatives: Vec<AlternativeUtility>,
}

/// Rankings of every valid user, plus users whose preferences could not be aggregated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartRanking {
    pub rankings: Vec<UserRanking>,
    pub failures: Vec<(String, AggregationError)>,
}

/// Normalised weight of one objective, for weight displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeight {
    pub objective_id: ObjectiveId,
    pub name: String,
    pub weight: f64,
}

/// Stateless aggregation over users, objectives and alternatives.
pub struct PreferenceAggregator;

impl PreferenceAggregator {
    /// Per-objective contributions to `alternative`'s utility for `user`.
    ///
    /// Objectives the alternative has no value for contribute 0.
    ///
    /// # Errors
    ///
    /// - `MissingScoreFunction` if a weighted objective has no score function
    /// - `Score` if the score function cannot evaluate the alternative's value
    pub fn contributions(
        root: &Objective,
        user: &User,
        alternative: &Alternative,
    ) -> Result<Vec<ScoreContribution>, AggregationError> {
        root.primitives()
            .into_iter()
            .map(|primitive| {
                let id = &primitive.id;
                let weight = user.weight_map().weight(id).unwrap_or(0.0);
                let Some(value) = alternative.value_of(id) else {
                    return Ok(ScoreContribution {
                        objective_id: id.clone(),
                        weight,
                        score: None,
                        contribution: 0.0,
                    });
                };
                let score = Self::score(user, id, alternative, value, weight)?;
                Ok(ScoreContribution {
                    objective_id: id.clone(),
                    weight,
                    score,
                    contribution: score.map(|s| s * weight).unwrap_or(0.0),
                })
            })
            .collect()
    }

    fn score(
        user: &User,
        id: &ObjectiveId,
        alternative: &Alternative,
        value: &DomainValue,
        weight: f64,
    ) -> Result<Option<f64>, AggregationError> {
        let Some(function) = user.score_function(id) else {
            if weight.abs() <= EPSILON {
                return Ok(None);
            }
            return Err(AggregationError::MissingScoreFunction {
                username: user.username().to_string(),
                objective_id: id.clone(),
            });
        };
        function
            .evaluate(value)
            .map(Some)
            .map_err(|source| AggregationError::Score {
                objective_id: id.clone(),
                alternative: alternative.name.clone(),
                source,
            })
    }

    /// Weighted sum of scores for one alternative.
    pub fn total_utility(
        root: &Objective,
        user: &User,
        alternative: &Alternative,
    ) -> Result<f64, AggregationError> {
        Ok(Self::contributions(root, user, alternative)?
            .iter()
            .map(|c| c.contribution)
            .sum())
    }

    /// Every alternative with its total utility, best first.
    ///
    /// Ties keep the chart's alternative order.
    pub fn rank_alternatives(
        root: &Objective,
        user: &User,
        alternatives: &[Alternative],
    ) -> Result<Vec<AlternativeUtility>, AggregationError> {
        let mut ranked = alternatives
            .iter()
            .map(|alternative| {
                Ok(AlternativeUtility {
                    alternative: alternative.name.clone(),
                    total: Self::total_utility(root, user, alternative)?,
                })
            })
            .collect::<Result<Vec<_>, AggregationError>>()?;
        ranked.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
        Ok(ranked)
    }

    /// Rankings for every valid user of the chart.
    ///
    /// Users marked invalid are left out entirely.
    pub fn chart_ranking(chart: &Chart) -> ChartRanking {
        let mut result = ChartRanking::default();
        for user in chart.valid_users() {
            match Self::rank_alternatives(chart.root_objective(), user, chart.alternatives()) {
                Ok(alternatives) => result.rankings.push(UserRanking {
                    username: user.username().to_string(),
                    alternatives,
                }),
                Err(e) => result.failures.push((user.username().to_string(), e)),
            }
        }
        result
    }

    /// Normalised weight of every objective in pre-order, root included.
    pub fn objective_weights(root: &Objective, user: &User) -> Vec<ObjectiveWeight> {
        root.descendants()
            .into_iter()
            .map(|node| ObjectiveWeight {
                objective_id: node.id().clone(),
                name: node.name().to_string(),
                weight: user.weight_map().normalized_weight(root, node.id()),
            })
            .collect()
    }

    /// Plot samples of a user's score function for one primitive objective.
    pub fn score_function_samples(
        root: &Objective,
        user: &User,
        objective_id: &ObjectiveId,
    ) -> Option<Vec<(DomainValue, f64)>> {
        let primitive = root.find_primitive(objective_id)?;
        let function = user.score_function(objective_id)?;
        Some(function.samples(&primitive.domain))
    }
}
