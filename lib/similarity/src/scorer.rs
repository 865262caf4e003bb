//! Indicator similarity scorers
//!
//! Two formulas exist for comparing indicator vectors. Both are available as
//! named strategies behind [`SimilarityScorer`]:
//!
//! - [`RatioScorer`] (default, used by the fallback search path): weighted
//!   mean of `1 - |a-b| / max(|a|,|b|)` over the indicators present in both
//!   vectors. Range [0.0, 1.0], symmetric, `score(a, a) == 1.0`.
//! - [`RelativeDifferenceScorer`]: `1 - Σ w·relDiff / Σ w`, clamped to
//!   [0.5, 1.0] so that the least similar pair is still framed as moderately
//!   similar.
//!
//! In both, indicators missing from either side are dropped from the
//! numerator and the denominator, re-weighting over what is present.

use crate::distance::{ratio_similarity, relative_difference};
use crate::weights::WeightTable;
use countrysim_core::{Indicator, IndicatorVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score plus the per-indicator contributions that make it up
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub score: f64,
    /// Weighted contribution of each compared indicator
    pub contributions: BTreeMap<Indicator, f64>,
}

impl ScoreBreakdown {
    /// Indicator with the largest contribution
    pub fn top_indicator(&self) -> Option<Indicator> {
        self.contributions
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| *i)
    }
}

/// Pure scoring function over two validated vectors.
pub trait SimilarityScorer: Send + Sync + std::fmt::Debug {
    fn score(&self, a: &IndicatorVector, b: &IndicatorVector) -> ScoreBreakdown;

    /// Closed range every score falls in
    fn range(&self) -> (f64, f64);

    fn name(&self) -> &'static str;
}

/// Weighted ratio similarity
#[derive(Debug, Clone, Default)]
pub struct RatioScorer {
    weights: WeightTable,
}

impl RatioScorer {
    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }
}

impl SimilarityScorer for RatioScorer {
    fn score(&self, a: &IndicatorVector, b: &IndicatorVector) -> ScoreBreakdown {
        let mut total_score = 0.0f64;
        let mut total_weight = 0.0f64;
        let mut weighted = Vec::with_capacity(self.weights.len());

        for (indicator, weight) in self.weights.iter() {
            let (Some(va), Some(vb)) = (a.get(indicator), b.get(indicator)) else {
                continue;
            };
            let similarity = ratio_similarity(va, vb);
            total_score += similarity * weight;
            total_weight += weight;
            weighted.push((indicator, similarity * weight));
        }

        if total_weight <= 0.0 {
            return ScoreBreakdown {
                score: 0.0,
                contributions: BTreeMap::new(),
            };
        }

        ScoreBreakdown {
            score: total_score / total_weight,
            contributions: weighted
                .into_iter()
                .map(|(i, s)| (i, s / total_weight))
                .collect(),
        }
    }

    fn range(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "ratio"
    }
}

/// One minus the weighted relative difference, floored at 0.5
#[derive(Debug, Clone)]
pub struct RelativeDifferenceScorer {
    weights: WeightTable,
}

impl RelativeDifferenceScorer {
    pub const FLOOR: f64 = 0.5;

    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }
}

impl Default for RelativeDifferenceScorer {
    fn default() -> Self {
        Self::new(WeightTable::relative_difference_default())
    }
}

impl SimilarityScorer for RelativeDifferenceScorer {
    fn score(&self, a: &IndicatorVector, b: &IndicatorVector) -> ScoreBreakdown {
        let mut penalty = 0.0f64;
        let mut total_weight = 0.0f64;
        let mut compared = Vec::with_capacity(self.weights.len());

        for (indicator, weight) in self.weights.iter() {
            let (Some(va), Some(vb)) = (a.get(indicator), b.get(indicator)) else {
                continue;
            };
            let diff = relative_difference(va, vb);
            penalty += weight * diff;
            total_weight += weight;
            compared.push((indicator, weight * (1.0 - diff)));
        }

        if total_weight <= 0.0 {
            return ScoreBreakdown {
                score: Self::FLOOR,
                contributions: BTreeMap::new(),
            };
        }

        let raw = 1.0 - penalty / total_weight;
        ScoreBreakdown {
            score: raw.clamp(Self::FLOOR, 1.0),
            contributions: compared
                .into_iter()
                .map(|(i, s)| (i, s / total_weight))
                .collect(),
        }
    }

    fn range(&self) -> (f64, f64) {
        (Self::FLOOR, 1.0)
    }

    fn name(&self) -> &'static str {
        "relative_difference"
    }
}

/// Named scoring strategy, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    #[default]
    Ratio,
    RelativeDifference,
}

impl ScoringStrategy {
    /// Build the scorer with the strategy's default weight table
    pub fn build(self) -> Box<dyn SimilarityScorer> {
        match self {
            ScoringStrategy::Ratio => Box::new(RatioScorer::default()),
            ScoringStrategy::RelativeDifference => Box::new(RelativeDifferenceScorer::default()),
        }
    }
}

impl std::str::FromStr for ScoringStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ratio" => Ok(ScoringStrategy::Ratio),
            "relative_difference" | "relative-difference" => Ok(ScoringStrategy::RelativeDifference),
            other => Err(format!("unknown scoring strategy '{}'", other)),
        }
    }
}
