//! Explainability for similarity results
//!
//! Output structures handed back to clients: the scored country, its reason
//! tags and, when the indicator scorer produced the score, the per-indicator
//! contributions.

use crate::rank::RankedResult;
use crate::reasons::reasons_for;
use countrysim_core::{Country, CountryView, Indicator};
use serde::Serialize;
use std::collections::BTreeMap;

/// One search result as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    /// Reference country name or query text
    pub query: String,
    pub country: CountryView,
    /// Similarity in [0.0, 1.0]
    pub score: f64,
    pub reasons: Vec<String>,
    /// Per-indicator contributions (already weighted)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub explain: BTreeMap<Indicator, f64>,
}

impl SimilarityResult {
    /// Build from a ranked candidate and the stored record it came from
    pub fn from_ranked(query: &str, ranked: RankedResult, country: &Country) -> Self {
        Self {
            query: query.to_string(),
            country: country.view(),
            score: ranked.score,
            reasons: ranked.reasons,
            explain: ranked.contributions,
        }
    }

    /// Build from a vector-search hit. The score is clamped to [0.0, 1.0].
    pub fn from_vector_hit(query: &str, country: &Country, score: f64) -> Self {
        Self {
            query: query.to_string(),
            country: country.view(),
            score: score.clamp(0.0, 1.0),
            reasons: reasons_for(&country.indicators, &country.region),
            explain: BTreeMap::new(),
        }
    }
}

/// Summary statistics for a similarity query
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Number of candidates considered
    pub candidates_count: usize,
    /// Number of results returned
    pub results_count: usize,
    /// Average score of results
    pub avg_score: f64,
    /// Score of best result
    pub best_score: f64,
    /// Indicator that contributed most to the best result
    pub top_contributing_indicator: Option<Indicator>,
}

impl SearchStats {
    /// Compute stats from results sorted best first
    pub fn compute(results: &[SimilarityResult], candidates_count: usize) -> Self {
        if results.is_empty() {
            return Self {
                candidates_count,
                results_count: 0,
                avg_score: 0.0,
                best_score: 0.0,
                top_contributing_indicator: None,
            };
        }

        let avg_score = results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64;
        let best_score = results[0].score;

        let top_contributing_indicator = results[0]
            .explain
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(indicator, _)| *indicator);

        Self {
            candidates_count,
            results_count: results.len(),
            avg_score,
            best_score,
            top_contributing_indicator,
        }
    }
}
