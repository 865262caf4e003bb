//! Ranking engine
//!
//! Scores a set of candidate vectors against a reference, orders them and
//! keeps the best `limit`, each with its reason tags.

use crate::reasons::reasons;
use crate::scorer::{RatioScorer, ScoringStrategy, SimilarityScorer};
use countrysim_core::{Error, Indicator, IndicatorVector, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One ranked candidate
#[derive(Debug, Clone)]
pub struct RankedResult {
    /// The candidate vector
    pub candidate: IndicatorVector,
    /// Position of the candidate in the input sequence
    pub position: usize,
    /// Score clamped to [0.0, 1.0]
    pub score: f64,
    /// Reason tags, at most four, in rule order
    pub reasons: Vec<String>,
    /// Weighted contribution of each compared indicator
    pub contributions: BTreeMap<Indicator, f64>,
}

impl RankedResult {
    pub fn name(&self) -> &str {
        self.candidate.name()
    }
}

/// Ranks candidates with a pluggable scorer
#[derive(Debug, Clone)]
pub struct RankingEngine {
    scorer: Arc<dyn SimilarityScorer>,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(Arc::new(RatioScorer::default()))
    }
}

impl RankingEngine {
    pub fn new(scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self { scorer }
    }

    pub fn with_strategy(strategy: ScoringStrategy) -> Self {
        Self::new(Arc::from(strategy.build()))
    }

    pub fn scorer(&self) -> &dyn SimilarityScorer {
        self.scorer.as_ref()
    }

    /// Rank `candidates` by similarity to `reference`.
    ///
    /// Candidates named `exclude_name` are skipped. Ordering is by descending
    /// score with ties kept in input order. `limit` is taken as given; callers
    /// at the boundary are responsible for clamping it. An empty candidate set
    /// yields an empty result.
    pub fn rank(
        &self,
        reference: &IndicatorVector,
        candidates: &[IndicatorVector],
        limit: usize,
        exclude_name: Option<&str>,
    ) -> Vec<RankedResult> {
        let eligible: Vec<(usize, &IndicatorVector)> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| exclude_name.map_or(true, |name| c.name() != name))
            .collect();

        // Indexed parallel iteration keeps input order in the collected Vec
        let mut scored: Vec<(usize, &IndicatorVector, f64, BTreeMap<Indicator, f64>)> = eligible
            .par_iter()
            .map(|(position, candidate)| {
                let breakdown = self.scorer.score(reference, candidate);
                (*position, *candidate, breakdown.score, breakdown.contributions)
            })
            .collect();

        // Stable: equal scores keep their input order
        scored.sort_by(|a, b| b.2.total_cmp(&a.2));
        scored.truncate(limit);

        debug!(
            reference = reference.name(),
            scorer = self.scorer.name(),
            considered = eligible.len(),
            returned = scored.len(),
            "ranked candidates"
        );

        scored
            .into_iter()
            .map(|(position, candidate, score, contributions)| RankedResult {
                reasons: reasons(candidate, candidate.region()),
                candidate: candidate.clone(),
                position,
                score: score.clamp(0.0, 1.0),
                contributions,
            })
            .collect()
    }

    /// Like [`RankingEngine::rank`], but fails with `EmptyCandidateSet` when no
    /// candidate survives the exclusion filter.
    pub fn rank_required(
        &self,
        reference: &IndicatorVector,
        candidates: &[IndicatorVector],
        limit: usize,
        exclude_name: Option<&str>,
    ) -> Result<Vec<RankedResult>> {
        let results = self.rank(reference, candidates, limit, exclude_name);
        if results.is_empty() && limit > 0 {
            return Err(Error::EmptyCandidateSet);
        }
        Ok(results)
    }
}
