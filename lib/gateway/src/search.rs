//! Similarity search with graceful degradation
//!
//! Vector search is tried first. When it fails, or the reference country has
//! no embedding yet, results come from the deterministic indicator scorer
//! (country queries) or a local cosine scan (description queries).

use crate::embedding::{describe_country, EmbeddingProvider};
use crate::retry::{with_retry, RetryConfig};
use crate::vector_index::{cosine_scan, VectorHit, VectorIndexProvider};
use countrysim_core::{Country, Error, IndicatorVector, Result};
use countrysim_similarity::{RankingEngine, SearchStats, SimilarityResult};
use countrysim_storage::CountryStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchTarget {
    /// Reference country by ISO code or name
    Country(String),
    /// Free-text description to embed
    Description(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub target: SearchTarget,
    pub limit: usize,
    /// Drop results scoring below this
    pub threshold: Option<f64>,
}

impl SearchRequest {
    /// `limit` is clamped to `[1, MAX_SEARCH_LIMIT]`
    pub fn new(target: SearchTarget, limit: usize) -> Self {
        Self {
            target,
            limit: limit.clamp(1, MAX_SEARCH_LIMIT),
            threshold: None,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    CountryReference,
    TextDescription,
}

/// Which path produced the results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEngine {
    VectorSearch,
    FallbackScorer,
    FallbackCosine,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub query: String,
    pub method: SearchMethod,
    pub engine: SearchEngine,
    pub results: Vec<SimilarityResult>,
    pub stats: SearchStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Similarity search over the country store
pub struct SimilaritySearchService {
    store: Arc<CountryStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    ranking: RankingEngine,
}

impl SimilaritySearchService {
    pub fn new(
        store: Arc<CountryStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            ranking: RankingEngine::default(),
        }
    }

    #[must_use]
    pub fn with_ranking(mut self, ranking: RankingEngine) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn ranking(&self) -> &RankingEngine {
        &self.ranking
    }

    pub fn store(&self) -> &Arc<CountryStore> {
        &self.store
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub fn index(&self) -> &dyn VectorIndexProvider {
        self.index.as_ref()
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchOutcome> {
        let limit = request.limit;
        let mut outcome = match &request.target {
            SearchTarget::Country(term) => self.search_by_country(term, limit).await?,
            SearchTarget::Description(text) => self.search_by_description(text, limit).await?,
        };

        if let Some(threshold) = request.threshold {
            outcome.results.retain(|r| r.score >= threshold);
            outcome.stats = SearchStats::compute(&outcome.results, outcome.stats.candidates_count);
        }

        info!(
            query = %outcome.query,
            engine = ?outcome.engine,
            results = outcome.results.len(),
            "similarity search"
        );
        Ok(outcome)
    }

    async fn search_by_country(&self, term: &str, limit: usize) -> Result<SearchOutcome> {
        let reference = self.store.find_reference(term)?;

        let name = reference.name.as_str();
        match reference.embedding.as_deref().filter(|e| !e.is_empty()) {
            Some(embedding) => match self.vector_results(name, embedding, limit, Some(name)).await {
                Ok((results, considered)) => {
                    return Ok(outcome(
                        name,
                        SearchMethod::CountryReference,
                        SearchEngine::VectorSearch,
                        results,
                        considered,
                    ));
                }
                Err(e) => warn!(reference = name, "vector search failed, using indicator scorer: {}", e),
            },
            None => debug!(reference = name, "reference has no embedding, using indicator scorer"),
        }

        self.fallback_scorer(&reference, limit)
    }

    async fn search_by_description(&self, text: &str, limit: usize) -> Result<SearchOutcome> {
        let query = self.embedder.embed(text).await.map_err(|e| match e {
            Error::UpstreamUnavailable(_) => e,
            other => Error::UpstreamUnavailable(format!("embedding failed: {}", other)),
        })?;

        match self.vector_results(text, query.as_slice(), limit, None).await {
            Ok((results, considered)) => {
                return Ok(outcome(
                    text,
                    SearchMethod::TextDescription,
                    SearchEngine::VectorSearch,
                    results,
                    considered,
                ));
            }
            Err(e) => warn!("vector search failed, using local cosine scan: {}", e),
        }

        let snapshot = self.store.snapshot();
        let results: Vec<SimilarityResult> = cosine_scan(&snapshot, query.as_slice(), limit, None)
            .into_iter()
            .map(|(country, score)| SimilarityResult::from_vector_hit(text, country, score))
            .collect();
        Ok(outcome(
            text,
            SearchMethod::TextDescription,
            SearchEngine::FallbackCosine,
            results,
            snapshot.len(),
        ))
    }

    /// Run the vector index and map hits back to stored countries. Hits the
    /// store does not know are dropped.
    async fn vector_results(
        &self,
        query_text: &str,
        embedding: &[f32],
        limit: usize,
        exclude: Option<&str>,
    ) -> Result<(Vec<SimilarityResult>, usize)> {
        let hits = self.index.search(embedding, limit, exclude).await?;
        let considered = hits.len();

        let results = hits
            .iter()
            .filter(|hit| exclude.map_or(true, |name| hit.name != name))
            .filter_map(|hit| match self.resolve_hit(hit) {
                Some(country) => Some(SimilarityResult::from_vector_hit(query_text, &country, hit.score)),
                None => {
                    debug!(name = %hit.name, "vector hit not in local store");
                    None
                }
            })
            .take(limit)
            .collect();
        Ok((results, considered))
    }

    fn resolve_hit(&self, hit: &VectorHit) -> Option<Country> {
        hit.iso_code
            .as_deref()
            .and_then(|code| self.store.get_by_key(code))
            .filter(|c| c.name == hit.name)
            .or_else(|| self.store.get_by_name(&hit.name))
    }

    fn fallback_scorer(&self, reference: &Country, limit: usize) -> Result<SearchOutcome> {
        let reference_vector = IndicatorVector::from_country(reference)?;

        let snapshot = self.store.snapshot();
        let mut countries = Vec::with_capacity(snapshot.len());
        let mut vectors = Vec::with_capacity(snapshot.len());
        for country in &snapshot {
            match IndicatorVector::from_country(country) {
                Ok(vector) => {
                    countries.push(country);
                    vectors.push(vector);
                }
                Err(e) => warn!(country = %country.name, "skipping invalid candidate: {}", e),
            }
        }

        let results = self
            .ranking
            .rank(&reference_vector, &vectors, limit, Some(&reference.name))
            .into_iter()
            .map(|ranked| {
                let country = countries[ranked.position];
                SimilarityResult::from_ranked(&reference.name, ranked, country)
            })
            .collect();

        Ok(outcome(
            &reference.name,
            SearchMethod::CountryReference,
            SearchEngine::FallbackScorer,
            results,
            vectors.len(),
        ))
    }

    /// Generate and store the embedding of one country
    pub async fn embed_country(&self, country: &Country, retry: &RetryConfig) -> Result<()> {
        let text = describe_country(country);
        let embedding = with_retry(retry, "embed country", || self.embedder.embed(&text)).await?;
        embedding.ensure_dim(self.embedder.dimension())?;
        self.store.set_embedding(&country.id, embedding.into_inner())
    }

    /// Regenerate embeddings. With `only_missing`, countries that already
    /// have one are skipped.
    pub async fn refresh_embeddings(&self, only_missing: bool, retry: &RetryConfig) -> RefreshReport {
        let mut report = RefreshReport::default();

        for country in self.store.snapshot() {
            report.processed += 1;
            if only_missing && country.has_embedding() {
                report.skipped += 1;
                continue;
            }
            match self.embed_country(&country, retry).await {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    warn!(country = %country.name, "embedding refresh failed: {}", e);
                    report.errors.push(format!("{}: {}", country.name, e));
                }
            }
        }

        info!(
            model = self.embedder.model_id(),
            processed = report.processed,
            updated = report.updated,
            errors = report.errors.len(),
            "embedding refresh finished"
        );
        report
    }
}

fn outcome(
    query: &str,
    method: SearchMethod,
    engine: SearchEngine,
    results: Vec<SimilarityResult>,
    considered: usize,
) -> SearchOutcome {
    let stats = SearchStats::compute(&results, considered);
    SearchOutcome {
        query: query.to_string(),
        method,
        engine,
        results,
        stats,
    }
}
