//! Nearest-neighbour search over country embeddings
//!
//! [`AtlasVectorIndex`] runs a `$vectorSearch` aggregation through the MongoDB
//! Atlas Data API. [`InMemoryVectorIndex`] scans the local store.

use crate::http::{create_http_client, upstream_status_error, upstream_transport_error, validate_url, DEFAULT_TIMEOUT};
use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use countrysim_core::{cosine, Country, Error, Result, EMBEDDING_DIM};
use countrysim_storage::CountryStore;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_INDEX_NAME: &str = "country_vector_index";
pub const EMBEDDING_PATH: &str = "embedding";
const MIN_NUM_CANDIDATES: usize = 100;

/// One nearest-neighbour match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorHit {
    pub name: String,
    pub iso_code: Option<String>,
    /// Similarity, capped at 1.0
    pub score: f64,
}

#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Up to `limit` countries closest to `query`, best first, never
    /// including the country named `exclude`.
    async fn search(&self, query: &[f32], limit: usize, exclude: Option<&str>) -> Result<Vec<VectorHit>>;

    /// Index definition to create on the backing service
    fn index_definition(&self) -> Value;

    fn name(&self) -> &'static str;
}

/// Atlas Search index definition for `dimension`-wide cosine vectors
pub fn vector_index_definition(index_name: &str, dimension: usize) -> Value {
    json!({
        "name": index_name,
        "type": "vectorSearch",
        "definition": {
            "fields": [{
                "type": "vector",
                "path": EMBEDDING_PATH,
                "numDimensions": dimension,
                "similarity": "cosine"
            }]
        }
    })
}

/// Brute-force cosine ranking over `countries`. Countries without an
/// embedding, with the wrong dimension or with a zero vector are skipped.
/// Ties keep input order.
pub fn cosine_scan<'a>(
    countries: &'a [Country],
    query: &[f32],
    limit: usize,
    exclude: Option<&str>,
) -> Vec<(&'a Country, f64)> {
    let mut scored: Vec<(&Country, f64)> = countries
        .iter()
        .filter(|c| exclude.map_or(true, |name| c.name != name))
        .filter_map(|c| {
            let embedding = c.embedding.as_deref()?;
            let score = cosine(query, embedding).ok().filter(|s| s.is_finite())?;
            Some((c, f64::from(score)))
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
}

/// Vector search over the embeddings held by the local store
pub struct InMemoryVectorIndex {
    store: Arc<CountryStore>,
    dimension: usize,
}

impl InMemoryVectorIndex {
    pub fn new(store: Arc<CountryStore>) -> Self {
        Self {
            store,
            dimension: EMBEDDING_DIM,
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[async_trait]
impl VectorIndexProvider for InMemoryVectorIndex {
    async fn search(&self, query: &[f32], limit: usize, exclude: Option<&str>) -> Result<Vec<VectorHit>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let snapshot = self.store.snapshot();
        let hits = cosine_scan(&snapshot, query, limit, exclude)
            .into_iter()
            .map(|(c, score)| VectorHit {
                name: c.name.clone(),
                iso_code: Some(c.iso_code.clone()),
                score,
            })
            .collect();
        Ok(hits)
    }

    fn index_definition(&self) -> Value {
        vector_index_definition(DEFAULT_INDEX_NAME, self.dimension)
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

/// Connection settings for the Atlas Data API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// e.g. `https://data.mongodb-api.com/app/<app-id>/endpoint/data/v1`
    pub data_api_url: String,
    pub api_key: String,
    #[serde(default = "default_data_source")]
    pub data_source: String,
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(skip, default = "default_timeout")]
    pub timeout: Duration,
    #[serde(skip, default = "default_dimension")]
    pub dimension: usize,
}

fn default_data_source() -> String {
    "Cluster0".to_string()
}

fn default_collection() -> String {
    "countries".to_string()
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_dimension() -> usize {
    EMBEDDING_DIM
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRequest<'a> {
    data_source: &'a str,
    database: &'a str,
    collection: &'a str,
    pipeline: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    documents: Vec<Value>,
}

/// Vector search through MongoDB Atlas `$vectorSearch`
pub struct AtlasVectorIndex {
    config: AtlasConfig,
    client: Client,
    retry: RetryConfig,
}

impl AtlasVectorIndex {
    pub fn new(config: AtlasConfig) -> Result<Self> {
        validate_url(&config.data_api_url)?;
        Ok(Self {
            client: create_http_client(config.timeout)?,
            config,
            retry: RetryConfig::no_retry(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_url(&self, action: &str) -> String {
        format!(
            "{}/action/{}",
            self.config.data_api_url.trim_end_matches('/'),
            action
        )
    }

    /// Aggregation pipeline for one search. One extra neighbour is requested
    /// when excluding, since the excluded country is usually its own nearest.
    pub fn search_pipeline(&self, query: &[f32], limit: usize, exclude: Option<&str>) -> Vec<Value> {
        let mut pipeline = vec![
            json!({
                "$vectorSearch": {
                    "index": self.config.index_name,
                    "path": EMBEDDING_PATH,
                    "queryVector": query,
                    "numCandidates": (limit * 5).max(MIN_NUM_CANDIDATES),
                    "limit": limit + usize::from(exclude.is_some()),
                }
            }),
            json!({ "$addFields": { "similarityScore": { "$meta": "vectorSearchScore" } } }),
        ];
        if let Some(name) = exclude {
            pipeline.push(json!({ "$match": { "name": { "$ne": name } } }));
        }
        pipeline.push(json!({ "$limit": limit }));
        pipeline.push(json!({
            "$project": {
                "name": 1, "iso_code": 1, "flag": 1, "region": 1,
                "capital": 1, "indicators": 1, "similarityScore": 1, "metadata": 1
            }
        }));
        pipeline
    }

    async fn aggregate(&self, pipeline: Vec<Value>) -> Result<AggregateResponse> {
        let request = AggregateRequest {
            data_source: &self.config.data_source,
            database: &self.config.database,
            collection: &self.config.collection,
            pipeline,
        };

        let response = self
            .client
            .post(self.build_url("aggregate"))
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| upstream_transport_error("MongoDB Atlas", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_status_error("MongoDB Atlas", status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| upstream_transport_error("MongoDB Atlas", e))
    }
}

fn parse_hit(doc: &Value) -> Option<VectorHit> {
    let name = doc.get("name")?.as_str()?.to_string();
    let iso_code = doc
        .get("iso_code")
        .or_else(|| doc.get("isoCode"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let score = doc
        .get("similarityScore")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .min(1.0);
    Some(VectorHit { name, iso_code, score })
}

#[async_trait]
impl VectorIndexProvider for AtlasVectorIndex {
    async fn search(&self, query: &[f32], limit: usize, exclude: Option<&str>) -> Result<Vec<VectorHit>> {
        if query.len() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                actual: query.len(),
            });
        }

        let response = with_retry(&self.retry, "atlas vector search", || {
            self.aggregate(self.search_pipeline(query, limit, exclude))
        })
        .await?;

        let hits: Vec<VectorHit> = response
            .documents
            .iter()
            .filter_map(parse_hit)
            .filter(|hit| exclude.map_or(true, |name| hit.name != name))
            .take(limit)
            .collect();

        debug!(
            index = %self.config.index_name,
            returned = hits.len(),
            "atlas vector search"
        );
        Ok(hits)
    }

    fn index_definition(&self) -> Value {
        vector_index_definition(&self.config.index_name, self.config.dimension)
    }

    fn name(&self) -> &'static str {
        "atlas"
    }
}
