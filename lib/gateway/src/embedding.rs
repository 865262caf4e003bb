//! Text-to-vector providers
//!
//! [`VertexEmbeddingClient`] calls the Vertex AI prediction endpoint;
//! [`HashEmbedder`] is an offline, deterministic stand-in used in development
//! and tests. Both produce unit-length vectors of a fixed dimension.

use crate::http::{create_http_client, upstream_status_error, upstream_transport_error, validate_url, DEFAULT_TIMEOUT};
use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use countrysim_core::{Country, Embedding, Error, Result, ValidationError, EMBEDDING_DIM};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Write;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_VERTEX_MODEL: &str = "textembedding-gecko@003";
pub const DEFAULT_VERTEX_LOCATION: &str = "us-central1";

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text` into a vector of [`dimension`](Self::dimension) floats
    async fn embed(&self, text: &str) -> Result<Embedding>;

    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}

/// Deterministic hashed trigram + word embedding
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Synchronous form of [`EmbeddingProvider::embed`]
    pub fn embed_text(&self, text: &str) -> Result<Embedding> {
        let normalized = text.to_lowercase();
        let mut vector = vec![0.0f32; self.dim];

        let chars: Vec<char> = normalized.chars().collect();
        for window in chars.windows(3) {
            let trigram: String = window.iter().collect();
            vector[self.bucket(&trigram)] += 1.0;
        }

        // Words weigh more than trigrams
        for word in normalized.split_whitespace() {
            vector[self.bucket(word)] += 2.0;
        }

        let mut embedding = Embedding::new(vector);
        if embedding.as_slice().iter().all(|v| *v == 0.0) {
            return Err(ValidationError::new("text", "must contain at least one word").into());
        }
        embedding.normalize();
        Ok(embedding)
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() % self.dim as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_text(text)
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> &str {
        "hash-trigram-v1"
    }
}

/// Connection settings for the Vertex AI prediction endpoint
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    pub model: String,
    /// OAuth bearer token
    pub access_token: String,
    /// Overrides `https://{location}-aiplatform.googleapis.com`
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub dimension: usize,
}

impl VertexConfig {
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: DEFAULT_VERTEX_LOCATION.to_string(),
            model: DEFAULT_VERTEX_MODEL.to_string(),
            access_token: access_token.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            dimension: EMBEDDING_DIM,
        }
    }

    pub fn predict_url(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.location));
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            base.trim_end_matches('/'),
            self.project_id,
            self.location,
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    embeddings: PredictionEmbeddings,
}

#[derive(Debug, Deserialize)]
struct PredictionEmbeddings {
    values: Vec<f32>,
}

/// Embedding provider backed by Vertex AI text embeddings
pub struct VertexEmbeddingClient {
    config: VertexConfig,
    client: Client,
    url: String,
    retry: RetryConfig,
}

impl VertexEmbeddingClient {
    pub fn new(config: VertexConfig) -> Result<Self> {
        let url = config.predict_url();
        validate_url(&url)?;
        if config.project_id.trim().is_empty() {
            return Err(Error::InvalidConfig("Vertex project id is empty".to_string()));
        }
        Ok(Self {
            client: create_http_client(config.timeout)?,
            url,
            config,
            retry: RetryConfig::no_retry(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn predict(&self, text: &str) -> Result<Embedding> {
        let body = json!({
            "instances": [{ "content": text, "task_type": "SEMANTIC_SIMILARITY" }],
            "parameters": { "autoTruncate": true }
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| upstream_transport_error("Vertex AI", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(upstream_status_error("Vertex AI", status, &text));
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| upstream_transport_error("Vertex AI", e))?;

        let values = parsed
            .predictions
            .into_iter()
            .next()
            .map(|p| p.embeddings.values)
            .ok_or_else(|| Error::UpstreamUnavailable("Vertex AI returned no embedding".to_string()))?;

        if values.len() != self.config.dimension {
            return Err(Error::UpstreamUnavailable(format!(
                "Vertex AI returned {} dimensions, expected {}",
                values.len(),
                self.config.dimension
            )));
        }
        Ok(Embedding::new(values))
    }
}

#[async_trait]
impl EmbeddingProvider for VertexEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!(model = %self.config.model, chars = text.len(), "requesting embedding");
        with_retry(&self.retry, "vertex predict", || self.predict(text)).await
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

fn economic_level(gdp: f64) -> &'static str {
    if gdp > 50000.0 {
        "high income developed economy"
    } else if gdp > 25000.0 {
        "upper middle income economy"
    } else if gdp > 10000.0 {
        "middle income economy"
    } else if gdp > 3000.0 {
        "lower middle income economy"
    } else {
        "low income developing economy"
    }
}

fn environmental_level(co2: f64) -> &'static str {
    if co2 > 15.0 {
        "high carbon emissions"
    } else if co2 > 8.0 {
        "moderate carbon emissions"
    } else if co2 > 4.0 {
        "low carbon emissions"
    } else {
        "very low carbon emissions"
    }
}

fn social_level(life_expectancy: f64, education: f64) -> &'static str {
    let score = (life_expectancy / 85.0 + education / 100.0) / 2.0;
    if score > 0.8 {
        "high human development"
    } else if score > 0.6 {
        "medium human development"
    } else {
        "low human development"
    }
}

/// Text embedded for a stored country
pub fn describe_country(country: &Country) -> String {
    let ind = &country.indicators;
    let mut text = String::with_capacity(512);

    // Writing to a String cannot fail
    let _ = writeln!(text, "Country: {}", country.name);
    let _ = writeln!(text, "Region: {}", country.region);
    let _ = writeln!(text, "Capital: {}", country.capital);
    let _ = writeln!(text, "GDP per capita: ${}", ind.gdp);
    let _ = writeln!(text, "Life expectancy: {} years", ind.life_expectancy);
    let _ = writeln!(text, "Education index: {}%", ind.education);
    let _ = writeln!(text, "CO2 emissions per capita: {} tons", ind.co2_emissions);
    let _ = writeln!(text, "Population: {} million", ind.population);
    if let Some(v) = ind.unemployment_rate.filter(|v| *v != 0.0) {
        let _ = writeln!(text, "Unemployment rate: {}%", v);
    }
    if let Some(v) = ind.corruption_index.filter(|v| *v != 0.0) {
        let _ = writeln!(text, "Corruption perception index: {}", v);
    }
    if let Some(v) = ind.happiness_score.filter(|v| *v != 0.0) {
        let _ = writeln!(text, "Happiness score: {}", v);
    }
    let _ = writeln!(text, "Economic development level: {}", economic_level(ind.gdp));
    let _ = writeln!(text, "Environmental impact: {}", environmental_level(ind.co2_emissions));
    let _ = write!(
        text,
        "Social development: {}",
        social_level(ind.life_expectancy, ind.education)
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use countrysim_core::{Indicators, NewCountry, DEFAULT_DATA_SOURCE};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn germany() -> Country {
        Country::from_new(
            NewCountry {
                name: "Germany".into(),
                iso_code: "DE".into(),
                flag: "🇩🇪".into(),
                region: "Europe".into(),
                capital: "Berlin".into(),
                indicators: Indicators::new(46259.0, 81.3, 92.0, 9.4, 83.0)
                    .with_optional(Some(3.2), Some(80.0), None),
            },
            DEFAULT_DATA_SOURCE,
        )
        .unwrap()
    }

    fn vertex_config(server: &MockServer, dimension: usize) -> VertexConfig {
        VertexConfig {
            base_url: Some(server.uri()),
            dimension,
            timeout: Duration::from_secs(2),
            ..VertexConfig::new("demo-project", "token")
        }
    }

    const PREDICT_PATH: &str =
        "/v1/projects/demo-project/locations/us-central1/publishers/google/models/textembedding-gecko@003:predict";

    #[test]
    fn test_hash_embedder_deterministic_unit_length() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_text("Rich European country").unwrap();
        let b = embedder.embed_text("rich european country").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dim(), 64);
        let norm: f32 = a.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedder_rejects_blank() {
        assert!(matches!(HashEmbedder::default().embed_text("   "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_describe_country() {
        let text = describe_country(&germany());
        assert!(text.starts_with("Country: Germany\nRegion: Europe\nCapital: Berlin\n"));
        assert!(text.contains("GDP per capita: $46259\n"));
        assert!(text.contains("Unemployment rate: 3.2%\n"));
        assert!(!text.contains("Happiness score"));
        assert!(text.contains("Economic development level: upper middle income economy"));
        assert!(text.contains("Environmental impact: moderate carbon emissions"));
        assert!(text.ends_with("Social development: high human development"));
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(economic_level(50000.0), "upper middle income economy");
        assert_eq!(economic_level(3000.0), "low income developing economy");
        assert_eq!(environmental_level(4.0), "very low carbon emissions");
        assert_eq!(environmental_level(15.1), "high carbon emissions");
        assert_eq!(social_level(51.0, 60.0), "low human development");
        assert_eq!(social_level(68.0, 70.0), "medium human development");
    }

    #[test]
    fn test_predict_url() {
        let config = VertexConfig::new("p1", "t");
        assert_eq!(
            config.predict_url(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/p1/locations/us-central1/publishers/google/models/textembedding-gecko@003:predict"
        );
    }

    #[tokio::test]
    async fn test_vertex_embed_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{ "embeddings": { "values": [0.1, 0.2, 0.3, 0.4] } }]
            })))
            .mount(&server)
            .await;

        let client = VertexEmbeddingClient::new(vertex_config(&server, 4)).unwrap();
        let embedding = client.embed("a wealthy island nation").await.unwrap();
        assert_eq!(embedding.as_slice(), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(client.model_id(), DEFAULT_VERTEX_MODEL);
    }

    #[tokio::test]
    async fn test_vertex_wrong_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{ "embeddings": { "values": [0.1, 0.2] } }]
            })))
            .mount(&server)
            .await;

        let client = VertexEmbeddingClient::new(vertex_config(&server, 768)).unwrap();
        let err = client.embed("text").await.unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_vertex_http_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = VertexEmbeddingClient::new(vertex_config(&server, 4)).unwrap();
        let err = client.embed("text").await.unwrap_err();
        assert!(err.is_upstream());
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_vertex_empty_predictions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "predictions": [] })))
            .mount(&server)
            .await;

        let client = VertexEmbeddingClient::new(vertex_config(&server, 4)).unwrap();
        assert!(client.embed("text").await.unwrap_err().is_upstream());
    }
}
