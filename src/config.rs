//! Command line and environment configuration

use clap::Parser;
use countrysim_core::{Error, Result, EMBEDDING_DIM};
use countrysim_similarity::{RankingEngine, ScoringStrategy};
use countrysim_gateway::{
    AtlasConfig, AtlasVectorIndex, EmbeddingProvider, HashEmbedder, InMemoryVectorIndex,
    RetryConfig, SimilaritySearchService, VectorIndexProvider, VertexConfig,
    VertexEmbeddingClient, DEFAULT_INDEX_NAME,
};
use countrysim_storage::CountryStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

/// Country similarity service
#[derive(Parser, Debug, Clone)]
#[command(name = "countrysim")]
#[command(about = "Find similar countries from socio-economic indicators", long_about = None)]
pub struct ServerConfig {
    /// Path to the data directory
    #[arg(short, long, env = "COUNTRYSIM_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// HTTP bind address
    #[arg(long, env = "COUNTRYSIM_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP API port
    #[arg(long, env = "COUNTRYSIM_HTTP_PORT", default_value_t = 5000)]
    pub http_port: u16,

    /// Log level
    #[arg(long, env = "COUNTRYSIM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Load the built-in sample countries when the store is empty
    #[arg(long, env = "COUNTRYSIM_SEED")]
    pub seed: bool,

    /// Seconds between background snapshot saves, 0 disables them
    #[arg(long, env = "COUNTRYSIM_AUTOSAVE_SECS", default_value_t = 60)]
    pub autosave_secs: u64,

    /// Directory with a static frontend served at `/`
    #[arg(long, env = "COUNTRYSIM_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Timeout for calls to external services, in seconds
    #[arg(long, env = "COUNTRYSIM_UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Embedding width
    #[arg(long, env = "COUNTRYSIM_EMBEDDING_DIM", default_value_t = EMBEDDING_DIM)]
    pub embedding_dim: usize,

    /// Indicator scorer for reference searches: ratio or relative_difference
    #[arg(long, env = "COUNTRYSIM_SCORING_STRATEGY", default_value = "ratio")]
    pub scoring_strategy: ScoringStrategy,

    #[arg(long, env = "COUNTRYSIM_VERTEX_PROJECT")]
    pub vertex_project: Option<String>,

    #[arg(long, env = "COUNTRYSIM_VERTEX_LOCATION", default_value = "us-central1")]
    pub vertex_location: String,

    #[arg(long, env = "COUNTRYSIM_VERTEX_MODEL", default_value = "textembedding-gecko@003")]
    pub vertex_model: String,

    /// OAuth access token for Vertex AI
    #[arg(long, env = "COUNTRYSIM_VERTEX_TOKEN", hide_env_values = true)]
    pub vertex_token: Option<String>,

    /// Override of the Vertex AI endpoint base URL
    #[arg(long, env = "COUNTRYSIM_VERTEX_BASE_URL")]
    pub vertex_base_url: Option<String>,

    /// Atlas Data API base URL
    #[arg(long, env = "COUNTRYSIM_ATLAS_URL")]
    pub atlas_url: Option<String>,

    #[arg(long, env = "COUNTRYSIM_ATLAS_API_KEY", hide_env_values = true)]
    pub atlas_api_key: Option<String>,

    #[arg(long, env = "COUNTRYSIM_ATLAS_DATA_SOURCE", default_value = "Cluster0")]
    pub atlas_data_source: String,

    #[arg(long, env = "COUNTRYSIM_ATLAS_DATABASE", default_value = "countrysim")]
    pub atlas_database: String,

    #[arg(long, env = "COUNTRYSIM_ATLAS_COLLECTION", default_value = "countries")]
    pub atlas_collection: String,

    #[arg(long, env = "COUNTRYSIM_ATLAS_INDEX", default_value = DEFAULT_INDEX_NAME)]
    pub atlas_index: String,
}

impl ServerConfig {
    pub fn log_level(&self) -> Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_secs > 0).then(|| Duration::from_secs(self.autosave_secs))
    }

    /// Vertex AI when project and token are set, the offline hash embedder otherwise
    pub fn build_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match (non_empty(&self.vertex_project), non_empty(&self.vertex_token)) {
            (Some(project), Some(token)) => {
                let mut config = VertexConfig::new(project, token);
                config.location = self.vertex_location.clone();
                config.model = self.vertex_model.clone();
                config.base_url = non_empty(&self.vertex_base_url).map(str::to_string);
                config.timeout = self.upstream_timeout();
                config.dimension = self.embedding_dim;
                info!(model = %config.model, location = %config.location, "using Vertex AI embeddings");
                Ok(Arc::new(VertexEmbeddingClient::new(config)?))
            }
            (Some(_), None) | (None, Some(_)) => Err(Error::InvalidConfig(
                "Vertex AI needs both a project and an access token".to_string(),
            )),
            (None, None) => {
                info!(dim = self.embedding_dim, "using local hash embeddings");
                Ok(Arc::new(HashEmbedder::new(self.embedding_dim)))
            }
        }
    }

    /// Atlas when URL and key are set, an in-process cosine scan otherwise
    pub fn build_vector_index(&self, store: Arc<CountryStore>) -> Result<Arc<dyn VectorIndexProvider>> {
        match (non_empty(&self.atlas_url), non_empty(&self.atlas_api_key)) {
            (Some(url), Some(key)) => {
                let config = AtlasConfig {
                    data_api_url: url.to_string(),
                    api_key: key.to_string(),
                    data_source: self.atlas_data_source.clone(),
                    database: self.atlas_database.clone(),
                    collection: self.atlas_collection.clone(),
                    index_name: self.atlas_index.clone(),
                    timeout: self.upstream_timeout(),
                    dimension: self.embedding_dim,
                };
                info!(database = %config.database, collection = %config.collection, "using Atlas vector search");
                Ok(Arc::new(AtlasVectorIndex::new(config)?))
            }
            (Some(_), None) | (None, Some(_)) => Err(Error::InvalidConfig(
                "Atlas vector search needs both a Data API URL and an API key".to_string(),
            )),
            (None, None) => {
                info!("using in-memory vector index");
                Ok(Arc::new(InMemoryVectorIndex::new(store).with_dimension(self.embedding_dim)))
            }
        }
    }

    pub fn build_search_service(&self, store: Arc<CountryStore>) -> Result<SimilaritySearchService> {
        let embedder = self.build_embedder()?;
        let index = self.build_vector_index(Arc::clone(&store))?;
        info!(strategy = ?self.scoring_strategy, "indicator scoring strategy");
        Ok(SimilaritySearchService::new(store, embedder, index)
            .with_ranking(RankingEngine::with_strategy(self.scoring_strategy)))
    }

    /// Retry policy for embedding refreshes triggered through the admin API
    pub fn refresh_retry(&self) -> RetryConfig {
        RetryConfig::for_transient_errors()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["countrysim"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.http_port, 5000);
        assert_eq!(config.log_level(), Level::INFO);
        assert_eq!(config.autosave_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.embedding_dim, EMBEDDING_DIM);
        assert_eq!(config.scoring_strategy, ScoringStrategy::Ratio);
    }

    #[test]
    fn test_scoring_strategy_selects_scorer() {
        let config = parse(&["--scoring-strategy", "relative-difference"]);
        assert_eq!(config.scoring_strategy, ScoringStrategy::RelativeDifference);

        let service = config
            .build_search_service(Arc::new(CountryStore::in_memory()))
            .unwrap();
        assert_eq!(service.ranking().scorer().name(), "relative_difference");

        let service = parse(&[])
            .build_search_service(Arc::new(CountryStore::in_memory()))
            .unwrap();
        assert_eq!(service.ranking().scorer().name(), "ratio");

        assert!(ServerConfig::try_parse_from(["countrysim", "--scoring-strategy", "cosine"]).is_err());
    }

    #[test]
    fn test_log_level_and_autosave() {
        let config = parse(&["--log-level", "DEBUG", "--autosave-secs", "0"]);
        assert_eq!(config.log_level(), Level::DEBUG);
        assert_eq!(config.autosave_interval(), None);

        let config = parse(&["--log-level", "chatty"]);
        assert_eq!(config.log_level(), Level::INFO);
    }

    #[test]
    fn test_local_providers_by_default() {
        let config = parse(&["--embedding-dim", "64"]);
        let embedder = config.build_embedder().unwrap();
        assert_eq!(embedder.dimension(), 64);

        let index = config.build_vector_index(Arc::new(CountryStore::in_memory())).unwrap();
        assert_eq!(index.name(), "in_memory");
    }

    #[test]
    fn test_remote_providers_when_configured() {
        let config = parse(&[
            "--vertex-project",
            "demo",
            "--vertex-token",
            "secret",
            "--atlas-url",
            "https://data.example.com/app/x/endpoint/data/v1",
            "--atlas-api-key",
            "key",
        ]);
        let embedder = config.build_embedder().unwrap();
        assert_eq!(embedder.model_id(), "textembedding-gecko@003");

        let index = config.build_vector_index(Arc::new(CountryStore::in_memory())).unwrap();
        assert_eq!(index.name(), "atlas");
    }

    #[test]
    fn test_half_configured_provider_rejected() {
        let config = parse(&["--vertex-project", "demo"]);
        assert!(matches!(config.build_embedder(), Err(Error::InvalidConfig(_))));

        let config = parse(&["--atlas-api-key", "key"]);
        assert!(matches!(
            config.build_vector_index(Arc::new(CountryStore::in_memory())),
            Err(Error::InvalidConfig(_))
        ));
    }
}
