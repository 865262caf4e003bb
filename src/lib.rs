//! # countrysim
//!
//! Find countries similar to a reference country, or to a free-text
//! description, from socio-economic indicators.
//!
//! Results come from vector search over text embeddings when the embedding
//! and vector-index services answer, and from a deterministic weighted
//! indicator scorer when they don't.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! countrysim --http-port 5000 --seed
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use countrysim::prelude::*;
//!
//! let store = CountryStore::in_memory();
//! store.seed(sample_countries()).unwrap();
//!
//! let germany = IndicatorVector::from_country(&store.find_reference("DE").unwrap()).unwrap();
//! let candidates: Vec<IndicatorVector> = store
//!     .snapshot()
//!     .iter()
//!     .filter_map(|c| IndicatorVector::from_country(c).ok())
//!     .collect();
//!
//! let ranked = RankingEngine::default().rank(&germany, &candidates, 5, Some("Germany"));
//! assert_eq!(ranked.len(), 5);
//! assert!(ranked.iter().all(|r| r.name() != "Germany"));
//! ```
//!
//! ## Crate Structure
//!
//! - `countrysim-core` - Data model and error taxonomy
//! - `countrysim-similarity` - Weighted scorer, reason tags, ranking engine
//! - `countrysim-storage` - Country store with snapshot persistence
//! - `countrysim-gateway` - Embedding and vector-search providers, search with fallback
//! - `countrysim-api` - REST API

pub mod config;

pub use config::ServerConfig;

// Re-export core types
pub use countrysim_core::{
    Country, CountryView, Embedding, Error, Indicator, IndicatorVector, Indicators, NewCountry,
    Result,
};

// Re-export the scoring core
pub use countrysim_similarity::{
    RankedResult, RankingEngine, RatioScorer, RelativeDifferenceScorer, SimilarityResult,
    SimilarityScorer, WeightTable,
};

// Re-export storage
pub use countrysim_storage::{sample_countries, CountryStore, ListQuery};

// Re-export gateways
pub use countrysim_gateway::{
    EmbeddingProvider, HashEmbedder, InMemoryVectorIndex, SearchRequest, SearchTarget,
    SimilaritySearchService, VectorIndexProvider,
};

// Re-export API
pub use countrysim_api::{AppState, RestApi};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        sample_countries, Country, CountryStore, Error, HashEmbedder, Indicator, IndicatorVector,
        Indicators, InMemoryVectorIndex, NewCountry, RankingEngine, Result, SearchRequest,
        SearchTarget, SimilarityScorer, SimilaritySearchService,
    };
}
