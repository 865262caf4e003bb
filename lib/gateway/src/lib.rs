//! # countrysim Gateway
//!
//! Upstream collaborators of the similarity service and the search flow that
//! ties them together.
//!
//! - [`EmbeddingProvider`]: text to vector ([`VertexEmbeddingClient`], [`HashEmbedder`])
//! - [`VectorIndexProvider`]: nearest neighbours ([`AtlasVectorIndex`], [`InMemoryVectorIndex`])
//! - [`SimilaritySearchService`]: vector search first, deterministic fallback second
//!
//! Providers are built once at startup and shared as `Arc<dyn Trait>`, so
//! tests can swap in fakes.

pub mod embedding;
pub mod http;
pub mod retry;
pub mod search;
pub mod vector_index;

pub use embedding::{describe_country, EmbeddingProvider, HashEmbedder, VertexConfig, VertexEmbeddingClient};
pub use retry::{with_retry, RetryConfig};
pub use search::{
    RefreshReport, SearchEngine, SearchMethod, SearchOutcome, SearchRequest, SearchTarget,
    SimilaritySearchService, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
pub use vector_index::{
    cosine_scan, vector_index_definition, AtlasConfig, AtlasVectorIndex, InMemoryVectorIndex,
    VectorHit, VectorIndexProvider, DEFAULT_INDEX_NAME,
};
