//! # countrysim Similarity
//!
//! Deterministic indicator similarity for countries.
//!
//! This crate holds the scoring core used when vector search is unavailable,
//! plus the pieces every search result goes through.
//!
//! ## Features
//!
//! - **Weight tables**: weights are data, keyed by [`Indicator`](countrysim_core::Indicator)
//! - **Two scorers**: ratio similarity (default) and floored relative difference
//! - **Reason tags**: a fixed rule cascade explaining each result in words
//! - **Ranking**: stable top-K over a candidate snapshot, with exclusion
//! - **Explainability**: per-indicator contributions and search statistics
//!
//! ## Example
//!
//! ```rust
//! use countrysim_core::{Indicators, IndicatorVector};
//! use countrysim_similarity::RankingEngine;
//!
//! let germany = IndicatorVector::new(
//!     "Germany", "DE", "Europe", "Berlin",
//!     Indicators::new(46259.0, 81.3, 92.0, 9.4, 83.0),
//! ).unwrap();
//! let japan = IndicatorVector::new(
//!     "Japan", "JP", "Asia", "Tokyo",
//!     Indicators::new(39285.0, 84.6, 91.0, 8.8, 125.0),
//! ).unwrap();
//!
//! let engine = RankingEngine::default();
//! let ranked = engine.rank(&germany, &[germany.clone(), japan], 5, Some("Germany"));
//! assert_eq!(ranked[0].name(), "Japan");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ WeightTable │────>│   Scorer    │────>│  Ranking    │
//! │ (indicator) │     │ (a, b → s)  │     │  (top-K)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  Reasons    │────>│  Explain    │
//!                     │  (cascade)  │     │  (results)  │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod distance;
pub mod explain;
pub mod rank;
pub mod reasons;
pub mod scorer;
pub mod weights;

pub use explain::{SearchStats, SimilarityResult};
pub use rank::{RankedResult, RankingEngine};
pub use reasons::{reasons, reasons_for, MAX_REASONS};
pub use scorer::{
    RatioScorer, RelativeDifferenceScorer, ScoreBreakdown, ScoringStrategy, SimilarityScorer,
};
pub use weights::{WeightError, WeightTable};
