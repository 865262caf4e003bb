//! # countrysim Core
//!
//! Core data model for the countrysim service.
//!
//! - [`Country`] - A persisted country record with indicators and an optional embedding
//! - [`Indicators`] / [`Indicator`] - Socio-economic measurements and their bounds
//! - [`IndicatorVector`] - Validated, immutable view used by the similarity scorers
//! - [`Embedding`] - Fixed-length text embedding with cosine similarity
//! - [`Error`] - The error taxonomy shared by every crate in the workspace
//!
//! ## Example
//!
//! ```rust
//! use countrysim_core::{Indicators, IndicatorVector, Indicator};
//!
//! let indicators = Indicators::new(46259.0, 81.3, 92.0, 9.4, 83.0);
//! let vector = IndicatorVector::new("Germany", "DE", "Europe", "Berlin", indicators).unwrap();
//! assert_eq!(vector.get(Indicator::Education), Some(92.0));
//! ```

pub mod country;
pub mod error;
pub mod indicators;
pub mod vector;

pub use country::{Country, CountryView, Metadata, NewCountry, DEFAULT_DATA_SOURCE};
pub use error::{Error, Result, ValidationError};
pub use indicators::{Indicator, IndicatorVector, Indicators};
pub use vector::{cosine, validate_embedding_dim, Embedding, EMBEDDING_DIM};
