use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Dimension produced by the configured text embedding model.
/// Stored embeddings and query embeddings must agree on it.
pub const EMBEDDING_DIM: usize = 768;

/// An embedding vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Embedding {
    data: Vec<f32>,
}

impl Embedding {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// Cosine similarity with another embedding
    #[inline]
    pub fn cosine_similarity(&self, other: &Embedding) -> Result<f32> {
        cosine(&self.data, &other.data)
    }

    /// Fail unless the embedding has exactly `expected` dimensions
    pub fn ensure_dim(&self, expected: usize) -> Result<()> {
        validate_embedding_dim(&self.data, expected)
    }

    /// Normalize the vector to unit length. Zero vectors are left as is.
    #[inline]
    pub fn normalize(&mut self) {
        let n = norm(&self.data);
        if n > f32::EPSILON {
            let inv = 1.0 / n;
            for x in &mut self.data {
                *x *= inv;
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut v = self.clone();
        v.normalize();
        v
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm(a: &[f32]) -> f32 {
    dot_product(a, a).sqrt()
}

/// `dot(a,b) / (|a| * |b|)`, accumulated in f64 and clamped to `[-1, 1]`.
///
/// Lengths must match (`DimensionMismatch` otherwise, never truncated or
/// padded). A zero or non-finite norm, or a non-finite quotient, is
/// `UndefinedSimilarity`.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (mut dot, mut sq_a, mut sq_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        sq_a += x * x;
        sq_b += y * y;
    }

    let norm_a = sq_a.sqrt();
    let norm_b = sq_b.sqrt();
    if norm_a == 0.0 || norm_b == 0.0 || !norm_a.is_finite() || !norm_b.is_finite() {
        return Err(Error::UndefinedSimilarity);
    }

    // Divide by each norm separately so the denominator cannot overflow.
    let similarity = dot / norm_a / norm_b;
    if !similarity.is_finite() {
        return Err(Error::UndefinedSimilarity);
    }
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

pub fn validate_embedding_dim(v: &[f32], expected: usize) -> Result<()> {
    if v.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: v.len(),
        });
    }
    Ok(())
}
