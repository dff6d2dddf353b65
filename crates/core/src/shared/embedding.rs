use serde::Serialize;
use thiserror::Error;

use crate::shared::constants::EMBEDDING_DIM;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("expected {EMBEDDING_DIM} components, got {0}")]
    Dimension(usize),
    #[error("embedding contains a non-finite component")]
    NonFinite,
    #[error("stored encoding is not a flat numeric array: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A face embedding of exactly [`EMBEDDING_DIM`] finite components.
///
/// The length invariant is enforced at construction, so distance
/// computations between two embeddings never need to check shapes.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f64>);

impl Embedding {
    pub fn new(values: Vec<f64>) -> Result<Self, EmbeddingError> {
        if values.len() != EMBEDDING_DIM {
            return Err(EmbeddingError::Dimension(values.len()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite);
        }
        Ok(Self(values))
    }

    /// Decodes a stored encoding such as `"[0.12, -0.03, ...]"`.
    ///
    /// Nested arrays, non-numeric entries and wrong lengths are all
    /// rejected; nothing is coerced.
    pub fn from_json(text: &str) -> Result<Self, EmbeddingError> {
        let values: Vec<f64> = serde_json::from_str(text)?;
        Self::new(values)
    }

    /// Widens a model output, which is typically `f32`.
    pub fn from_f32(values: &[f32]) -> Result<Self, EmbeddingError> {
        Self::new(values.iter().map(|&v| v as f64).collect())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn euclidean_distance(&self, other: &Embedding) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}
