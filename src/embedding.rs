//! Fixed-length embedding vectors and the similarity math used everywhere else.
//!
//! An [`Embedding`] is an immutable `Vec<f32>` wrapper. Code paths that promise
//! unit-norm output (the embedder trait, the stub embedder) go through
//! [`Embedding::unit_from`], which normalizes and enforces the invariant
//! `|‖e‖ − 1| < NORM_TOLERANCE`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum deviation from 1.0 tolerated for a vector to count as unit-norm.
pub const NORM_TOLERANCE: f32 = 1e-5;

/// Errors produced while constructing or combining embeddings.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding must not be empty")]
    Empty,
    #[error("embedding component {index} is not finite")]
    NonFinite { index: usize },
    #[error("cannot normalize an all-zero embedding")]
    ZeroNorm,
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// A fixed-length vector of reals representing one image in the learned space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Wrap raw model output. Rejects empty vectors and non-finite components;
    /// does not require or impose unit norm.
    pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        if values.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(EmbeddingError::NonFinite { index });
        }
        Ok(Self(values))
    }

    /// Wrap and L2-normalize. This is the constructor every normalizing code
    /// path uses, so the unit-norm invariant holds wherever it matters.
    pub fn unit_from(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        let raw = Self::new(values)?;
        let norm = raw.norm();
        if norm == 0.0 {
            return Err(EmbeddingError::ZeroNorm);
        }
        Ok(Self(raw.0.into_iter().map(|v| v / norm).collect()))
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }

    /// L2 norm.
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    pub fn is_unit(&self) -> bool {
        (self.norm() - 1.0).abs() < NORM_TOLERANCE
    }

    fn check_dim(&self, other: &Self) -> Result<(), EmbeddingError> {
        if self.dim() != other.dim() {
            return Err(EmbeddingError::DimensionMismatch {
                left: self.dim(),
                right: other.dim(),
            });
        }
        Ok(())
    }

    pub fn dot(&self, other: &Self) -> Result<f32, EmbeddingError> {
        self.check_dim(other)?;
        Ok(self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum())
    }

    /// Cosine similarity in [-1, 1]. Degenerate zero-norm inputs score 0.0
    /// rather than NaN so ranking stays total.
    pub fn cosine(&self, other: &Self) -> Result<f32, EmbeddingError> {
        let dot = self.dot(other)?;
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return Ok(0.0);
        }
        Ok(dot / denom)
    }

    /// Squared Euclidean distance, the quantity the triplet loss operates on.
    pub fn squared_distance(&self, other: &Self) -> Result<f32, EmbeddingError> {
        self.check_dim(other)?;
        Ok(self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum())
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
