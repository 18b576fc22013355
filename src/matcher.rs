//! Brute-force cosine matcher over the reference index.
//!
//! Exact linear scan, O(n) per query over n reference classes. At tens to low
//! hundreds of classes this beats any index structure; an ANN backend could
//! slot in behind the same `match_embedding` contract if the catalog ever
//! grows past that.

use crate::embedding::{Embedding, EmbeddingError};
use crate::reference::ReferenceIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Default number of ranked guesses per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Errors produced by the matching layer.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("query has dimension {query}, reference index uses {reference}")]
    DimensionMismatch { query: usize, reference: usize },
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// One ranked class guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    #[serde(rename = "class")]
    pub class_label: String,
    pub similarity: f32,
}

/// Ranks reference entries against query embeddings.
///
/// Read-only after construction; safe to share across concurrent readers via
/// `Arc` without locking.
#[derive(Debug, Clone)]
pub struct EngravingMatcher {
    index: ReferenceIndex,
}

impl EngravingMatcher {
    pub fn new(index: ReferenceIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// Return the top `k` reference classes by cosine similarity, descending.
    ///
    /// Equal similarities keep the index's insertion order: the sort is
    /// stable, and that tie-break is part of the contract. An empty index
    /// yields an empty result.
    pub fn match_embedding(
        &self,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<RankedMatch>, MatchError> {
        if let Some(reference_dim) = self.index.dim() {
            if query.dim() != reference_dim {
                return Err(MatchError::DimensionMismatch {
                    query: query.dim(),
                    reference: reference_dim,
                });
            }
        }

        let mut scored = Vec::with_capacity(self.index.len());
        for entry in self.index.entries() {
            let similarity = query.cosine(&entry.embedding)?;
            scored.push(RankedMatch {
                class_label: entry.class_label.clone(),
                similarity,
            });
        }

        // Stable descending sort; ties retain insertion order.
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}
