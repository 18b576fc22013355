//! The seam to the embedding generator.
//!
//! The trained model lives outside this crate; all the core needs is the
//! output contract captured by [`ImageEmbedder`]: a fixed dimension and
//! L2-normalized vectors, deterministic for identical input.
//!
//! [`StubEmbedder`] is a dependency-free implementation that derives a
//! reproducible unit vector from a hash of the raw image bytes. It exists for
//! tests and for deployments that serve a precomputed reference snapshot.

use crate::embedding::{Embedding, EmbeddingError};
use fxhash::hash64;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors produced while turning an image file into an embedding.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("failed to read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("embedder produced an invalid vector: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("model inference failed: {0}")]
    Inference(String),
}

/// Opaque `image -> unit-norm vector` function.
///
/// Implementations must return vectors of exactly `embedding_dim()` length
/// with L2 norm 1, and identical output for identical input bytes.
pub trait ImageEmbedder: Send + Sync {
    fn embedding_dim(&self) -> usize;

    fn embed_image(&self, path: &Path) -> Result<Embedding, EmbedError>;
}

/// Deterministic hash-based embedder.
///
/// Generates sinusoid values seeded by a 64-bit hash of the file contents,
/// then normalizes. Two byte-identical images always map to the same vector;
/// distinct images land in effectively unrelated directions.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dim: usize,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Embed raw bytes directly. Useful when the image is already in memory.
    pub fn embed_bytes(&self, bytes: &[u8]) -> Result<Embedding, EmbedError> {
        let h = hash64(bytes);
        let mut values = vec![0f32; self.dim];
        for (idx, value) in values.iter_mut().enumerate() {
            let mixed = h.wrapping_mul(0x9e37_79b9_7f4a_7c15).rotate_left((idx % 64) as u32);
            *value = ((mixed >> 11) as f32 * 1e-4).sin();
        }
        Ok(Embedding::unit_from(values)?)
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ImageEmbedder for StubEmbedder {
    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn embed_image(&self, path: &Path) -> Result<Embedding, EmbedError> {
        let bytes = fs::read(path).map_err(|source| EmbedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.embed_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::NORM_TOLERANCE;
    use std::io::Write;

    #[test]
    fn stub_embedding_has_requested_dim_and_unit_norm() {
        let embedder = StubEmbedder::new(64);
        let e = embedder.embed_bytes(b"engraving pixels").unwrap();
        assert_eq!(e.dim(), 64);
        assert!((e.norm() - 1.0).abs() < NORM_TOLERANCE);
    }

    #[test]
    fn stub_embedding_is_deterministic() {
        let embedder = StubEmbedder::new(32);
        let a = embedder.embed_bytes(b"same bytes").unwrap();
        let b = embedder.embed_bytes(b"same bytes").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_produce_different_vectors() {
        let embedder = StubEmbedder::new(32);
        let a = embedder.embed_bytes(b"varilux").unwrap();
        let b = embedder.embed_bytes(b"essilor").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn embed_image_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"not a real png, content only matters for the hash")
            .unwrap();

        let embedder = StubEmbedder::new(16);
        let e = embedder.embed_image(&path).unwrap();
        assert_eq!(e.dim(), 16);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let embedder = StubEmbedder::new(16);
        let err = embedder
            .embed_image(Path::new("/nonexistent/image.png"))
            .unwrap_err();
        assert!(matches!(err, EmbedError::Io { .. }));
    }
}
