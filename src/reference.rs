//! The reference catalog: one exemplar embedding per engraving class.
//!
//! Built once at startup from `<root>/<class>/<class>.png` and read-only for
//! the process lifetime. Entry order (sorted class directory names, or
//! snapshot order) is part of the matching contract: it is the tie-break for
//! equal similarities.

use crate::embed::{EmbedError, ImageEmbedder};
use crate::embedding::Embedding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors produced while building or loading the reference index.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference root {0} does not exist or is not a directory")]
    MissingRoot(String),
    #[error("failed to scan reference root: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error("duplicate reference class {0}")]
    DuplicateClass(String),
    #[error("embedding for class {class} has dimension {actual}, index uses {expected}")]
    DimensionMismatch {
        class: String,
        expected: usize,
        actual: usize,
    },
    #[error("failed to parse snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One labeled exemplar embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "class")]
    pub class_label: String,
    pub embedding: Embedding,
}

/// In-memory label → exemplar embedding catalog.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceIndex {
    /// Build from a directory tree, embedding exactly `<class>/<class>.png`
    /// per class. Classes without that exemplar file are skipped; a missing
    /// root is fatal; embedder failures propagate.
    pub fn build(root: &Path, embedder: &dyn ImageEmbedder) -> Result<Self, ReferenceError> {
        if !root.is_dir() {
            return Err(ReferenceError::MissingRoot(root.display().to_string()));
        }

        let mut class_dirs: Vec<_> = fs::read_dir(root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        class_dirs.sort();

        let mut entries = Vec::new();
        for dir in class_dirs {
            let Some(class) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let exemplar = dir.join(format!("{class}.png"));
            if !exemplar.is_file() {
                tracing::debug!(class, "no canonical exemplar, class skipped");
                continue;
            }
            let embedding = embedder.embed_image(&exemplar)?;
            entries.push(ReferenceEntry {
                class_label: class.to_string(),
                embedding,
            });
        }

        tracing::info!(classes = entries.len(), "reference index built");
        Self::from_entries(entries)
    }

    /// Assemble from pre-built entries, preserving their order. Rejects
    /// duplicate labels and mixed dimensions.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Result<Self, ReferenceError> {
        let mut dim: Option<usize> = None;
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i]
                .iter()
                .any(|other| other.class_label == entry.class_label)
            {
                return Err(ReferenceError::DuplicateClass(entry.class_label.clone()));
            }
            match dim {
                None => dim = Some(entry.embedding.dim()),
                Some(expected) if expected != entry.embedding.dim() => {
                    return Err(ReferenceError::DimensionMismatch {
                        class: entry.class_label.clone(),
                        expected,
                        actual: entry.embedding.dim(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimension, `None` for an empty index.
    pub fn dim(&self) -> Option<usize> {
        self.entries.first().map(|e| e.embedding.dim())
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn get(&self, class_label: &str) -> Option<&Embedding> {
        self.entries
            .iter()
            .find(|e| e.class_label == class_label)
            .map(|e| &e.embedding)
    }

    /// Serialize the whole index to a JSON snapshot, atomically. Lets server
    /// deployments start without the embedding model.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), ReferenceError> {
        let json = serde_json::to_vec_pretty(&self.entries).map_err(|source| {
            ReferenceError::Snapshot {
                path: path.display().to_string(),
                source,
            }
        })?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load a snapshot written by [`save_snapshot`](Self::save_snapshot),
    /// preserving entry order.
    pub fn load_snapshot(path: &Path) -> Result<Self, ReferenceError> {
        let bytes = fs::read(path)?;
        let entries: Vec<ReferenceEntry> =
            serde_json::from_slice(&bytes).map_err(|source| ReferenceError::Snapshot {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_entries(entries)
    }
}
