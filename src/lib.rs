//! # lensprint
//!
//! Identification core for optical-lens engravings: a learned embedding of a
//! query photograph is ranked against a small catalog of labeled reference
//! embeddings, and every prediction can later be confirmed or corrected by a
//! human so real-world accuracy is tracked continuously.
//!
//! The crate covers four concerns:
//!
//! - **Training signal** — [`dataset::TripletSampler`] draws (anchor,
//!   positive, negative) image triples and [`loss::TripletLoss`] scores
//!   embedded batches with in-batch mining.
//! - **Reference catalog** — [`reference::ReferenceIndex`] holds one exemplar
//!   embedding per class, built from a directory tree or a JSON snapshot.
//! - **Matching** — [`matcher::EngravingMatcher`] ranks the catalog against a
//!   query embedding by cosine similarity (exact brute-force top-k).
//! - **Monitoring** — [`monitor::PredictionMonitor`] turns raw predictions
//!   into validated records and rolling metrics reports.
//!
//! The embedding model itself is an external collaborator behind
//! [`embed::ImageEmbedder`]; [`embed::StubEmbedder`] is a deterministic
//! stand-in for tests and snapshot-serving deployments.

pub mod config;
pub mod dataset;
pub mod embed;
pub mod embedding;
pub mod loss;
pub mod matcher;
pub mod monitor;
pub mod reference;

pub use config::{LensprintConfig, MatchingConfig, TrainingConfig};
pub use dataset::{DatasetError, TripletCatalog, TripletPaths, TripletSampler};
pub use embed::{EmbedError, ImageEmbedder, StubEmbedder};
pub use embedding::{Embedding, EmbeddingError, NORM_TOLERANCE};
pub use loss::{LossError, MiningStrategy, TripletLoss};
pub use matcher::{EngravingMatcher, MatchError, RankedMatch, DEFAULT_TOP_K};
pub use monitor::{
    MetricsReport, MonitorConfig, MonitorError, PredictionDraft, PredictionId,
    PredictionMonitor, ValidatedPrediction,
};
pub use reference::{ReferenceEntry, ReferenceError, ReferenceIndex};
