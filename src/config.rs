//! Serde-deserializable configuration for the identification core.
//!
//! All structs are default-driven so a partial file or environment source
//! only has to name the knobs it changes.

use crate::loss::{LossError, MiningStrategy, TripletLoss};
use crate::matcher::DEFAULT_TOP_K;
use crate::monitor::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Training-side knobs: margin, mining strategy, batch size, dataset layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_margin")]
    pub margin: f32,

    #[serde(default)]
    pub mining: MiningStrategy,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Root of the `<class>/*.png` training tree.
    #[serde(default = "default_dataset_root")]
    pub dataset_root: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            mining: MiningStrategy::default(),
            batch_size: default_batch_size(),
            dataset_root: default_dataset_root(),
        }
    }
}

impl TrainingConfig {
    /// Build the configured loss, validating the margin.
    pub fn loss(&self) -> Result<TripletLoss, LossError> {
        TripletLoss::new(self.margin, self.mining)
    }
}

/// Matching-side knobs: where the reference catalog lives and how queries
/// are answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Root of the `<class>/<class>.png` reference tree.
    #[serde(default = "default_reference_root")]
    pub reference_root: PathBuf,

    /// Optional precomputed index snapshot. When set and present it is
    /// loaded instead of embedding the reference tree, so the serving path
    /// needs no model.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Default `k` for match requests that do not specify one.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Expected embedding dimension.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            reference_root: default_reference_root(),
            snapshot_path: None,
            top_k: default_top_k(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

/// Top-level configuration for the whole identification core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LensprintConfig {
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

fn default_margin() -> f32 {
    TripletLoss::DEFAULT_MARGIN
}

fn default_batch_size() -> usize {
    32
}

fn default_dataset_root() -> PathBuf {
    PathBuf::from("data/train")
}

fn default_reference_root() -> PathBuf {
    PathBuf::from("data/references")
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_embedding_dim() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_line_up() {
        let cfg = LensprintConfig::default();
        assert_eq!(cfg.training.margin, 0.3);
        assert_eq!(cfg.training.mining, MiningStrategy::SemiHard);
        assert_eq!(cfg.training.batch_size, 32);
        assert_eq!(cfg.matching.top_k, 5);
        assert_eq!(cfg.matching.embedding_dim, 256);
        assert_eq!(cfg.monitor.window_size, 1000);
        assert_eq!(cfg.monitor.pending_capacity, 10);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: LensprintConfig =
            serde_json::from_str(r#"{"training": {"margin": 0.5, "mining": "all"}}"#).unwrap();
        assert_eq!(cfg.training.margin, 0.5);
        assert_eq!(cfg.training.mining, MiningStrategy::All);
        assert_eq!(cfg.training.batch_size, 32);
        assert_eq!(cfg.matching.top_k, 5);
    }

    #[test]
    fn training_config_builds_a_loss() {
        let cfg = TrainingConfig::default();
        let loss = cfg.loss().unwrap();
        assert_eq!(loss.margin(), 0.3);

        let bad = TrainingConfig {
            margin: -1.0,
            ..Default::default()
        };
        assert!(bad.loss().is_err());
    }
}
