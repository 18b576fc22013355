use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use dashmap::DashMap;
use lensprint::{EngravingMatcher, ImageEmbedder, PredictionMonitor, ReferenceIndex, StubEmbedder};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: client key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, std::time::Instant)>>,

    /// Matcher over the reference index (read-only, shared across requests)
    pub matcher: Arc<EngravingMatcher>,

    /// Prediction monitor (serialized mutation, shared across requests)
    pub monitor: Arc<PredictionMonitor>,
}

impl ServerState {
    /// Create server state with the deterministic stub embedder.
    ///
    /// Only used when no snapshot is configured; production deployments
    /// should either configure `matching.snapshot_path` or call
    /// [`ServerState::with_embedder`] with the real model.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let embedder = StubEmbedder::new(config.matching.embedding_dim);
        Self::with_embedder(config, &embedder)
    }

    /// Create server state, building the reference index from the configured
    /// snapshot when present, otherwise from the reference tree via
    /// `embedder`.
    pub fn with_embedder(
        config: ServerConfig,
        embedder: &dyn ImageEmbedder,
    ) -> ServerResult<Self> {
        let index = match &config.matching.snapshot_path {
            Some(path) if path.is_file() => {
                tracing::info!(path = %path.display(), "loading reference snapshot");
                ReferenceIndex::load_snapshot(path)?
            }
            _ => {
                tracing::info!(root = %config.matching.reference_root.display(), "building reference index");
                ReferenceIndex::build(&config.matching.reference_root, embedder)?
            }
        };

        if index.is_empty() {
            return Err(ServerError::Config(
                "reference index is empty; nothing to match against".to_string(),
            ));
        }

        let monitor = PredictionMonitor::new(config.monitor.clone())?;

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            matcher: Arc::new(EngravingMatcher::new(index)),
            monitor: Arc::new(monitor),
        })
    }

    /// Check rate limit for a client key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = std::time::Instant::now();
        let window = std::time::Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        // Check limit
        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}
