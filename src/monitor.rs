//! Online prediction monitor.
//!
//! Converts raw match predictions into human-validated ground truth and
//! derives rolling accuracy/latency metrics from a bounded window of
//! validated records.
//!
//! Record lifecycle: `pending` → `validated` → evicted from the window once
//! capacity is exceeded; a pending record that is never confirmed is
//! discarded (oldest first) when the pending queue overflows.
//!
//! Every mutating operation runs under one internal mutex, so concurrent
//! record/confirm calls serialize in arrival order. Persistence happens
//! before the confirming call returns: a validation is never acknowledged
//! while its record only exists in memory, and write failures are logged
//! rather than surfaced (the in-memory window stays authoritative).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// Correlation id handed back on every accepted prediction.
pub type PredictionId = Uuid;

const HISTORY_FILE: &str = "predictions_history.jsonl";
/// Consecutive persistence failures before the log level escalates.
const PERSIST_FAILURE_ESCALATION: u32 = 3;

/// Monitor construction errors. Everything past construction is best-effort.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("window_size must be greater than zero")]
    InvalidWindowSize,
    #[error("pending_capacity must be greater than zero")]
    InvalidPendingCapacity,
    #[error("failed to create reports directory {path}: {source}")]
    CreateReportsDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Monitor tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Directory holding the history log and metrics reports.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Capacity of the validated window metrics are computed over.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Capacity of the unvalidated pending queue.
    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            window_size: default_window_size(),
            pending_capacity: default_pending_capacity(),
        }
    }
}

impl MonitorConfig {
    pub fn history_path(&self) -> PathBuf {
        self.reports_dir.join(HISTORY_FILE)
    }
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_window_size() -> usize {
    1000
}

fn default_pending_capacity() -> usize {
    10
}

/// Raw prediction fields as reported by the matching path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionDraft {
    pub timestamp: DateTime<Utc>,
    pub predicted_label: String,
    pub confidence: f64,
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// What the model actually guessed. Filled from `predicted_label` when
    /// absent, so a later correction never erases the original guess.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_prediction: Option<String>,
}

/// An accepted prediction awaiting human confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPrediction {
    pub id: PredictionId,
    pub timestamp: DateTime<Utc>,
    pub predicted_label: String,
    pub confidence: f64,
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub original_prediction: String,
}

/// A prediction whose label has been confirmed or corrected by a human.
///
/// `predicted_label` carries the confirmed label; `original_prediction` the
/// model's first guess; `confidence` stays as originally reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPrediction {
    pub id: PredictionId,
    pub timestamp: DateTime<Utc>,
    pub predicted_label: String,
    pub confidence: f64,
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub original_prediction: String,
    pub validated_at: DateTime<Utc>,
}

/// Rolling metrics derived from the current validated window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub timestamp: DateTime<Utc>,
    pub avg_confidence: f64,
    pub avg_processing_time: f64,
    pub n_predictions: usize,
    pub predictions_per_class: BTreeMap<String, usize>,
    /// Fraction of the window where the human confirmed the model's first
    /// guess. Accuracy against validated labels, not an external truth.
    pub prediction_accuracy: f64,
}

struct MonitorState {
    pending: VecDeque<PendingPrediction>,
    validated: VecDeque<ValidatedPrediction>,
    /// Records currently appended to the history log; drives compaction.
    history_lines: usize,
    consecutive_persist_failures: u32,
}

/// Serialized-mutation service over pending and validated predictions.
///
/// Explicitly constructed and owned by the hosting application; share it via
/// `Arc` and call from as many tasks as needed.
pub struct PredictionMonitor {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
}

impl PredictionMonitor {
    /// Build a monitor, creating the reports directory and replaying any
    /// existing history log (malformed lines are skipped with a warning).
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        if config.window_size == 0 {
            return Err(MonitorError::InvalidWindowSize);
        }
        if config.pending_capacity == 0 {
            return Err(MonitorError::InvalidPendingCapacity);
        }
        fs::create_dir_all(&config.reports_dir).map_err(|source| {
            MonitorError::CreateReportsDir {
                path: config.reports_dir.display().to_string(),
                source,
            }
        })?;

        let (validated, history_lines) = load_history(&config.history_path(), config.window_size);
        if !validated.is_empty() {
            tracing::info!(records = validated.len(), "prediction history restored");
        }

        Ok(Self {
            config,
            state: Mutex::new(MonitorState {
                pending: VecDeque::new(),
                validated,
                history_lines,
                consecutive_persist_failures: 0,
            }),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a raw prediction. Invalid drafts are dropped with a logged
    /// warning and `None`; this is best-effort telemetry, never an error the
    /// match path has to handle. Returns the correlation id on acceptance.
    pub fn record_prediction(&self, draft: PredictionDraft) -> Option<PredictionId> {
        if draft.predicted_label.trim().is_empty() {
            tracing::warn!("prediction dropped: empty predicted_label");
            return None;
        }
        if !draft.confidence.is_finite() {
            tracing::warn!(confidence = draft.confidence, "prediction dropped: bad confidence");
            return None;
        }
        if !draft.processing_time.is_finite() || draft.processing_time < 0.0 {
            tracing::warn!(
                processing_time = draft.processing_time,
                "prediction dropped: bad processing_time"
            );
            return None;
        }

        let id = Uuid::new_v4();
        let original_prediction = draft
            .original_prediction
            .unwrap_or_else(|| draft.predicted_label.clone());
        let record = PendingPrediction {
            id,
            timestamp: draft.timestamp,
            predicted_label: draft.predicted_label,
            confidence: draft.confidence,
            processing_time: draft.processing_time,
            embedding: draft.embedding,
            original_prediction,
        };

        let mut state = self.state();
        if state.pending.len() == self.config.pending_capacity {
            if let Some(discarded) = state.pending.pop_front() {
                tracing::debug!(id = %discarded.id, "pending queue full, oldest unvalidated prediction discarded");
            }
        }
        tracing::info!(%id, label = %record.predicted_label, "prediction recorded");
        state.pending.push_back(record);
        Some(id)
    }

    /// Confirm the pending prediction with the given correlation id.
    /// Returns false when the id is unknown (already confirmed, discarded, or
    /// never issued); never an error.
    pub fn confirm(&self, id: PredictionId, true_label: &str) -> bool {
        let mut state = self.state();
        let Some(position) = state.pending.iter().position(|p| p.id == id) else {
            tracing::warn!(%id, "no pending prediction with this id");
            return false;
        };
        let Some(record) = state.pending.remove(position) else {
            return false;
        };
        self.finish_validation(&mut state, record, true_label);
        true
    }

    /// Confirm whatever was predicted most recently (LIFO on the pending
    /// side). Id-less fallback for callers that cannot correlate requests.
    /// Returns false when nothing is pending.
    pub fn confirm_latest(&self, true_label: &str) -> bool {
        let mut state = self.state();
        let Some(record) = state.pending.pop_back() else {
            tracing::warn!("no pending prediction to confirm");
            return false;
        };
        self.finish_validation(&mut state, record, true_label);
        true
    }

    fn finish_validation(
        &self,
        state: &mut MonitorState,
        record: PendingPrediction,
        true_label: &str,
    ) {
        let validated = ValidatedPrediction {
            id: record.id,
            timestamp: record.timestamp,
            predicted_label: true_label.to_string(),
            confidence: record.confidence,
            processing_time: record.processing_time,
            embedding: record.embedding,
            original_prediction: record.original_prediction,
            validated_at: Utc::now(),
        };

        if state.validated.len() == self.config.window_size {
            state.validated.pop_front();
        }
        state.validated.push_back(validated.clone());
        tracing::info!(id = %validated.id, label = true_label, "prediction validated");

        self.persist_validation(state, &validated);
    }

    /// Append the new record to the history log, compacting (atomic rewrite
    /// of the current window) once the log outgrows twice the window size.
    fn persist_validation(&self, state: &mut MonitorState, record: &ValidatedPrediction) {
        let result = if state.history_lines + 1 > 2 * self.config.window_size {
            compact_history(&self.config.history_path(), &state.validated)
                .map(|()| state.history_lines = state.validated.len())
        } else {
            append_history(&self.config.history_path(), record)
                .map(|()| state.history_lines += 1)
        };

        match result {
            Ok(()) => state.consecutive_persist_failures = 0,
            Err(err) => {
                state.consecutive_persist_failures += 1;
                if state.consecutive_persist_failures >= PERSIST_FAILURE_ESCALATION {
                    tracing::error!(
                        failures = state.consecutive_persist_failures,
                        error = %err,
                        "prediction history persistently failing to write; on-disk copy is behind"
                    );
                } else {
                    tracing::warn!(error = %err, "failed to persist prediction history");
                }
            }
        }
    }

    /// Number of predictions currently awaiting confirmation.
    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    /// Snapshot of the validated window, oldest first.
    pub fn validated_window(&self) -> Vec<ValidatedPrediction> {
        self.state().validated.iter().cloned().collect()
    }

    /// Compute rolling metrics over the validated window and persist them to
    /// a freshly timestamped report file. `None` when no data is available —
    /// that is a sentinel, not an error. A failed report write is logged and
    /// the report still returned.
    pub fn generate_report(&self) -> Option<MetricsReport> {
        let report = {
            let state = self.state();
            if state.validated.is_empty() {
                tracing::debug!("no validated predictions, skipping report");
                return None;
            }

            let n = state.validated.len();
            let mut confidence_sum = 0.0;
            let mut time_sum = 0.0;
            let mut correct = 0usize;
            let mut per_class: BTreeMap<String, usize> = BTreeMap::new();
            for record in &state.validated {
                confidence_sum += record.confidence;
                time_sum += record.processing_time;
                if record.original_prediction == record.predicted_label {
                    correct += 1;
                }
                *per_class.entry(record.predicted_label.clone()).or_insert(0) += 1;
            }

            MetricsReport {
                timestamp: Utc::now(),
                avg_confidence: confidence_sum / n as f64,
                avg_processing_time: time_sum / n as f64,
                n_predictions: n,
                predictions_per_class: per_class,
                prediction_accuracy: correct as f64 / n as f64,
            }
        };

        let filename = format!(
            "metrics_{}.json",
            report.timestamp.format("%Y%m%d_%H%M%S%3f")
        );
        let path = self.config.reports_dir.join(filename);
        match serde_json::to_vec_pretty(&report) {
            Ok(bytes) => {
                if let Err(err) = write_atomic(&path, &bytes) {
                    tracing::warn!(path = %path.display(), error = %err, "failed to write metrics report");
                } else {
                    tracing::info!(path = %path.display(), "metrics report written");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize metrics report");
            }
        }

        Some(report)
    }
}

/// Replay the history log, keeping the newest `window_size` valid records.
/// Returns the window plus the total line count currently in the file.
fn load_history(path: &Path, window_size: usize) -> (VecDeque<ValidatedPrediction>, usize) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return (VecDeque::new(), 0);
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read prediction history");
            return (VecDeque::new(), 0);
        }
    };

    let mut window = VecDeque::new();
    let mut lines = 0usize;
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        match serde_json::from_str::<ValidatedPrediction>(line) {
            Ok(record) => {
                if window.len() == window_size {
                    window.pop_front();
                }
                window.push_back(record);
            }
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed history line");
            }
        }
    }
    (window, lines)
}

fn append_history(path: &Path, record: &ValidatedPrediction) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(record).map_err(std::io::Error::other)?;
    line.push(b'\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)
}

/// Rewrite the log as exactly the current window, via temp-file-then-rename
/// so an interrupted rewrite never leaves a truncated history behind.
fn compact_history(
    path: &Path,
    window: &VecDeque<ValidatedPrediction>,
) -> std::io::Result<()> {
    let mut bytes = Vec::new();
    for record in window {
        let line = serde_json::to_vec(record).map_err(std::io::Error::other)?;
        bytes.extend_from_slice(&line);
        bytes.push(b'\n');
    }
    write_atomic(path, &bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_monitor(dir: &Path, window_size: usize) -> PredictionMonitor {
        PredictionMonitor::new(MonitorConfig {
            reports_dir: dir.to_path_buf(),
            window_size,
            pending_capacity: 10,
        })
        .unwrap()
    }

    fn draft(label: &str, confidence: f64) -> PredictionDraft {
        PredictionDraft {
            timestamp: Utc::now(),
            predicted_label: label.to_string(),
            confidence,
            processing_time: 0.05,
            embedding: None,
            original_prediction: None,
        }
    }

    #[test]
    fn zero_capacities_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bad_window = MonitorConfig {
            reports_dir: dir.path().to_path_buf(),
            window_size: 0,
            pending_capacity: 10,
        };
        assert!(matches!(
            PredictionMonitor::new(bad_window),
            Err(MonitorError::InvalidWindowSize)
        ));

        let bad_pending = MonitorConfig {
            reports_dir: dir.path().to_path_buf(),
            window_size: 10,
            pending_capacity: 0,
        };
        assert!(matches!(
            PredictionMonitor::new(bad_pending),
            Err(MonitorError::InvalidPendingCapacity)
        ));
    }

    #[test]
    fn invalid_drafts_are_dropped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = test_monitor(dir.path(), 10);

        assert!(monitor.record_prediction(draft("", 0.9)).is_none());
        assert!(monitor.record_prediction(draft("x", f64::NAN)).is_none());
        let mut bad_time = draft("x", 0.9);
        bad_time.processing_time = -1.0;
        assert!(monitor.record_prediction(bad_time).is_none());
        assert_eq!(monitor.pending_len(), 0);
    }

    #[test]
    fn original_prediction_defaults_to_the_model_guess() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = test_monitor(dir.path(), 10);

        monitor.record_prediction(draft("varilux", 0.8)).unwrap();
        assert!(monitor.confirm_latest("crizal"));

        let window = monitor.validated_window();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].original_prediction, "varilux");
        assert_eq!(window[0].predicted_label, "crizal");
    }

    #[test]
    fn confirm_latest_consumes_the_most_recent_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = test_monitor(dir.path(), 10);

        monitor.record_prediction(draft("a", 0.9)).unwrap();
        monitor.record_prediction(draft("b", 0.5)).unwrap();
        monitor.record_prediction(draft("c", 0.2)).unwrap();

        assert!(monitor.confirm_latest("X"));
        let window = monitor.validated_window();
        assert_eq!(window.len(), 1);
        // The confidence-0.2 record was the last pushed, so it is the one
        // consumed, and its original guess survives the relabel.
        assert_eq!(window[0].confidence, 0.2);
        assert_eq!(window[0].original_prediction, "c");
        assert_eq!(window[0].predicted_label, "X");
        assert_eq!(monitor.pending_len(), 2);
    }

    #[test]
    fn confirm_latest_on_empty_queue_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = test_monitor(dir.path(), 10);
        assert!(!monitor.confirm_latest("anything"));
    }

    #[test]
    fn confirm_by_id_targets_the_right_record() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = test_monitor(dir.path(), 10);

        let first = monitor.record_prediction(draft("a", 0.9)).unwrap();
        let _second = monitor.record_prediction(draft("b", 0.5)).unwrap();

        assert!(monitor.confirm(first, "a"));
        assert!(!monitor.confirm(first, "a"), "id already consumed");
        assert!(!monitor.confirm(Uuid::new_v4(), "a"), "unknown id");

        let window = monitor.validated_window();
        assert_eq!(window[0].original_prediction, "a");
        assert_eq!(monitor.pending_len(), 1);
    }

    #[test]
    fn pending_queue_discards_oldest_on_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = PredictionMonitor::new(MonitorConfig {
            reports_dir: dir.path().to_path_buf(),
            window_size: 10,
            pending_capacity: 3,
        })
        .unwrap();

        for i in 0..5 {
            monitor.record_prediction(draft(&format!("p{i}"), 0.5)).unwrap();
        }
        assert_eq!(monitor.pending_len(), 3);

        // Drain: remaining should be p2, p3, p4 (p0 and p1 discarded).
        assert!(monitor.confirm_latest("x"));
        assert!(monitor.confirm_latest("x"));
        assert!(monitor.confirm_latest("x"));
        let originals: Vec<_> = monitor
            .validated_window()
            .iter()
            .map(|r| r.original_prediction.clone())
            .collect();
        assert_eq!(originals, vec!["p4", "p3", "p2"]);
    }

    #[test]
    fn validated_window_evicts_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = test_monitor(dir.path(), 2);

        for label in ["one", "two", "three"] {
            monitor.record_prediction(draft(label, 0.5)).unwrap();
            assert!(monitor.confirm_latest(label));
        }

        let window = monitor.validated_window();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].predicted_label, "two");
        assert_eq!(window[1].predicted_label, "three");
    }

    #[test]
    fn report_on_empty_window_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = test_monitor(dir.path(), 10);
        assert!(monitor.generate_report().is_none());
    }

    #[test]
    fn accuracy_is_zero_after_a_corrected_prediction_and_one_after_a_confirmed_one() {
        let dir = tempfile::tempdir().unwrap();

        let corrected = test_monitor(&dir.path().join("corrected"), 10);
        corrected.record_prediction(draft("varilux", 0.9)).unwrap();
        assert!(corrected.confirm_latest("crizal"));
        let report = corrected.generate_report().unwrap();
        assert_eq!(report.prediction_accuracy, 0.0);

        let confirmed = test_monitor(&dir.path().join("confirmed"), 10);
        confirmed.record_prediction(draft("varilux", 0.9)).unwrap();
        assert!(confirmed.confirm_latest("varilux"));
        let report = confirmed.generate_report().unwrap();
        assert_eq!(report.prediction_accuracy, 1.0);
    }

    #[test]
    fn report_aggregates_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = test_monitor(dir.path(), 10);

        let mut d = draft("a", 0.8);
        d.processing_time = 0.1;
        monitor.record_prediction(d).unwrap();
        assert!(monitor.confirm_latest("a"));

        let mut d = draft("b", 0.4);
        d.processing_time = 0.3;
        monitor.record_prediction(d).unwrap();
        assert!(monitor.confirm_latest("a"));

        let report = monitor.generate_report().unwrap();
        assert_eq!(report.n_predictions, 2);
        assert!((report.avg_confidence - 0.6).abs() < 1e-9);
        assert!((report.avg_processing_time - 0.2).abs() < 1e-9);
        assert_eq!(report.prediction_accuracy, 0.5);
        assert_eq!(report.predictions_per_class.get("a"), Some(&2));
        assert!(report.predictions_per_class.get("b").is_none());

        // A report file landed next to the history log.
        let reports: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("metrics_")
            })
            .collect();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn history_round_trips_through_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            reports_dir: dir.path().to_path_buf(),
            window_size: 100,
            pending_capacity: 10,
        };

        let monitor = PredictionMonitor::new(config.clone()).unwrap();
        for i in 0..5 {
            monitor
                .record_prediction(draft(&format!("class{i}"), 0.1 * i as f64))
                .unwrap();
            assert!(monitor.confirm_latest(&format!("class{i}")));
        }
        let written = monitor.validated_window();
        drop(monitor);

        let reloaded = PredictionMonitor::new(config).unwrap();
        assert_eq!(reloaded.validated_window(), written);
    }

    #[test]
    fn reload_keeps_only_the_newest_window() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            reports_dir: dir.path().to_path_buf(),
            window_size: 100,
            pending_capacity: 10,
        };
        let monitor = PredictionMonitor::new(config.clone()).unwrap();
        for i in 0..6 {
            monitor
                .record_prediction(draft(&format!("c{i}"), 0.5))
                .unwrap();
            assert!(monitor.confirm_latest(&format!("c{i}")));
        }
        drop(monitor);

        let small = PredictionMonitor::new(MonitorConfig {
            window_size: 3,
            ..config
        })
        .unwrap();
        let labels: Vec<_> = small
            .validated_window()
            .iter()
            .map(|r| r.predicted_label.clone())
            .collect();
        assert_eq!(labels, vec!["c3", "c4", "c5"]);
    }

    #[test]
    fn malformed_history_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            reports_dir: dir.path().to_path_buf(),
            window_size: 10,
            pending_capacity: 10,
        };
        let monitor = PredictionMonitor::new(config.clone()).unwrap();
        monitor.record_prediction(draft("good", 0.9)).unwrap();
        assert!(monitor.confirm_latest("good"));
        drop(monitor);

        // Corrupt the log with a garbage line between restarts.
        let mut contents = fs::read_to_string(config.history_path()).unwrap();
        contents.push_str("{not json}\n");
        fs::write(config.history_path(), contents).unwrap();

        let reloaded = PredictionMonitor::new(config).unwrap();
        assert_eq!(reloaded.validated_window().len(), 1);
    }

    #[test]
    fn history_log_compacts_once_it_outgrows_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            reports_dir: dir.path().to_path_buf(),
            window_size: 2,
            pending_capacity: 10,
        };
        let monitor = PredictionMonitor::new(config.clone()).unwrap();

        // 2 * window_size = 4 appended lines, the fifth triggers compaction.
        for i in 0..5 {
            monitor.record_prediction(draft(&format!("c{i}"), 0.5)).unwrap();
            assert!(monitor.confirm_latest(&format!("c{i}")));
        }

        let contents = fs::read_to_string(config.history_path()).unwrap();
        let lines: Vec<_> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines.len(), 2, "log was compacted down to the window");

        let reloaded = PredictionMonitor::new(config).unwrap();
        let labels: Vec<_> = reloaded
            .validated_window()
            .iter()
            .map(|r| r.predicted_label.clone())
            .collect();
        assert_eq!(labels, vec!["c3", "c4"]);
    }
}
