//! Reporting sinks for per-round metric snapshots.

use std::sync::Mutex;

use tracing::info;

use crate::government::orchestrator::RoundMetrics;

/// Receives per-round metrics emitted by the orchestrator.
///
/// Emission is observational: the orchestrator never depends on what a
/// sink does with a snapshot.
pub trait MetricsSink: Send + Sync {
    /// Called once per completed round, after Evaluating.
    fn on_round(&self, metrics: &RoundMetrics);
}

/// Default sink logging each round through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn on_round(&self, metrics: &RoundMetrics) {
        info!(
            round = metrics.round,
            participants = metrics.participants,
            excluded = metrics.excluded.len(),
            loss = metrics.global.loss,
            accuracy = metrics.global.accuracy,
            "round completed"
        );
    }
}

/// In-memory sink buffering snapshots for inspection.
#[derive(Debug, Default)]
pub struct BufferSink {
    entries: Mutex<Vec<RoundMetrics>>,
}

impl BufferSink {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered snapshots.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the buffered snapshots.
    pub fn snapshots(&self) -> Vec<RoundMetrics> {
        self.entries.lock().unwrap().clone()
    }
}

impl MetricsSink for BufferSink {
    fn on_round(&self, metrics: &RoundMetrics) {
        self.entries.lock().unwrap().push(metrics.clone());
    }
}
