//! Latency metrics for the external health surface.
//!
//! Keeps a rolling window of the last 100 samples per stage (extraction,
//! join, whole-command) and exposes a JSON snapshot; the HTTP endpoint that
//! serves it lives outside this crate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

const WINDOW_CAP: usize = 100;

#[derive(Debug, Default)]
struct LatencyWindow {
    samples_ms: VecDeque<u64>,
}

impl LatencyWindow {
    fn record(&mut self, duration: Duration) {
        if self.samples_ms.len() == WINDOW_CAP {
            self.samples_ms.pop_front();
        }
        self.samples_ms.push_back(duration.as_millis() as u64);
    }

    fn summary(&self) -> Option<WindowSummary> {
        if self.samples_ms.is_empty() {
            return None;
        }
        let count = self.samples_ms.len() as u64;
        let sum: u64 = self.samples_ms.iter().sum();
        Some(WindowSummary {
            avg_ms: sum / count,
            min_ms: self.samples_ms.iter().min().copied().unwrap_or(0),
            max_ms: self.samples_ms.iter().max().copied().unwrap_or(0),
            count,
        })
    }
}

/// Aggregates over one rolling latency window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub avg_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub count: u64,
}

#[derive(Debug, Default)]
struct MetricsInner {
    extraction: LatencyWindow,
    join: LatencyWindow,
    command: LatencyWindow,
}

/// Rolling latency collector shared across all chats.
#[derive(Debug)]
pub struct Metrics {
    inner: RwLock<MetricsInner>,
    started_at: DateTime<Utc>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MetricsInner::default()),
            started_at: Utc::now(),
        }
    }

    /// Record one metadata-extraction round trip.
    pub async fn record_extraction(&self, duration: Duration) {
        self.inner.write().await.extraction.record(duration);
    }

    /// Record one successful transport join.
    pub async fn record_join(&self, duration: Duration) {
        self.inner.write().await.join.record(duration);
    }

    /// Record one end-to-end command handling time.
    pub async fn record_command(&self, duration: Duration) {
        self.inner.write().await.command.record(duration);
    }

    /// JSON snapshot for the health endpoint. Stages with no samples yet
    /// serialize as `null`.
    pub async fn snapshot_json(&self) -> Value {
        let inner = self.inner.read().await;
        json!({
            "uptime_secs": (Utc::now() - self.started_at).num_seconds(),
            "extraction": inner.extraction.summary(),
            "join": inner.join.summary(),
            "command": inner.command.summary(),
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn summary_reflects_samples() {
        let metrics = Metrics::new();
        metrics.record_extraction(Duration::from_millis(100)).await;
        metrics.record_extraction(Duration::from_millis(300)).await;

        let snapshot = metrics.snapshot_json().await;
        assert_eq!(snapshot["extraction"]["count"], 2);
        assert_eq!(snapshot["extraction"]["avg_ms"], 200);
        assert_eq!(snapshot["extraction"]["min_ms"], 100);
        assert_eq!(snapshot["extraction"]["max_ms"], 300);
    }

    #[tokio::test]
    async fn empty_stages_are_null() {
        let metrics = Metrics::new();
        let snapshot = metrics.snapshot_json().await;
        assert!(snapshot["join"].is_null());
        assert!(snapshot["command"].is_null());
        assert!(snapshot["uptime_secs"].is_u64() || snapshot["uptime_secs"].is_i64());
    }

    #[tokio::test]
    async fn window_is_bounded() {
        let metrics = Metrics::new();
        for i in 0..(WINDOW_CAP as u64 + 50) {
            metrics.record_command(Duration::from_millis(i)).await;
        }
        let snapshot = metrics.snapshot_json().await;
        assert_eq!(snapshot["command"]["count"], WINDOW_CAP as u64);
        // Oldest 50 samples were evicted
        assert_eq!(snapshot["command"]["min_ms"], 50);
    }
}
