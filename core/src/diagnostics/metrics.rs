use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Default)]
struct Metrics {
    candidates: usize,
    accepted: usize,
    rejected: BTreeMap<String, usize>,
}

/// Counters at one point of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub candidates: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub rejected_by_reason: BTreeMap<String, usize>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_candidate(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.candidates += 1;
        }
    }

    pub fn record_accepted(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.accepted += 1;
        }
    }

    pub fn record_rejected(&self, reason: &str) {
        if let Ok(mut metrics) = self.inner.lock() {
            *metrics.rejected.entry(reason.to_string()).or_insert(0) += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                candidates: metrics.candidates,
                accepted: metrics.accepted,
                rejected: metrics.rejected.values().sum(),
                rejected_by_reason: metrics.rejected.clone(),
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_totals_rejections_by_reason() {
        let metrics = MetricsRecorder::new();
        metrics.record_candidate();
        metrics.record_candidate();
        metrics.record_candidate();
        metrics.record_accepted();
        metrics.record_rejected("angle below minimum");
        metrics.record_rejected("angle below minimum");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.candidates, 3);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.rejected, 2);
        assert_eq!(snapshot.rejected_by_reason.get("angle below minimum"), Some(&2));
    }
}
