use std::sync::Mutex;

/// Session-scoped counters: completed scenario writes and input rows whose
/// defective fields were recovered by defaulting.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

struct Metrics {
    writes: usize,
    row_defects: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics {
                writes: 0,
                row_defects: 0,
            }),
        }
    }

    pub fn record_write(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.writes += 1;
        }
    }

    pub fn record_row_defect(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.row_defects += 1;
        }
    }

    /// Returns (writes, recovered row defects).
    pub fn snapshot(&self) -> (usize, usize) {
        if let Ok(metrics) = self.inner.lock() {
            (metrics.writes, metrics.row_defects)
        } else {
            (0, 0)
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
