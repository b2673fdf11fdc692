use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters shared by every clone of the engine.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    oee_computations: AtomicU64,
    reports_generated: AtomicU64,
    no_data_results: AtomicU64,
    anomalies_flagged: AtomicU64,
    store_errors: AtomicU64,
    slowest_call_us: AtomicU64,
}

impl MetricsRegistry {
    pub fn inc_oee_computations(&self, delta: u64) {
        self.inner.oee_computations.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_reports_generated(&self, delta: u64) {
        self.inner.reports_generated.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_no_data_results(&self, delta: u64) {
        self.inner.no_data_results.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_anomalies_flagged(&self, delta: u64) {
        self.inner.anomalies_flagged.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_store_errors(&self, delta: u64) {
        self.inner.store_errors.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn record_call(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.inner.slowest_call_us.fetch_max(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            oee_computations: self.inner.oee_computations.load(Ordering::Relaxed),
            reports_generated: self.inner.reports_generated.load(Ordering::Relaxed),
            no_data_results: self.inner.no_data_results.load(Ordering::Relaxed),
            anomalies_flagged: self.inner.anomalies_flagged.load(Ordering::Relaxed),
            store_errors: self.inner.store_errors.load(Ordering::Relaxed),
            slowest_call_us: self.inner.slowest_call_us.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub oee_computations: u64,
    pub reports_generated: u64,
    pub no_data_results: u64,
    pub anomalies_flagged: u64,
    pub store_errors: u64,
    pub slowest_call_us: u64,
}

impl MetricsSnapshot {
    pub fn to_json_line(&self, label: &str, elapsed: Option<Duration>) -> String {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            label: &'a str,
            #[serde(flatten)]
            counters: &'a MetricsSnapshot,
            elapsed_ms: Option<u128>,
        }

        let payload = Snapshot {
            label,
            counters: self,
            elapsed_ms: elapsed.map(|d| d.as_millis()),
        };
        serde_json::to_string(&payload).unwrap_or_else(|_| String::from("{}"))
    }
}

pub struct CallTimer {
    start: Instant,
}

impl CallTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
