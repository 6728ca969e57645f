// src/utils/metrics.rs
use std::sync::atomic::{AtomicU64, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::{Duration, Instant};

use crate::core::services::verification::VerificationOutcome;

pub struct Metrics {
    start_time: Instant,
    checks_total: AtomicU64,
    checks_ok: AtomicU64,
    checks_mismatch: AtomicU64,
    checks_noface: AtomicU64,
    checks_error: AtomicU64,
    processing_time: AtomicU64,
    last_mismatch_at: Mutex<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckCounts {
    pub total: u64,
    pub ok: u64,
    pub mismatch: u64,
    pub noface: u64,
    pub error: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub checks: CheckCounts,
    pub avg_latency_ms: f64,
    pub last_mismatch_at: Option<DateTime<Utc>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            checks_total: AtomicU64::new(0),
            checks_ok: AtomicU64::new(0),
            checks_mismatch: AtomicU64::new(0),
            checks_noface: AtomicU64::new(0),
            checks_error: AtomicU64::new(0),
            processing_time: AtomicU64::new(0),
            last_mismatch_at: Mutex::new(None),
        }
    }

    pub fn record_check(&self, outcome: &VerificationOutcome, duration: Duration) {
        self.checks_total.fetch_add(1, Ordering::SeqCst);
        self.processing_time.fetch_add(duration.as_micros() as u64, Ordering::SeqCst);

        let counter = match outcome {
            VerificationOutcome::Ok { .. } => &self.checks_ok,
            VerificationOutcome::Mismatch { .. } => {
                *self.last_mismatch_at.lock() = Some(Utc::now());
                &self.checks_mismatch
            }
            VerificationOutcome::NoFaceDetected => &self.checks_noface,
            VerificationOutcome::Error { .. } => &self.checks_error,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.checks_total.load(Ordering::SeqCst);
        let processing_micros = self.processing_time.load(Ordering::SeqCst);
        let avg_latency_ms = if total == 0 {
            0.0
        } else {
            processing_micros as f64 / total as f64 / 1000.0
        };

        MetricsSnapshot {
            uptime_seconds: self.uptime().as_secs(),
            checks: CheckCounts {
                total,
                ok: self.checks_ok.load(Ordering::SeqCst),
                mismatch: self.checks_mismatch.load(Ordering::SeqCst),
                noface: self.checks_noface.load(Ordering::SeqCst),
                error: self.checks_error.load(Ordering::SeqCst),
            },
            avg_latency_ms,
            last_mismatch_at: *self.last_mismatch_at.lock(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
