//! In-memory latency histograms for ledger transactions.
//! Measured from BEGIN to COMMIT, one histogram per operation plus a total.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

/// Tracks 1us to 100s, 3 significant figures.
fn new_histogram() -> Histogram<u64> {
    Histogram::new_with_bounds(1, 100_000_000, 3).expect("valid histogram bounds")
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySummary {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySnapshot {
    pub overall: LatencySummary,
    pub by_operation: BTreeMap<&'static str, LatencySummary>,
}

struct Histograms {
    overall: Histogram<u64>,
    by_operation: BTreeMap<&'static str, Histogram<u64>>,
}

/// Ledger records, API reads.
pub struct LatencyStats {
    inner: Mutex<Histograms>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Histograms {
                overall: new_histogram(),
                by_operation: BTreeMap::new(),
            }),
        }
    }

    pub fn record(&self, op: &'static str, elapsed: Duration) {
        let us = elapsed.as_micros().clamp(1, u128::from(u64::MAX)) as u64;
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.overall.record(us);
            let _ = h.by_operation.entry(op).or_insert_with(new_histogram).record(us);
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let Ok(h) = self.inner.lock() else {
            return LatencySnapshot::default();
        };
        LatencySnapshot {
            overall: summarize(&h.overall),
            by_operation: h
                .by_operation
                .iter()
                .map(|(op, hist)| (*op, summarize(hist)))
                .collect(),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(h: &Histogram<u64>) -> LatencySummary {
    if h.len() == 0 {
        return LatencySummary::default();
    }
    let ms = |q: f64| Some(h.value_at_quantile(q) as f64 / 1_000.0);
    LatencySummary {
        p50_ms: ms(0.5),
        p95_ms: ms(0.95),
        p99_ms: ms(0.99),
        sample_count: h.len(),
    }
}
