//! Shared health state for the /health endpoint.
//! Updated by the ledger on every commit and rollback.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::now_ns;

#[derive(Default)]
pub struct HealthState {
    /// Transactions committed since startup.
    pub committed: AtomicU64,
    /// Transactions rolled back since startup (failed preconditions included).
    pub rolled_back: AtomicU64,
    /// Nanosecond timestamp of the last commit (0 = none).
    pub last_commit_at_ns: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
        self.last_commit_at_ns.store(now_ns() as u64, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    pub fn rolled_back(&self) -> u64 {
        self.rolled_back.load(Ordering::Relaxed)
    }

    pub fn last_commit_at_ns(&self) -> u64 {
        self.last_commit_at_ns.load(Ordering::Relaxed)
    }
}
