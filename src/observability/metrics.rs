//! Process-wide forge API counters.
//!
//! Counters are keyed by `(controller, token name, operation)` and live in a
//! sharded map, so concurrent reconciles touching different keys never
//! contend on one lock. Rate-limit failures bump a second count on the same
//! key.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static GLOBAL: Lazy<Arc<ForgeMetrics>> = Lazy::new(|| Arc::new(ForgeMetrics::new()));

/// Counter identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CounterKey {
    pub controller: String,
    pub token_name: String,
    pub operation: String,
}

impl CounterKey {
    pub fn new(
        controller: impl Into<String>,
        token_name: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            controller: controller.into(),
            token_name: token_name.into(),
            operation: operation.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Counts {
    calls: AtomicU64,
    rate_limited: AtomicU64,
}

/// Point-in-time copy of one counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub key: CounterKey,
    pub calls: u64,
    pub rate_limited: u64,
}

/// Forge API call counters.
#[derive(Debug, Default)]
pub struct ForgeMetrics {
    counters: DashMap<CounterKey, Counts>,
}

impl ForgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> Arc<ForgeMetrics> {
        Arc::clone(&GLOBAL)
    }

    /// Count one API call.
    pub fn record_call(&self, key: &CounterKey) {
        self.with_counts(key, |c| {
            c.calls.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// Count a rate-limit rejection. The call itself is counted separately.
    pub fn record_rate_limited(&self, key: &CounterKey) {
        self.with_counts(key, |c| {
            c.rate_limited.fetch_add(1, Ordering::Relaxed);
        });
    }

    fn with_counts(&self, key: &CounterKey, f: impl FnOnce(&Counts)) {
        if let Some(counts) = self.counters.get(key) {
            f(&counts);
            return;
        }
        let entry = self.counters.entry(key.clone()).or_default();
        f(&entry);
    }

    pub fn calls(&self, key: &CounterKey) -> u64 {
        self.counters
            .get(key)
            .map_or(0, |c| c.calls.load(Ordering::Relaxed))
    }

    pub fn rate_limited(&self, key: &CounterKey) -> u64 {
        self.counters
            .get(key)
            .map_or(0, |c| c.rate_limited.load(Ordering::Relaxed))
    }

    /// All counters, sorted by key.
    pub fn snapshot(&self) -> Vec<CounterSnapshot> {
        let mut out: Vec<CounterSnapshot> = self
            .counters
            .iter()
            .map(|entry| CounterSnapshot {
                key: entry.key().clone(),
                calls: entry.value().calls.load(Ordering::Relaxed),
                rate_limited: entry.value().rate_limited.load(Ordering::Relaxed),
            })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }
}
