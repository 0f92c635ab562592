use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

/// Process-wide counters shared by every pipeline component.
///
/// The pipeline only increments; formatting and shipping are left to the
/// telemetry collaborator (out of scope). Costs are tracked in micro-USD so
/// the counter stays an integer.
#[derive(Default)]
pub struct Telemetry {
    requests_total: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    url_branch: AtomicU64,
    dish_branch: AtomicU64,
    model_invocations: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    cost_micro_usd: AtomicU64,
    errors: Mutex<HashMap<&'static str, u64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub requests_total: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub url_branch: u64,
    pub dish_branch: u64,
    pub model_invocations: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub errors: HashMap<&'static str, u64>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_url_branch(&self) {
        self.url_branch.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dish_branch(&self) {
        self.dish_branch.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one model invocation's token usage and cost, whether or not
    /// the call succeeded (failed calls still consumed input tokens).
    pub fn record_model_usage(&self, input_tokens: u64, output_tokens: u64, cost_usd: f64) {
        self.model_invocations.fetch_add(1, Ordering::Relaxed);
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(output_tokens, Ordering::Relaxed);
        self.cost_micro_usd
            .fetch_add((cost_usd * 1_000_000.0).round() as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self, kind: &'static str) {
        let mut errors = self.errors.lock().expect("telemetry lock poisoned");
        *errors.entry(kind).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            url_branch: self.url_branch.load(Ordering::Relaxed),
            dish_branch: self.dish_branch.load(Ordering::Relaxed),
            model_invocations: self.model_invocations.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            cost_usd: self.cost_micro_usd.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            errors: self
                .errors
                .lock()
                .expect("telemetry lock poisoned")
                .clone(),
        }
    }
}
