//! In-process metrics for gateway calls and provisioning outcomes
//!
//! Gateway calls are keyed by `(endpoint, method, outcome)` where `endpoint`
//! is the logical path label (never a concrete username), so the key space
//! stays bounded. Provisioning counters are plain relaxed atomics.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Outcome tag for a single gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    NotFound,
    Conflict,
    Error,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::NotFound => "not_found",
            CallOutcome::Conflict => "conflict",
            CallOutcome::Error => "error",
        }
    }
}

/// Which orchestrator path issued a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuePath {
    /// Consumer keyed by username
    Consumer,
    /// Named or default-named token for an existing principal
    Auto,
    /// Consumer plus `_auto_` token in one step
    AutoGenerate,
}

#[derive(Debug, Clone, Copy, Default)]
struct CallStats {
    count: u64,
    total_us: u64,
    max_us: u64,
}

/// Aggregated stats for one `(endpoint, method, outcome)` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayCallSnapshot {
    pub endpoint: String,
    pub method: String,
    pub outcome: CallOutcome,
    pub count: u64,
    pub total_duration_us: u64,
    pub max_duration_us: u64,
}

/// Token counts per issuing path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokensIssuedSnapshot {
    pub consumer: u64,
    pub auto: u64,
    pub auto_generate: u64,
}

/// Point-in-time copy of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub gateway_calls: Vec<GatewayCallSnapshot>,
    pub consumers_created: u64,
    pub tokens_issued: TokensIssuedSnapshot,
}

impl MetricsSnapshot {
    /// Number of calls recorded for an endpoint/method/outcome
    pub fn call_count(&self, endpoint: &str, method: &str, outcome: CallOutcome) -> u64 {
        self.gateway_calls
            .iter()
            .find(|c| c.endpoint == endpoint && c.method == method && c.outcome == outcome)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Total tokens across all issuing paths
    pub fn total_tokens_issued(&self) -> u64 {
        self.tokens_issued.consumer + self.tokens_issued.auto + self.tokens_issued.auto_generate
    }
}

/// Shared metrics registry
#[derive(Debug, Default)]
pub struct Metrics {
    calls: Mutex<BTreeMap<(&'static str, &'static str, CallOutcome), CallStats>>,
    consumers_created: AtomicU64,
    tokens_consumer: AtomicU64,
    tokens_auto: AtomicU64,
    tokens_auto_generate: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one gateway call
    pub fn record_call(
        &self,
        endpoint: &'static str,
        method: &'static str,
        outcome: CallOutcome,
        elapsed: Duration,
    ) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let mut calls = self.calls.lock();
        let stats = calls.entry((endpoint, method, outcome)).or_default();
        stats.count += 1;
        stats.total_us = stats.total_us.saturating_add(us);
        stats.max_us = stats.max_us.max(us);
    }

    pub fn record_consumer_created(&self) {
        self.consumers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_token_issued(&self, path: IssuePath) {
        let counter = match path {
            IssuePath::Consumer => &self.tokens_consumer,
            IssuePath::Auto => &self.tokens_auto,
            IssuePath::AutoGenerate => &self.tokens_auto_generate,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let gateway_calls = self
            .calls
            .lock()
            .iter()
            .map(|(&(endpoint, method, outcome), stats)| GatewayCallSnapshot {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                outcome,
                count: stats.count,
                total_duration_us: stats.total_us,
                max_duration_us: stats.max_us,
            })
            .collect();

        MetricsSnapshot {
            gateway_calls,
            consumers_created: self.consumers_created.load(Ordering::Relaxed),
            tokens_issued: TokensIssuedSnapshot {
                consumer: self.tokens_consumer.load(Ordering::Relaxed),
                auto: self.tokens_auto.load(Ordering::Relaxed),
                auto_generate: self.tokens_auto_generate.load(Ordering::Relaxed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_aggregate_per_key() {
        let metrics = Metrics::new();
        metrics.record_call("/consumers/{username}", "GET", CallOutcome::NotFound, Duration::from_micros(300));
        metrics.record_call("/consumers/{username}", "GET", CallOutcome::NotFound, Duration::from_micros(100));
        metrics.record_call("/consumers/{username}", "GET", CallOutcome::Success, Duration::from_micros(50));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.call_count("/consumers/{username}", "GET", CallOutcome::NotFound), 2);
        assert_eq!(snapshot.call_count("/consumers/{username}", "GET", CallOutcome::Success), 1);
        assert_eq!(snapshot.call_count("/consumers", "POST", CallOutcome::Success), 0);

        let not_found = snapshot
            .gateway_calls
            .iter()
            .find(|c| c.outcome == CallOutcome::NotFound)
            .unwrap();
        assert_eq!(not_found.total_duration_us, 400);
        assert_eq!(not_found.max_duration_us, 300);
    }

    #[test]
    fn test_token_counters() {
        let metrics = Metrics::new();
        metrics.record_token_issued(IssuePath::Consumer);
        metrics.record_token_issued(IssuePath::AutoGenerate);
        metrics.record_token_issued(IssuePath::AutoGenerate);
        metrics.record_consumer_created();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tokens_issued.consumer, 1);
        assert_eq!(snapshot.tokens_issued.auto, 0);
        assert_eq!(snapshot.tokens_issued.auto_generate, 2);
        assert_eq!(snapshot.total_tokens_issued(), 3);
        assert_eq!(snapshot.consumers_created, 1);
    }

    #[test]
    fn test_snapshot_serializes_outcome_labels() {
        let metrics = Metrics::new();
        metrics.record_call("/consumers", "POST", CallOutcome::Conflict, Duration::ZERO);

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["gateway_calls"][0]["outcome"], "conflict");
        assert_eq!(CallOutcome::NotFound.as_str(), "not_found");
    }
}
