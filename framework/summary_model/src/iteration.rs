use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One decision request payload, forwarded verbatim to the decision service as `{"input": ...}`.
pub type TestInput = serde_json::Value;

/// Metrics parsed from the report of a single benchmark iteration.
///
/// Fields that could not be found in the report are `0`, and the percentile table only holds the
/// percentiles that the report actually listed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IterationMetrics {
    /// Number of requests the benchmark completed
    pub total_requests: u64,
    /// Number of requests the benchmark counted as failed
    ///
    /// Never greater than [IterationMetrics::total_requests].
    pub failed_requests: u64,
    /// Mean time per request, in milliseconds
    pub avg_response_time_ms: f64,
    /// Latency by percentile of requests served, in milliseconds
    ///
    /// Keyed by percentile, so `50 -> 12.0` reads "50% of requests were served within 12ms".
    pub percentiles: BTreeMap<u32, f64>,
    /// Throughput reported by the benchmark for this iteration
    pub requests_per_second: f64,
    /// Time the benchmark reported for the whole iteration, in seconds
    pub time_taken_seconds: f64,
    /// Responses with a non-2xx status code
    ///
    /// These are not included in [IterationMetrics::failed_requests].
    pub non_2xx_responses: u64,
}

impl IterationMetrics {
    /// Create metrics from the request counts, clamping `failed_requests` so that the number of
    /// successful requests can never go negative.
    pub fn new(total_requests: u64, failed_requests: u64) -> Self {
        Self {
            total_requests,
            failed_requests: failed_requests.min(total_requests),
            ..Default::default()
        }
    }

    pub fn successful_requests(&self) -> u64 {
        self.total_requests.saturating_sub(self.failed_requests)
    }

    /// The latency for a percentile, or `0` if the report did not list it.
    pub fn percentile(&self, percentile: u32) -> f64 {
        self.percentiles.get(&percentile).copied().unwrap_or(0.0)
    }

    pub fn min_response_time_ms(&self) -> f64 {
        self.percentile(0)
    }

    pub fn max_response_time_ms(&self) -> f64 {
        self.percentile(100)
    }
}

/// Outcome of one direct call to the decision endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SampleResult {
    Allowed,
    Denied,
    /// The decision service answered but its `result` was neither a boolean nor an object with a
    /// boolean `allow` field.
    Unknown,
}

impl SampleResult {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            SampleResult::Allowed
        } else {
            SampleResult::Denied
        }
    }

    /// Whether this sample counts towards the allow/deny split.
    pub fn is_classified(&self) -> bool {
        !matches!(self, SampleResult::Unknown)
    }
}
