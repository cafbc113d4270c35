use serde::{Deserialize, Serialize};

/// The consolidated result of a load test run, combining every iteration and the outcome samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregateReport {
    /// Sum of the requests completed across all iterations
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Percentage of successful requests, rounded to 2 decimals
    ///
    /// `0` when no requests were made.
    pub success_rate: f64,

    /// Mean of the per-iteration mean response times
    pub avg_response_time_ms: f64,
    /// Smallest per-iteration minimum
    pub min_response_time_ms: f64,
    /// Largest per-iteration maximum
    pub max_response_time_ms: f64,
    pub p50_ms: f64,
    pub p80_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,

    /// Throughput over the whole run, computed from wall clock time rather than averaged across
    /// iterations
    pub requests_per_second: f64,
    /// Wall clock time the iterations took, in seconds
    pub total_duration_seconds: f64,

    /// Estimated number of successful requests that were allowed
    ///
    /// This is the allowed share of the classified samples scaled onto
    /// [AggregateReport::successful_requests], so it is an estimate and not a count.
    pub allowed_requests: u64,
    /// Estimated number of successful requests that were denied
    pub denied_requests: u64,
    pub allow_rate: f64,
    pub deny_rate: f64,
    /// Number of samples that produced a result, including unknown verdicts
    pub sampled_requests: usize,
    /// Number of samples with an allow or deny verdict
    pub classified_samples: usize,

    /// Number of benchmark iterations that were combined into this report
    pub iterations: usize,
}
