use load_tunnel_summary_model::{AggregateReport, IterationMetrics, SampleResult};

/// Combine the metrics of every iteration and the outcome samples into one report.
///
/// Counts are summed, timings are averaged across iterations except for the extrema, and
/// throughput is derived from `elapsed_seconds` for the whole run. The allow/deny split is the
/// sampled proportion scaled onto the successful requests. Empty inputs give zeroed rates.
pub fn aggregate(
    iterations: &[IterationMetrics],
    samples: &[SampleResult],
    elapsed_seconds: f64,
) -> AggregateReport {
    let total_requests = iterations.iter().map(|m| m.total_requests).sum::<u64>();
    let failed_requests = iterations.iter().map(|m| m.failed_requests).sum::<u64>();
    let successful_requests = iterations
        .iter()
        .map(IterationMetrics::successful_requests)
        .sum::<u64>();

    let allowed_samples = count(samples, SampleResult::Allowed);
    let denied_samples = count(samples, SampleResult::Denied);
    let classified_samples = allowed_samples + denied_samples;

    let allowed_requests = scale(allowed_samples, classified_samples, successful_requests);
    let denied_requests = scale(denied_samples, classified_samples, successful_requests);

    AggregateReport {
        total_requests,
        successful_requests,
        failed_requests,
        success_rate: percentage(successful_requests, total_requests),

        avg_response_time_ms: mean(iterations, |m| m.avg_response_time_ms),
        min_response_time_ms: iterations
            .iter()
            .map(IterationMetrics::min_response_time_ms)
            .reduce(f64::min)
            .unwrap_or(0.0),
        max_response_time_ms: iterations
            .iter()
            .map(IterationMetrics::max_response_time_ms)
            .reduce(f64::max)
            .unwrap_or(0.0),
        p50_ms: mean(iterations, |m| m.percentile(50)),
        p80_ms: mean(iterations, |m| m.percentile(80)),
        p95_ms: mean(iterations, |m| m.percentile(95)),
        p99_ms: mean(iterations, |m| m.percentile(99)),

        requests_per_second: if elapsed_seconds > 0.0 {
            total_requests as f64 / elapsed_seconds
        } else {
            0.0
        },
        total_duration_seconds: elapsed_seconds,

        allowed_requests,
        denied_requests,
        allow_rate: percentage(allowed_requests, successful_requests),
        deny_rate: percentage(denied_requests, successful_requests),
        sampled_requests: samples.len(),
        classified_samples,

        iterations: iterations.len(),
    }
}

fn count(samples: &[SampleResult], kind: SampleResult) -> usize {
    samples.iter().filter(|s| **s == kind).count()
}

fn mean(iterations: &[IterationMetrics], value: impl Fn(&IterationMetrics) -> f64) -> f64 {
    if iterations.is_empty() {
        return 0.0;
    }

    iterations.iter().map(value).sum::<f64>() / iterations.len() as f64
}

fn scale(part: usize, whole: usize, onto: u64) -> u64 {
    if whole == 0 {
        return 0;
    }

    (part as f64 / whole as f64 * onto as f64).round() as u64
}

/// `part` as a percentage of `whole`, rounded to 2 decimals.
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }

    round2(part as f64 / whole as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn metrics(total: u64, failed: u64, avg: f64, percentiles: &[(u32, f64)]) -> IterationMetrics {
        let mut metrics = IterationMetrics::new(total, failed);
        metrics.avg_response_time_ms = avg;
        metrics.percentiles = percentiles.iter().copied().collect::<BTreeMap<_, _>>();
        metrics
    }

    fn samples(allowed: usize, denied: usize, unknown: usize) -> Vec<SampleResult> {
        std::iter::repeat(SampleResult::Allowed)
            .take(allowed)
            .chain(std::iter::repeat(SampleResult::Denied).take(denied))
            .chain(std::iter::repeat(SampleResult::Unknown).take(unknown))
            .collect()
    }

    #[test]
    fn sums_counts_across_iterations() {
        let report = aggregate(
            &[metrics(500, 0, 10.0, &[]), metrics(500, 10, 20.0, &[])],
            &[],
            2.0,
        );

        assert_eq!(report.total_requests, 1000);
        assert_eq!(report.failed_requests, 10);
        assert_eq!(report.successful_requests, 990);
        assert_eq!(report.success_rate, 99.0);
        assert_eq!(report.iterations, 2);
    }

    #[test]
    fn timings_are_means_and_extrema() {
        let report = aggregate(
            &[
                metrics(100, 0, 10.0, &[(0, 2.0), (50, 10.0), (95, 30.0), (100, 60.0)]),
                metrics(100, 0, 20.0, &[(0, 1.0), (50, 14.0), (95, 50.0), (100, 90.0)]),
            ],
            &[],
            1.0,
        );

        assert_eq!(report.avg_response_time_ms, 15.0);
        assert_eq!(report.min_response_time_ms, 1.0);
        assert_eq!(report.max_response_time_ms, 90.0);
        assert_eq!(report.p50_ms, 12.0);
        assert_eq!(report.p95_ms, 40.0);
    }

    #[test]
    fn missing_percentile_counts_as_zero() {
        let report = aggregate(
            &[
                metrics(100, 0, 10.0, &[(99, 40.0)]),
                metrics(100, 0, 10.0, &[]),
            ],
            &[],
            1.0,
        );

        assert_eq!(report.p99_ms, 20.0);
        assert_eq!(report.p80_ms, 0.0);
    }

    #[test]
    fn throughput_uses_wall_clock_for_whole_run() {
        let mut fast = metrics(1000, 0, 1.0, &[]);
        fast.requests_per_second = 5000.0;
        let mut slow = metrics(1000, 0, 1.0, &[]);
        slow.requests_per_second = 100.0;

        let report = aggregate(&[fast, slow], &[], 4.0);

        assert_eq!(report.requests_per_second, 500.0);
        assert_eq!(report.total_duration_seconds, 4.0);
    }

    #[test]
    fn scales_sample_split_onto_successful_requests() {
        let report = aggregate(&[metrics(1000, 60, 1.0, &[])], &samples(6, 4, 0), 1.0);

        assert_eq!(report.successful_requests, 940);
        assert_eq!(report.allowed_requests, 564);
        assert_eq!(report.denied_requests, 376);
        assert_eq!(report.allow_rate, 60.0);
        assert_eq!(report.deny_rate, 40.0);
        assert_eq!(report.classified_samples, 10);
    }

    #[test]
    fn rates_follow_rounded_estimates() {
        let report = aggregate(&[metrics(200, 10, 1.0, &[])], &samples(2, 1, 0), 1.0);

        assert_eq!(report.successful_requests, 190);
        assert_eq!(report.allowed_requests, 127);
        assert_eq!(report.denied_requests, 63);
        // 127/190 and 63/190, not the 2/3 and 1/3 sample proportions
        assert_eq!(report.allow_rate, 66.84);
        assert_eq!(report.deny_rate, 33.16);
    }

    #[test]
    fn unknown_samples_are_excluded_from_split() {
        let report = aggregate(&[metrics(100, 0, 1.0, &[])], &samples(1, 1, 3), 1.0);

        assert_eq!(report.sampled_requests, 5);
        assert_eq!(report.classified_samples, 2);
        assert_eq!(report.allowed_requests, 50);
        assert_eq!(report.denied_requests, 50);
    }

    #[test]
    fn rounding_stays_within_one_of_successful() {
        for (allowed, denied) in [(1, 2), (2, 1), (1, 1), (3, 7), (1, 5)] {
            for successful in [1_u64, 3, 5, 7, 999] {
                let report = aggregate(&[metrics(successful, 0, 1.0, &[])], &samples(allowed, denied, 0), 1.0);
                assert!(
                    report.allowed_requests + report.denied_requests <= report.successful_requests + 1,
                    "{allowed}/{denied} onto {successful}: {report:?}"
                );
            }
        }
    }

    #[test]
    fn empty_inputs_give_zero_rates() {
        let report = aggregate(&[], &[], 0.0);

        assert_eq!(report, AggregateReport::default());
    }

    #[test]
    fn no_classified_samples_gives_zero_split() {
        let report = aggregate(&[metrics(100, 0, 1.0, &[])], &samples(0, 0, 2), 1.0);

        assert_eq!(report.allowed_requests, 0);
        assert_eq!(report.denied_requests, 0);
        assert_eq!(report.allow_rate, 0.0);
        assert_eq!(report.deny_rate, 0.0);
    }

    #[test]
    fn no_successful_requests_gives_zero_rates() {
        let report = aggregate(&[metrics(100, 100, 1.0, &[])], &samples(3, 1, 0), 1.0);

        assert_eq!(report.success_rate, 0.0);
        assert_eq!(report.allowed_requests, 0);
        assert_eq!(report.allow_rate, 0.0);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let iterations = [
            metrics(300, 3, 12.5, &[(50, 11.0), (100, 40.0)]),
            metrics(700, 1, 9.5, &[(50, 8.0), (100, 35.0)]),
        ];
        let samples = samples(2, 5, 1);

        assert_eq!(
            aggregate(&iterations, &samples, 3.5),
            aggregate(&iterations, &samples, 3.5)
        );
    }
}
