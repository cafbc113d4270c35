//! Converts the textual report of one benchmark iteration into [IterationMetrics].
//!
//! The report is expected to follow the line oriented layout that Apache Bench prints. Parsing is
//! tolerant: a line that cannot be found leaves its field at `0`, and nothing in here fails.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use load_tunnel_summary_model::IterationMetrics;

const PERCENTILE_SECTION_HEADER: &str = "Percentage of the requests served within";

struct ReportPatterns {
    complete_requests: Regex,
    failed_requests: Regex,
    non_2xx_responses: Regex,
    mean_time_per_request: Regex,
    requests_per_second: Regex,
    time_taken: Regex,
    percentile: Regex,
}

fn patterns() -> &'static ReportPatterns {
    static PATTERNS: OnceLock<ReportPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("Invalid report pattern");
        ReportPatterns {
            complete_requests: re(r"(?m)^\s*Complete requests:\s+(\d+)"),
            failed_requests: re(r"(?m)^\s*Failed requests:\s+(\d+)"),
            non_2xx_responses: re(r"(?m)^\s*Non-2xx responses:\s+(\d+)"),
            // The second "Time per request" line is "(mean, across all concurrent requests)".
            mean_time_per_request: re(r"(?m)^\s*Time per request:\s+([\d.]+)\s+\[ms\]\s+\(mean\)"),
            requests_per_second: re(r"(?m)^\s*Requests per second:\s+([\d.]+)"),
            time_taken: re(r"(?m)^\s*Time taken for tests:\s+([\d.]+)\s+seconds"),
            percentile: re(r"^\s*(\d+)%\s+(\d+(?:\.\d+)?)"),
        }
    })
}

/// Parse one raw benchmark report.
///
/// Parsing the same text always gives the same metrics, and a report without any recognised lines
/// gives all-zero metrics.
pub fn parse_report(raw: &str) -> IterationMetrics {
    let patterns = patterns();

    let total_requests = capture::<u64>(&patterns.complete_requests, raw).unwrap_or(0);
    let failed_requests = capture::<u64>(&patterns.failed_requests, raw).unwrap_or(0);

    let mut metrics = IterationMetrics::new(total_requests, failed_requests);
    metrics.non_2xx_responses = capture(&patterns.non_2xx_responses, raw).unwrap_or(0);
    metrics.avg_response_time_ms = capture(&patterns.mean_time_per_request, raw).unwrap_or(0.0);
    metrics.requests_per_second = capture(&patterns.requests_per_second, raw).unwrap_or(0.0);
    metrics.time_taken_seconds = capture(&patterns.time_taken, raw).unwrap_or(0.0);
    metrics.percentiles = parse_percentiles(raw);

    metrics
}

/// Build the sparse percentile table from the lines following the percentile section header, or
/// from every line if the report has no such header.
pub fn parse_percentiles(raw: &str) -> BTreeMap<u32, f64> {
    let lines = raw.lines().collect::<Vec<_>>();
    let section = lines
        .iter()
        .position(|line| line.contains(PERCENTILE_SECTION_HEADER))
        .map(|header| &lines[header + 1..])
        .unwrap_or(&lines[..]);

    let percentile = &patterns().percentile;
    section
        .iter()
        .filter_map(|line| {
            let captures = percentile.captures(line)?;
            let pct = captures[1].parse::<u32>().ok()?;
            let millis = captures[2].parse::<f64>().ok()?;
            Some((pct, millis))
        })
        .collect()
}

fn capture<T: FromStr>(pattern: &Regex, raw: &str) -> Option<T> {
    pattern
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .and_then(|value| value.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const AB_REPORT: &str = r#"This is ApacheBench, Version 2.3 <$Revision: 1903618 $>
Copyright 1996 Adam Twiss, Zeus Technology Ltd, http://www.zeustech.net/
Licensed to The Apache Software Foundation, http://www.apache.org/

Benchmarking localhost (be patient)


Server Software:
Server Hostname:        localhost
Server Port:            8181

Document Path:          /v1/data/app/abac/allow
Document Length:        15 bytes

Concurrency Level:      100
Time taken for tests:   0.512 seconds
Complete requests:      1000
Failed requests:        20
   (Connect: 0, Receive: 0, Length: 20, Exceptions: 0)
Non-2xx responses:      3
Total transferred:      150000 bytes
Total body sent:        421000
HTML transferred:       15000 bytes
Requests per second:    1953.12 [#/sec] (mean)
Time per request:       51.200 [ms] (mean)
Time per request:       0.512 [ms] (mean, across all concurrent requests)
Transfer rate:          286.10 [Kbytes/sec] received
                        803.03 kb/s sent
                        1089.13 kb/s total

Connection Times (ms)
              min  mean[+/-sd] median   max
Connect:        0    1   0.5      1       3
Processing:     2   48  10.0     49      78
Waiting:        1   47  10.0     48      77
Total:          2   49  10.1     50      80

Percentage of the requests served within a certain time (ms)
  50%     50
  66%     52
  75%     54
  80%     55
  90%     60
  95%     65
  98%     70
  99%     75
 100%     80 (longest request)
"#;

    #[test]
    fn parses_full_report() {
        let metrics = parse_report(AB_REPORT);

        assert_eq!(metrics.total_requests, 1000);
        assert_eq!(metrics.failed_requests, 20);
        assert_eq!(metrics.successful_requests(), 980);
        assert_eq!(metrics.non_2xx_responses, 3);
        assert_eq!(metrics.avg_response_time_ms, 51.2);
        assert_eq!(metrics.requests_per_second, 1953.12);
        assert_eq!(metrics.time_taken_seconds, 0.512);
        assert_eq!(
            metrics.percentiles.keys().copied().collect::<Vec<_>>(),
            vec![50, 66, 75, 80, 90, 95, 98, 99, 100]
        );
        assert_eq!(metrics.percentile(80), 55.0);
        assert_eq!(metrics.max_response_time_ms(), 80.0);
        // Apache Bench does not print a 0% line.
        assert_eq!(metrics.min_response_time_ms(), 0.0);
    }

    #[test]
    fn parses_minimal_report() {
        let raw = "Complete requests: 1000\nFailed requests: 20\n50% 12\n95% 40\n100% 80\n";

        let metrics = parse_report(raw);

        assert_eq!(metrics.total_requests, 1000);
        assert_eq!(metrics.failed_requests, 20);
        assert_eq!(metrics.percentile(50), 12.0);
        assert_eq!(metrics.percentile(95), 40.0);
        assert_eq!(metrics.max_response_time_ms(), 80.0);
        assert_eq!(metrics.percentile(99), 0.0);
        assert_eq!(metrics.avg_response_time_ms, 0.0);
        assert_eq!(metrics.requests_per_second, 0.0);
    }

    #[test]
    fn empty_report_is_all_zero() {
        assert_eq!(parse_report(""), IterationMetrics::default());
        assert_eq!(parse_report("\n\n   \n"), IterationMetrics::default());
    }

    #[test]
    fn unrelated_text_is_all_zero() {
        let metrics = parse_report("apr_socket_recv: Connection reset by peer (104)\nTotal of 12 requests completed\n");
        assert_eq!(metrics, IterationMetrics::default());
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(parse_report(AB_REPORT), parse_report(AB_REPORT));
    }

    #[test]
    fn failed_greater_than_complete_is_clamped() {
        let metrics = parse_report("Complete requests: 5\nFailed requests: 9\n");
        assert_eq!(metrics.failed_requests, 5);
        assert_eq!(metrics.successful_requests(), 0);
    }

    #[test]
    fn malformed_percentile_lines_are_ignored() {
        let raw = "Percentage of the requests served within a certain time (ms)\n  50%     12\n  abc%    4\n  66%\n  75% fast\n  0%      1\n";

        let percentiles = parse_percentiles(raw);

        assert_eq!(percentiles, BTreeMap::from([(0, 1.0), (50, 12.0)]));
    }

    #[test]
    fn percentile_lines_before_section_header_are_ignored() {
        let raw = "10% 999\nPercentage of the requests served within a certain time (ms)\n  50%     12\n";

        let percentiles = parse_percentiles(raw);

        assert_eq!(percentiles, BTreeMap::from([(50, 12.0)]));
    }

    #[test]
    fn concurrent_mean_line_is_not_mistaken_for_mean() {
        let raw = "Time per request:       0.512 [ms] (mean, across all concurrent requests)\n";
        assert_eq!(parse_report(raw).avg_response_time_ms, 0.0);
    }
}
