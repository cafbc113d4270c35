use tabled::settings::Style;
use tabled::{Table, Tabled};

use load_tunnel_summary_model::{AggregateReport, RunSummary};

#[derive(Tabled)]
struct LatencyRow {
    #[tabled(display = "float2")]
    avg_ms: f64,
    #[tabled(display = "float2")]
    min_ms: f64,
    #[tabled(display = "float2")]
    p50_ms: f64,
    #[tabled(display = "float2")]
    p80_ms: f64,
    #[tabled(display = "float2")]
    p95_ms: f64,
    #[tabled(display = "float2")]
    p99_ms: f64,
    #[tabled(display = "float2")]
    max_ms: f64,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

fn metric_rows(report: &AggregateReport) -> Vec<MetricRow> {
    let row = |metric, value: String| MetricRow { metric, value };

    vec![
        row("Iterations", report.iterations.to_string()),
        row("Total requests", report.total_requests.to_string()),
        row("Successful requests", report.successful_requests.to_string()),
        row("Failed requests", report.failed_requests.to_string()),
        row("Success rate (%)", float2(&report.success_rate)),
        row("Requests/s", float2(&report.requests_per_second)),
        row("Duration (s)", float2(&report.total_duration_seconds)),
        row(
            "Sampled decisions",
            format!("{} ({} classified)", report.sampled_requests, report.classified_samples),
        ),
        row("Allowed requests (estimated)", report.allowed_requests.to_string()),
        row("Denied requests (estimated)", report.denied_requests.to_string()),
        row("Allow rate (%)", float2(&report.allow_rate)),
        row("Deny rate (%)", float2(&report.deny_rate)),
    ]
}

fn render_summary(summary: &RunSummary) -> String {
    let mut metrics = Table::new(metric_rows(&summary.report));
    metrics.with(Style::modern());

    let report = &summary.report;
    let mut latency = Table::new([LatencyRow {
        avg_ms: report.avg_response_time_ms,
        min_ms: report.min_response_time_ms,
        p50_ms: report.p50_ms,
        p80_ms: report.p80_ms,
        p95_ms: report.p95_ms,
        p99_ms: report.p99_ms,
        max_ms: report.max_response_time_ms,
    }]);
    latency.with(Style::modern());

    format!(
        "\nLoad test {} against {}\n{}\n\nResponse times\n{}",
        summary.run_id, summary.settings.target_url, metrics, latency
    )
}

/// Print a human readable summary of a completed run to stdout.
pub fn print_summary(summary: &RunSummary) {
    println!("{}", render_summary(summary));
}
