use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

mod iteration;
mod report;

pub use iteration::{IterationMetrics, SampleResult, TestInput};
pub use report::AggregateReport;

/// The settings a run was started with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSettings {
    /// The decision service URL that the benchmark targeted
    pub target_url: String,
    /// The policy path below the decision service data API, e.g. `app/abac/allow`
    pub target_path: String,
    /// Requests issued per iteration
    pub total_requests: u64,
    /// Number of benchmark iterations
    pub iterations: usize,
    /// Concurrency passed to the benchmark, after limiting it to the request count
    pub concurrency: u64,
    /// Number of payloads that were available for staging and sampling
    pub payload_count: usize,
}

/// Summary of a run, as written by the `load-tunnel` binary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run.
    pub run_id: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    pub settings: RunSettings,
    /// Environment variables that influenced the run
    ///
    /// This won't capture all environment variables, just the ones that the runner reads.
    pub env: HashMap<String, String>,
    /// The version of Load Tunnel that produced this summary
    pub load_tunnel_version: String,
    pub report: AggregateReport,
}

impl RunSummary {
    pub fn new(
        run_id: String,
        started_at: i64,
        settings: RunSettings,
        report: AggregateReport,
        load_tunnel_version: String,
    ) -> Self {
        Self {
            run_id,
            started_at,
            settings,
            env: HashMap::with_capacity(0),
            load_tunnel_version,
            report,
        }
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Compute a fingerprint for the configuration of this run
    ///
    /// Two runs with the same fingerprint are comparable. It uses the
    ///     - Target path
    ///     - Request count, iteration count and concurrency
    ///     - Payload count
    ///     - Selected environment variables
    ///     - Load Tunnel version
    ///
    /// The target URL is left out so that the same test against different hosts compares.
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.settings.target_path.as_bytes());
        Digest::update(&mut hasher, self.settings.total_requests.to_le_bytes());
        Digest::update(&mut hasher, (self.settings.iterations as u64).to_le_bytes());
        Digest::update(&mut hasher, self.settings.concurrency.to_le_bytes());
        Digest::update(&mut hasher, (self.settings.payload_count as u64).to_le_bytes());
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.load_tunnel_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Write the run summary to a file, replacing any existing content
pub fn write_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer as pretty printed JSON
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, run_summary)?;
    Ok(())
}
