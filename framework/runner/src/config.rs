use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use load_tunnel_summary_model::{RunSettings, TestInput};

use crate::error::RunError;

/// Default decision service data API, the Open Policy Agent default.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8181/v1/data";

/// Everything the run controller needs to run a load test.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The policy path below [RunConfig::base_url], e.g. `app/abac/allow`
    pub target_path: String,
    /// The decision service data API
    pub base_url: Url,
    /// Decision inputs. Iterations cycle through these and every one of them is sampled.
    pub payloads: Vec<TestInput>,
    /// Requests per iteration
    pub total_requests: u64,
    pub iterations: usize,
    /// Requested concurrency, limited to [RunConfig::total_requests] when the benchmark runs
    pub concurrency: u64,
    /// Maximum time a single benchmark iteration may take
    pub timeout: Duration,
    /// Where transient payload artifacts are written
    pub artifact_dir: PathBuf,
}

impl RunConfig {
    pub fn new(target_path: impl Into<String>, payloads: Vec<TestInput>) -> Result<Self, RunError> {
        Ok(Self {
            target_path: target_path.into(),
            base_url: Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| RunError::InvalidArgument(format!("base URL: {e}")))?,
            payloads,
            total_requests: 1000,
            iterations: 1,
            concurrency: 100,
            timeout: Duration::from_secs(300),
            artifact_dir: std::env::temp_dir(),
        })
    }

    /// Check the configuration before any process is started.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.payloads.is_empty() {
            return Err(RunError::InvalidArgument("no payloads provided".to_string()));
        }
        if self.target_path.trim_matches('/').is_empty() {
            return Err(RunError::InvalidArgument("target path is empty".to_string()));
        }
        if self.total_requests == 0 {
            return Err(RunError::InvalidArgument(
                "total requests must be greater than 0".to_string(),
            ));
        }
        if self.iterations == 0 {
            return Err(RunError::InvalidArgument(
                "iteration count must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(RunError::InvalidArgument(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(RunError::InvalidArgument(
                "benchmark timeout must be greater than 0".to_string(),
            ));
        }
        self.target_url()?;

        Ok(())
    }

    /// The concurrency the benchmark actually runs with.
    pub fn effective_concurrency(&self) -> u64 {
        self.concurrency.min(self.total_requests)
    }

    /// The payload staged for a 0-based iteration index.
    pub fn payload_for_iteration(&self, index: usize) -> Option<&TestInput> {
        if self.payloads.is_empty() {
            return None;
        }
        self.payloads.get(index % self.payloads.len())
    }

    pub fn target_url(&self) -> Result<Url, RunError> {
        decision_url(&self.base_url, &self.target_path)
            .map_err(|e| RunError::InvalidArgument(format!("target URL: {e}")))
    }

    pub fn settings(&self) -> Result<RunSettings, RunError> {
        Ok(RunSettings {
            target_url: self.target_url()?.to_string(),
            target_path: self.target_path.clone(),
            total_requests: self.total_requests,
            iterations: self.iterations,
            concurrency: self.effective_concurrency(),
            payload_count: self.payloads.len(),
        })
    }
}

/// Join the decision service base URL and a policy path.
pub fn decision_url(base_url: &Url, target_path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        target_path.trim_matches('/')
    ))
}
