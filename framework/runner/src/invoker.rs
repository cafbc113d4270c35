use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use load_tunnel_summary_model::TestInput;

use crate::artifact::StagedArtifact;
use crate::error::{ProcessError, RunError};
use crate::process::ProcessInvoker;

/// Runs one benchmark iteration against the decision endpoint with the external benchmark tool.
#[derive(Debug)]
pub struct BenchmarkInvoker<P: ProcessInvoker> {
    process: P,
    binary: PathBuf,
    timeout: Duration,
}

impl<P: ProcessInvoker> BenchmarkInvoker<P> {
    /// Create an invoker that runs `binary` through `process`, killing any iteration that takes
    /// longer than `timeout`.
    pub fn new(process: P, binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            process,
            binary: binary.into(),
            timeout,
        }
    }

    /// Issue `total_requests` POST requests at `concurrency` against `target_url`, all carrying
    /// `payload`, and return the benchmark's textual report.
    ///
    /// The payload is staged in `artifact_dir` for the duration of the call only.
    pub async fn invoke(
        &self,
        iteration: usize,
        target_url: &Url,
        total_requests: u64,
        concurrency: u64,
        payload: &TestInput,
        artifact_dir: &Path,
    ) -> Result<String, RunError> {
        let artifact = self.stage(iteration, payload, artifact_dir)?;
        let result = self
            .run(iteration, target_url, total_requests, concurrency, &artifact)
            .await;
        artifact.release();

        result
    }

    /// Write the request body for an iteration. Failing to stage is fatal to the run.
    pub fn stage(
        &self,
        iteration: usize,
        payload: &TestInput,
        artifact_dir: &Path,
    ) -> Result<StagedArtifact, RunError> {
        StagedArtifact::stage(artifact_dir, &format!("ab-request-{iteration}"), payload).map_err(
            |source| RunError::ArtifactIo {
                context: format!("iteration {iteration}"),
                source,
            },
        )
    }

    /// Run the benchmark with an already staged request body.
    pub async fn run(
        &self,
        iteration: usize,
        target_url: &Url,
        total_requests: u64,
        concurrency: u64,
        artifact: &StagedArtifact,
    ) -> Result<String, RunError> {
        let args = benchmark_args(target_url, total_requests, concurrency, artifact.path());

        let output = self
            .process
            .run(&self.binary, &args, self.timeout)
            .await
            .map_err(|e| match e {
                ProcessError::TimedOut { timeout, .. } => {
                    RunError::BenchmarkTimeout { iteration, timeout }
                }
                ProcessError::Spawn { .. } => RunError::BenchmarkExecution {
                    iteration,
                    status: None,
                    stderr: format!("{:#}", anyhow::Error::from(e)),
                },
            })?;

        if !output.success() {
            return Err(RunError::BenchmarkExecution {
                iteration,
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Arguments for Apache Bench: POST the staged body as JSON, with the concurrency never exceeding
/// the number of requests.
pub fn benchmark_args(
    target_url: &Url,
    total_requests: u64,
    concurrency: u64,
    body_path: &Path,
) -> Vec<String> {
    vec![
        "-n".to_string(),
        total_requests.to_string(),
        "-c".to_string(),
        concurrency.min(total_requests).to_string(),
        "-p".to_string(),
        body_path.display().to_string(),
        "-T".to_string(),
        "application/json".to_string(),
        target_url.to_string(),
    ]
}
