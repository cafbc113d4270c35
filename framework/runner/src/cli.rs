use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use url::Url;

use load_tunnel_summary_model::{write_run_summary, RunSummary};

use crate::ab_binary::{ab_path, LT_AB_PATH_ENV};
use crate::config::{RunConfig, DEFAULT_BASE_URL};
use crate::invoker::BenchmarkInvoker;
use crate::payloads::load_payloads;
use crate::process::TokioProcessInvoker;
use crate::progress::ProgressObserver;
use crate::run::RunController;
use crate::sampler::{HttpDecisionClient, OutcomeSampler};
use crate::shutdown::start_shutdown_listener;
use crate::summary::print_summary;
use crate::types::LoadTunnelResult;

#[derive(Parser, Debug)]
#[command(name = "load-tunnel", about, long_about = None)]
pub struct LoadTunnelCli {
    /// The policy path below the decision service data API to benchmark
    #[clap(long, default_value = "app/abac/allow")]
    pub target_path: String,

    /// The decision service data API
    #[clap(long, default_value = DEFAULT_BASE_URL, value_parser = parse_base_url)]
    pub base_url: Url,

    /// A JSON file with an array of decision inputs
    ///
    /// Iterations cycle through the inputs and every input is replayed once after the benchmark
    /// to estimate the allow/deny split.
    #[clap(long)]
    pub payloads: PathBuf,

    /// The number of requests per iteration
    #[clap(long, default_value = "1000")]
    pub requests: u64,

    /// The number of benchmark iterations to run
    #[clap(long, default_value = "1")]
    pub iterations: usize,

    /// The number of concurrent requests, limited to the number of requests
    #[clap(long, default_value = "100")]
    pub concurrency: u64,

    /// The number of seconds a single iteration may run before it is killed and the run fails
    #[clap(long, default_value = "300")]
    pub timeout: u64,

    /// The number of seconds to wait for each decision sample
    #[clap(long, default_value = "10")]
    pub sample_timeout: u64,

    /// Where to stage transient request bodies, defaults to the system temp directory
    #[clap(long)]
    pub artifact_dir: Option<PathBuf>,

    /// Where to write the run summary, defaults to `load-test-report-<timestamp>.json`
    #[clap(long)]
    pub output: Option<PathBuf>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}

impl LoadTunnelCli {
    /// Build the engine configuration, loading the payload file.
    pub fn run_config(&self) -> LoadTunnelResult<RunConfig> {
        let payloads = load_payloads(&self.payloads)?;

        let mut config = RunConfig::new(self.target_path.clone(), payloads)?;
        config.base_url = self.base_url.clone();
        config.total_requests = self.requests;
        config.iterations = self.iterations;
        config.concurrency = self.concurrency;
        config.timeout = Duration::from_secs(self.timeout);
        if let Some(artifact_dir) = &self.artifact_dir {
            config.artifact_dir = artifact_dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "load-test-report-{}.json",
                Utc::now().format("%Y-%m-%dT%H.%M.%S%.fZ")
            ))
        })
    }
}

fn parse_base_url(s: &str) -> anyhow::Result<Url> {
    let url = Url::parse(s).with_context(|| format!("Invalid base URL '{s}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Base URL must use http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

/// Run a load test as configured on the command line, print the summary and write it to a file.
pub async fn run_from_cli(cli: LoadTunnelCli) -> LoadTunnelResult<RunSummary> {
    let config = cli.run_config()?;
    let ab = ab_path()?;
    log::info!("Using benchmark binary '{}'", ab.display());

    let shutdown_handle = start_shutdown_listener();

    let invoker = BenchmarkInvoker::new(TokioProcessInvoker, &ab, config.timeout);
    let client = HttpDecisionClient::new(
        config.base_url.clone(),
        Duration::from_secs(cli.sample_timeout),
    )
    .context("Failed to create decision service client")?;
    let sampler = OutcomeSampler::new(client, &config.artifact_dir);

    let mut controller = RunController::new(invoker, sampler)
        .with_shutdown_listener(shutdown_handle.new_listener());
    if !cli.no_progress {
        controller = controller.with_observer(Arc::new(ProgressObserver::new(config.iterations)));
    }

    let started_at = Utc::now().timestamp();
    let report = controller.run(&config).await?;

    let mut summary = RunSummary::new(
        nanoid::nanoid!(),
        started_at,
        config.settings()?,
        report,
        env!("CARGO_PKG_VERSION").to_string(),
    );
    if let Ok(value) = std::env::var(LT_AB_PATH_ENV) {
        summary.add_env(LT_AB_PATH_ENV.to_string(), value);
    }

    print_summary(&summary);

    let output = cli.output_path();
    write_run_summary(&summary, &output)
        .with_context(|| format!("Failed to write run summary to '{}'", output.display()))?;
    log::info!(
        "Wrote run summary to '{}' (fingerprint {})",
        output.display(),
        summary.fingerprint()
    );

    Ok(summary)
}
