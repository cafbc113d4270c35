use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use load_tunnel_core::prelude::{DelegatedShutdownListener, ShutdownSignalError};
use load_tunnel_summary_model::{AggregateReport, IterationMetrics};

use crate::aggregate::aggregate;
use crate::config::RunConfig;
use crate::error::RunError;
use crate::invoker::BenchmarkInvoker;
use crate::parser::parse_report;
use crate::process::ProcessInvoker;
use crate::sampler::{DecisionClient, OutcomeSampler};

/// The states a run moves through. Iteration numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Staging(usize),
    Invoking(usize),
    Parsing(usize),
    Sampling,
    Aggregating,
    Done,
    Failed,
}

impl Display for RunPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Staging(i) => write!(f, "staging iteration {i}"),
            RunPhase::Invoking(i) => write!(f, "benchmarking iteration {i}"),
            RunPhase::Parsing(i) => write!(f, "parsing iteration {i}"),
            RunPhase::Sampling => write!(f, "sampling decisions"),
            RunPhase::Aggregating => write!(f, "aggregating"),
            RunPhase::Done => write!(f, "done"),
            RunPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Notified of every [RunPhase] transition, in order.
pub trait RunObserver: Send + Sync {
    fn on_transition(&self, phase: RunPhase);
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn on_transition(&self, _phase: RunPhase) {}
}

/// Metrics of the iterations completed so far.
///
/// Each transition consumes the accumulator and returns a new one rather than mutating shared
/// state, so a failed iteration simply never produces the next accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunAccumulator {
    iterations: Vec<IterationMetrics>,
}

impl RunAccumulator {
    pub fn with_iteration(mut self, metrics: IterationMetrics) -> Self {
        self.iterations.push(metrics);
        self
    }

    pub fn iterations(&self) -> &[IterationMetrics] {
        &self.iterations
    }
}

/// Sequences benchmark iterations, outcome sampling and aggregation into one report.
///
/// Iterations run strictly one after another. Any iteration failure aborts the run and the
/// results of earlier iterations are discarded. Sampling runs once, after the last iteration.
pub struct RunController<P: ProcessInvoker, C: DecisionClient> {
    invoker: BenchmarkInvoker<P>,
    sampler: OutcomeSampler<C>,
    observer: Arc<dyn RunObserver>,
    shutdown_listener: Option<DelegatedShutdownListener>,
}

impl<P: ProcessInvoker, C: DecisionClient> RunController<P, C> {
    pub fn new(invoker: BenchmarkInvoker<P>, sampler: OutcomeSampler<C>) -> Self {
        Self {
            invoker,
            sampler,
            observer: Arc::new(NoopObserver),
            shutdown_listener: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Cancel the run, ending in [RunError::Cancelled], when this listener receives a shutdown.
    /// A listener whose handles are all dropped never cancels.
    pub fn with_shutdown_listener(mut self, listener: DelegatedShutdownListener) -> Self {
        self.shutdown_listener = Some(listener);
        self
    }

    /// Run the load test described by `config`.
    ///
    /// Returns the complete report, or the first error that stopped the run.
    pub async fn run(&self, config: &RunConfig) -> Result<AggregateReport, RunError> {
        self.transition(RunPhase::Idle);

        match self.execute(config).await {
            Ok(report) => {
                self.transition(RunPhase::Done);
                Ok(report)
            }
            Err(e) => {
                log::error!("Load test run failed: {e}");
                self.transition(RunPhase::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&self, config: &RunConfig) -> Result<AggregateReport, RunError> {
        config.validate()?;

        log::info!(
            "Running {} iteration(s) of {} requests at concurrency {} against {}",
            config.iterations,
            config.total_requests,
            config.effective_concurrency(),
            config.target_url()?
        );

        let mut shutdown_listener = self.shutdown_listener.clone();
        let started = Instant::now();

        let mut accumulator = RunAccumulator::default();
        for index in 0..config.iterations {
            if let Some(listener) = shutdown_listener.as_mut() {
                if listener.should_shutdown() {
                    return Err(ShutdownSignalError::default().into());
                }
            }
            accumulator = until_shutdown(
                &mut shutdown_listener,
                self.run_iteration(config, index, accumulator),
            )
            .await?;
        }

        let elapsed_seconds = started.elapsed().as_secs_f64();

        self.transition(RunPhase::Sampling);
        let samples = until_shutdown(&mut shutdown_listener, async {
            Ok(self
                .sampler
                .sample(&config.target_path, &config.payloads)
                .await)
        })
        .await?;

        self.transition(RunPhase::Aggregating);
        let report = aggregate(accumulator.iterations(), &samples, elapsed_seconds);

        log::info!(
            "Run complete: {} requests, {:.2}% successful, {:.2} requests/s",
            report.total_requests,
            report.success_rate,
            report.requests_per_second
        );

        Ok(report)
    }

    async fn run_iteration(
        &self,
        config: &RunConfig,
        index: usize,
        accumulator: RunAccumulator,
    ) -> Result<RunAccumulator, RunError> {
        let iteration = index + 1;
        let payload = config.payload_for_iteration(index).ok_or_else(|| {
            RunError::InvalidArgument("no payloads provided".to_string())
        })?;
        log::info!("Iteration {iteration}/{}", config.iterations);

        self.transition(RunPhase::Staging(iteration));
        let artifact = self
            .invoker
            .stage(iteration, payload, &config.artifact_dir)?;

        self.transition(RunPhase::Invoking(iteration));
        let raw_report = self
            .invoker
            .run(
                iteration,
                &config.target_url()?,
                config.total_requests,
                config.effective_concurrency(),
                &artifact,
            )
            .await;
        artifact.release();
        let raw_report = raw_report?;

        self.transition(RunPhase::Parsing(iteration));
        let metrics = parse_report(&raw_report);
        log::info!(
            "Iteration {iteration}: {} requests, {} failed, {:.2}ms mean, {:.2} requests/s",
            metrics.total_requests,
            metrics.failed_requests,
            metrics.avg_response_time_ms,
            metrics.requests_per_second
        );

        Ok(accumulator.with_iteration(metrics))
    }

    fn transition(&self, phase: RunPhase) {
        log::debug!("Run phase: {phase}");
        self.observer.on_transition(phase);
    }
}

/// Race `fut` against the shutdown listener, if there is one.
async fn until_shutdown<T>(
    shutdown_listener: &mut Option<DelegatedShutdownListener>,
    fut: impl Future<Output = Result<T, RunError>>,
) -> Result<T, RunError> {
    match shutdown_listener {
        Some(listener) => {
            tokio::select! {
                biased;
                _ = listener.wait_for_shutdown() => Err(ShutdownSignalError::default().into()),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}
