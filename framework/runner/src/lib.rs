mod ab_binary;
mod aggregate;
mod artifact;
mod cli;
mod config;
mod error;
mod init;
mod invoker;
mod parser;
mod payloads;
mod process;
mod progress;
mod run;
mod sampler;
mod shutdown;
mod summary;
mod types;

pub mod prelude {
    pub use crate::ab_binary::{ab_path, LT_AB_PATH_ENV};
    pub use crate::aggregate::aggregate;
    pub use crate::artifact::StagedArtifact;
    pub use crate::cli::{run_from_cli, LoadTunnelCli};
    pub use crate::config::{decision_url, RunConfig, DEFAULT_BASE_URL};
    pub use crate::error::{ProcessError, RunError, SampleCallError};
    pub use crate::init::init;
    pub use crate::invoker::{benchmark_args, BenchmarkInvoker};
    pub use crate::parser::{parse_percentiles, parse_report};
    pub use crate::payloads::{load_payloads, parse_payloads};
    pub use crate::process::{ProcessInvoker, ProcessOutput, TokioProcessInvoker};
    pub use crate::progress::ProgressObserver;
    pub use crate::run::{NoopObserver, RunAccumulator, RunController, RunObserver, RunPhase};
    pub use crate::sampler::{interpret_response, DecisionClient, HttpDecisionClient, OutcomeSampler};
    pub use crate::shutdown::{start_shutdown_listener, DelegatedShutdownListener, ShutdownHandle};
    pub use crate::summary::print_summary;
    pub use crate::types::LoadTunnelResult;

    pub use load_tunnel_summary_model::{
        AggregateReport, IterationMetrics, RunSettings, RunSummary, SampleResult, TestInput,
    };
}
