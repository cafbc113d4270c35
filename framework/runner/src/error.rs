use std::time::Duration;

use thiserror::Error;

use load_tunnel_core::prelude::ShutdownSignalError;

/// A terminal error for a load test run. A run either produces a complete report or one of these.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Invalid run configuration: {0}")]
    InvalidArgument(String),

    #[error("Benchmark failed on iteration {iteration} (exit status: {}): {stderr}", status.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string()))]
    BenchmarkExecution {
        iteration: usize,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Benchmark did not finish within {timeout:?} on iteration {iteration}")]
    BenchmarkTimeout { iteration: usize, timeout: Duration },

    #[error("Failed to stage payload artifact for {context}")]
    ArtifactIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] ShutdownSignalError),
}

/// Failure of the external process used to run a benchmark.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to run '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' did not exit within {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
}

/// Failure of a single outcome sample. These are logged and the sample is dropped.
#[derive(Error, Debug)]
pub enum SampleCallError {
    #[error("Failed to stage sample payload")]
    Artifact(#[source] std::io::Error),

    #[error("Invalid decision URL")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Decision request failed")]
    Transport(#[from] reqwest::Error),

    #[error("Decision service responded with status {0}")]
    Status(u16),

    #[error("Decision response is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Decision response has no `result` field: {0}")]
    MissingResult(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_names_iteration_and_status() {
        let err = RunError::BenchmarkExecution {
            iteration: 2,
            status: Some(22),
            stderr: "apr_socket_connect(): Connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Benchmark failed on iteration 2 (exit status: 22): apr_socket_connect(): Connection refused"
        );

        let killed = RunError::BenchmarkExecution {
            iteration: 1,
            status: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("exit status: none"));
    }
}
