//! Direct, one at a time calls to the decision endpoint to estimate the allow/deny split of a run.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use url::Url;

use load_tunnel_summary_model::{SampleResult, TestInput};

use crate::artifact::StagedArtifact;
use crate::config::decision_url;
use crate::error::SampleCallError;

/// Evaluates one staged request body against the decision endpoint and returns the raw JSON
/// response.
pub trait DecisionClient: Send + Sync {
    fn evaluate(
        &self,
        target_path: &str,
        body_path: &Path,
    ) -> impl Future<Output = Result<Value, SampleCallError>> + Send;
}

/// [DecisionClient] that POSTs to the decision service data API, e.g.
/// `http://localhost:8181/v1/data/<target path>`.
#[derive(Debug, Clone)]
pub struct HttpDecisionClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDecisionClient {
    pub fn new(base_url: Url, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

impl DecisionClient for HttpDecisionClient {
    async fn evaluate(&self, target_path: &str, body_path: &Path) -> Result<Value, SampleCallError> {
        let body = tokio::fs::read(body_path)
            .await
            .map_err(SampleCallError::Artifact)?;
        let url = decision_url(&self.base_url, target_path)?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SampleCallError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(SampleCallError::InvalidJson)
    }
}

/// Read the verdict from a decision response.
///
/// The `result` may be the boolean verdict itself or an object with a boolean `allow` field.
/// Anything else is [SampleResult::Unknown]. A response without a `result` field at all is an
/// error, because the decision service did not evaluate the request.
pub fn interpret_response(response: &Value) -> Result<SampleResult, SampleCallError> {
    let result = response
        .get("result")
        .ok_or_else(|| SampleCallError::MissingResult(response.clone()))?;

    Ok(match result {
        Value::Bool(allowed) => SampleResult::from_allowed(*allowed),
        Value::Object(fields) => match fields.get("allow") {
            Some(Value::Bool(allowed)) => SampleResult::from_allowed(*allowed),
            _ => SampleResult::Unknown,
        },
        _ => SampleResult::Unknown,
    })
}

/// Replays payloads against the decision endpoint to classify their outcome.
#[derive(Debug)]
pub struct OutcomeSampler<C: DecisionClient> {
    client: C,
    artifact_dir: PathBuf,
}

impl<C: DecisionClient> OutcomeSampler<C> {
    pub fn new(client: C, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            artifact_dir: artifact_dir.into(),
        }
    }

    /// Classify every payload, strictly one call at a time.
    ///
    /// A call that fails produces no result, so the output may be shorter than `payloads`.
    pub async fn sample(&self, target_path: &str, payloads: &[TestInput]) -> Vec<SampleResult> {
        let mut results = Vec::with_capacity(payloads.len());

        for (index, payload) in payloads.iter().enumerate() {
            match self.sample_one(index, target_path, payload).await {
                Ok(SampleResult::Unknown) => {
                    log::warn!("Sample {index} returned a result without an allow verdict");
                    results.push(SampleResult::Unknown);
                }
                Ok(result) => results.push(result),
                Err(e) => {
                    log::warn!("Dropping sample {index}: {:#}", anyhow::Error::from(e));
                }
            }
        }

        log::info!(
            "Sampled {} of {} payloads, {} classified",
            results.len(),
            payloads.len(),
            results.iter().filter(|r| r.is_classified()).count()
        );

        results
    }

    async fn sample_one(
        &self,
        index: usize,
        target_path: &str,
        payload: &TestInput,
    ) -> Result<SampleResult, SampleCallError> {
        let artifact = StagedArtifact::stage(&self.artifact_dir, &format!("sample-{index}"), payload)
            .map_err(SampleCallError::Artifact)?;

        let response = self.client.evaluate(target_path, artifact.path()).await;
        artifact.release();

        interpret_response(&response?)
    }
}
