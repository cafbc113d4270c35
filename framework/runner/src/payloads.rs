use std::path::Path;

use anyhow::{bail, Context};
use serde_json::Value;

use load_tunnel_summary_model::TestInput;

use crate::types::LoadTunnelResult;

/// Load decision inputs from a JSON file containing an array.
///
/// Entries may be raw inputs or already wrapped as `{"input": ...}`, which is what the data
/// generator produces. Wrapped entries are unwrapped because the request body is built later.
pub fn load_payloads(path: &Path) -> LoadTunnelResult<Vec<TestInput>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payloads from '{}'", path.display()))?;
    parse_payloads(&content)
        .with_context(|| format!("Invalid payloads in '{}'", path.display()))
}

pub fn parse_payloads(content: &str) -> LoadTunnelResult<Vec<TestInput>> {
    let value: Value = serde_json::from_str(content).context("Payloads are not valid JSON")?;
    let Value::Array(entries) = value else {
        bail!("Expected a JSON array of decision inputs");
    };

    Ok(entries.into_iter().map(unwrap_input).collect())
}

fn unwrap_input(entry: Value) -> TestInput {
    match entry {
        Value::Object(mut fields) if fields.len() == 1 && fields.contains_key("input") => {
            fields.remove("input").unwrap_or(Value::Null)
        }
        other => other,
    }
}
