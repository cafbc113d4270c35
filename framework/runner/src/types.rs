/// Result type for the CLI and glue code around the engine. The engine itself returns
/// [crate::error::RunError] so that callers can match on the kind of failure.
pub type LoadTunnelResult<T> = anyhow::Result<T>;
