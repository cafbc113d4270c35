use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{bail, Context};

use crate::types::LoadTunnelResult;

/// Environment variable to override the path to the benchmark binary used for each iteration.
pub const LT_AB_PATH_ENV: &str = "LT_AB_PATH";

const AB_BINARY: &str = "ab";

/// Locate Apache Bench, honouring [`LT_AB_PATH_ENV`] before searching `PATH`.
pub fn ab_path() -> LoadTunnelResult<PathBuf> {
    resolve_ab_path(std::env::var_os(LT_AB_PATH_ENV), || which::which(AB_BINARY))
}

/// Pick the benchmark binary from an optional override, falling back to `search`.
///
/// A bare `ab` override is treated the same as no override. Any other override must name an
/// existing file, a directory is rejected since `ab` would fail to spawn from it anyway.
fn resolve_ab_path(
    configured: Option<OsString>,
    search: impl FnOnce() -> which::Result<PathBuf>,
) -> LoadTunnelResult<PathBuf> {
    let configured = configured.filter(|value| value != AB_BINARY);

    let Some(configured) = configured else {
        log::debug!("No benchmark binary configured in '{LT_AB_PATH_ENV}', searching 'PATH'");
        return search().with_context(|| {
            format!("Apache Bench ({AB_BINARY}) not found in PATH. Install it or set '{LT_AB_PATH_ENV}'")
        });
    };

    if configured.is_empty() {
        bail!("'{LT_AB_PATH_ENV}' is set but empty");
    }

    let path = PathBuf::from(configured);
    if !path.is_file() {
        bail!(
            "'{LT_AB_PATH_ENV}={}' does not point to a benchmark binary",
            path.display()
        );
    }

    Ok(path)
}
