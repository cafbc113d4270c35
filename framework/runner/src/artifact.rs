//! Transient on-disk copies of a request payload, owned by the call that staged them.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use load_tunnel_summary_model::TestInput;

/// A payload written to disk as the JSON request body `{"input": <payload>}`.
///
/// The file name combines the caller's label with a random suffix, so concurrent callers never
/// share a file. The file is removed when the artifact is [released](StagedArtifact::release) or
/// dropped, whichever happens first. Removal failures are logged and never returned, so that they
/// cannot hide the result of the work the artifact was staged for.
#[derive(Debug)]
pub struct StagedArtifact {
    file: Option<NamedTempFile>,
    path: PathBuf,
}

impl StagedArtifact {
    /// Write the request body for `payload` into a new file in `dir`.
    pub fn stage(dir: &Path, label: &str, payload: &TestInput) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{label}-"))
            .suffix(".json")
            .tempfile_in(dir)?;

        let body = serde_json::json!({ "input": payload });
        serde_json::to_writer(file.as_file_mut(), &body)?;
        file.as_file_mut().flush()?;

        let path = file.path().to_path_buf();
        log::trace!("Staged payload artifact '{}'", path.display());

        Ok(Self {
            file: Some(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the artifact now rather than waiting for it to be dropped.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(file) = self.file.take() {
            match file.close() {
                Ok(()) => log::trace!("Removed payload artifact '{}'", self.path.display()),
                Err(e) => log::warn!(
                    "Failed to remove payload artifact '{}': {e}",
                    self.path.display()
                ),
            }
        }
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn stage_writes_wrapped_input() {
        let dir = TempDir::new().unwrap();
        let payload = serde_json::json!({ "user": { "id": "u-0" }, "action": "read" });

        let artifact = StagedArtifact::stage(dir.path(), "ab-request-0", &payload).unwrap();

        let content = std::fs::read_to_string(artifact.path()).unwrap();
        let body: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(body, serde_json::json!({ "input": payload }));

        let name = artifact.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("ab-request-0-"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn release_removes_file() {
        let dir = TempDir::new().unwrap();
        let artifact = StagedArtifact::stage(dir.path(), "sample-1", &serde_json::json!({})).unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());

        artifact.release();

        assert!(!path.exists());
        assert_eq!(files_in(dir.path()), 0);
    }

    #[test]
    fn drop_removes_file_on_error_path() {
        let dir = TempDir::new().unwrap();

        let result: Result<(), &str> = (|| {
            let _artifact = StagedArtifact::stage(dir.path(), "ab-request-1", &serde_json::json!(1))
                .map_err(|_| "stage failed")?;
            Err("benchmark failed")
        })();

        assert_eq!(result, Err("benchmark failed"));
        assert_eq!(files_in(dir.path()), 0);
    }

    #[test]
    fn same_label_gets_distinct_files() {
        let dir = TempDir::new().unwrap();
        let payload = serde_json::json!({ "action": "write" });

        let first = StagedArtifact::stage(dir.path(), "ab-request-0", &payload).unwrap();
        let second = StagedArtifact::stage(dir.path(), "ab-request-0", &payload).unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(files_in(dir.path()), 2);
    }

    #[test]
    fn stage_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        assert!(StagedArtifact::stage(&missing, "ab-request-0", &serde_json::json!({})).is_err());
    }
}
