//! Object-storage sinks for durable artifact upload.
//!
//! Uploads are best-effort: a failed upload is logged and never aborts the
//! run. The local run directory remains the source of truth.

use crate::error::{TrainError, TrainResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub trait ObjectStore: Send {
    fn upload(&self, local: &Path, key: &str) -> TrainResult<()>;
}

/// Mirrors artifacts into another directory (mounted-bucket style).
pub struct DirObjectStore {
    root: PathBuf,
}

impl DirObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ObjectStore for DirObjectStore {
    fn upload(&self, local: &Path, key: &str) -> TrainResult<()> {
        let dest = self.root.join(key);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrainError::sink(format!("mirror dir {key}: {e}")))?;
        }
        std::fs::copy(local, &dest).map_err(|e| TrainError::sink(format!("mirror copy {key}: {e}")))?;
        Ok(())
    }
}

/// PUTs artifacts to `<endpoint>/<key>` over HTTP.
pub struct HttpObjectStore {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl ObjectStore for HttpObjectStore {
    fn upload(&self, local: &Path, key: &str) -> TrainResult<()> {
        let bytes =
            std::fs::read(local).map_err(|e| TrainError::sink(format!("upload read {key}: {e}")))?;
        let url = format!("{}/{key}", self.endpoint);
        let response = self
            .client
            .put(&url)
            .body(bytes)
            .send()
            .map_err(|e| TrainError::sink(format!("upload {key}: {e}")))?;
        if !response.status().is_success() {
            return Err(TrainError::sink(format!(
                "upload {key}: server returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Upload every file in the run directory under `runs/<run_id>/`.
///
/// Returns the number of files uploaded; individual failures are warned
/// and skipped.
pub fn upload_run_artifacts(store: &dyn ObjectStore, run_dir: &Path, run_id: &str) -> usize {
    let mut uploaded = 0;
    for entry in WalkDir::new(run_dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(run_dir) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        let key = format!("runs/{run_id}/{rel}");
        match store.upload(entry.path(), &key) {
            Ok(()) => uploaded += 1,
            Err(e) => tracing::warn!(error = %e, %key, "artifact upload failed"),
        }
    }
    uploaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dir_store_mirrors_files() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let file = src.path().join("state.pt");
        std::fs::write(&file, b"weights").unwrap();

        let store = DirObjectStore::new(dst.path().to_path_buf());
        store.upload(&file, "runs/r1/state.pt").unwrap();

        let mirrored = dst.path().join("runs/r1/state.pt");
        assert_eq!(std::fs::read(mirrored).unwrap(), b"weights");
    }

    #[test]
    fn test_upload_run_artifacts_walks_the_run_dir() {
        let run = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        std::fs::write(run.path().join("state.pt"), b"s").unwrap();
        std::fs::write(run.path().join("metrics.json"), b"[]").unwrap();

        let store = DirObjectStore::new(dst.path().to_path_buf());
        let n = upload_run_artifacts(&store, run.path(), "r2");

        assert_eq!(n, 2);
        assert!(dst.path().join("runs/r2/state.pt").exists());
        assert!(dst.path().join("runs/r2/metrics.json").exists());
    }

    #[test]
    fn test_missing_source_is_sink_error() {
        let dst = TempDir::new().unwrap();
        let store = DirObjectStore::new(dst.path().to_path_buf());
        let err = store.upload(Path::new("/nonexistent/file"), "runs/r/x").unwrap_err();
        assert!(err.is_best_effort());
    }
}
