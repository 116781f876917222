//! Result store backed by one JSON file per dataset.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::ResultStore;
use crate::error::{Result, TidewatchError};
use crate::report::AnalysisResult;

const EXTENSION: &str = "analysis.json";

/// Readable prefix kept from a dataset id.
const MAX_PREFIX_CHARS: usize = 64;

/// Stores each result as pretty-printed JSON under a directory.
///
/// ```text
/// results/
/// ├── harbor-sensors-3f9a1c0e5b7d2a64.analysis.json
/// └── tides_north-8c21d0f4e9a3b775.analysis.json
/// ```
///
/// A loaded document whose `dataset_id` differs from the requested id is
/// treated as absent.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a dataset's result: a readable prefix (characters
    /// outside `[A-Za-z0-9._-]` replaced with `_`) followed by a digest of
    /// the exact id, so ids that sanitize alike still get distinct files.
    pub fn path_for(&self, dataset_id: &str) -> PathBuf {
        let safe: String = dataset_id
            .chars()
            .take(MAX_PREFIX_CHARS)
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let safe = safe.trim_start_matches('.');
        let safe = if safe.is_empty() { "_" } else { safe };
        let digest = format!("{:x}", Sha256::digest(dataset_id.as_bytes()));
        self.dir
            .join(format!("{}-{}.{}", safe, &digest[..16], EXTENSION))
    }
}

impl ResultStore for JsonFileStore {
    fn store_result(&mut self, dataset_id: &str, result: &AnalysisResult) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                TidewatchError::Persistence(format!(
                    "Failed to create directory '{}': {}",
                    self.dir.display(),
                    e
                ))
            })?;
        }

        let path = self.path_for(dataset_id);
        let file = File::create(&path).map_err(|e| {
            TidewatchError::Persistence(format!(
                "Failed to create file '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::to_writer_pretty(BufWriter::new(file), result).map_err(|e| {
            TidewatchError::Persistence(format!("Failed to serialize result: {}", e))
        })?;

        tracing::debug!(dataset_id, path = %path.display(), "stored result");
        Ok(())
    }

    fn load_result(&self, dataset_id: &str) -> Result<Option<AnalysisResult>> {
        let path = self.path_for(dataset_id);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(|e| {
            TidewatchError::Persistence(format!(
                "Failed to open file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let result: AnalysisResult =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                TidewatchError::Persistence(format!(
                    "Failed to parse result '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        if result.dataset_id != dataset_id {
            tracing::warn!(
                dataset_id,
                stored = %result.dataset_id,
                path = %path.display(),
                "stored result belongs to another dataset"
            );
            return Ok(None);
        }

        Ok(Some(result))
    }

    fn remove_result(&mut self, dataset_id: &str) -> Result<bool> {
        let path = self.path_for(dataset_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| {
            TidewatchError::Persistence(format!(
                "Failed to remove file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn test_path_sanitized() {
        let store = JsonFileStore::new("/tmp/results");
        let path = store.path_for("../harbor sensors/1");

        assert_eq!(path.parent(), Some(Path::new("/tmp/results")));
        let name = file_name(&path);
        assert!(name.starts_with("_harbor_sensors_1-"));
        assert!(name.ends_with(".analysis.json"));
        assert!(file_name(&store.path_for("")).starts_with("_-"));
    }

    #[test]
    fn test_similar_ids_get_distinct_files() {
        let store = JsonFileStore::new("/tmp/results");
        assert_ne!(store.path_for("tides/north"), store.path_for("tides_north"));
        assert_ne!(store.path_for("a b"), store.path_for("a_b"));
        assert_eq!(store.path_for("tides/north"), store.path_for("tides/north"));
    }

    #[test]
    fn test_colliding_ids_keep_separate_results() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path());

        store
            .store_result("tides/north", &AnalysisResult::failed("tides/north", "first"))
            .unwrap();
        assert!(store.load_result("tides_north").unwrap().is_none());

        store
            .store_result("tides_north", &AnalysisResult::failed("tides_north", "second"))
            .unwrap();
        let north = store.load_result("tides/north").unwrap().unwrap();
        let underscored = store.load_result("tides_north").unwrap().unwrap();
        assert_eq!(north.dataset_id, "tides/north");
        assert_eq!(underscored.dataset_id, "tides_north");
    }

    #[test]
    fn test_foreign_document_is_absent() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        store
            .store_result("harbor", &AnalysisResult::failed("harbor", "no rows"))
            .unwrap();
        fs::copy(store.path_for("harbor"), store.path_for("pier")).unwrap();

        assert!(store.load_result("pier").unwrap().is_none());
    }

    #[test]
    fn test_save_load_remove() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested"));
        let result = AnalysisResult::failed("harbor", "no rows");

        assert!(store.load_result("harbor").unwrap().is_none());
        store.store_result("harbor", &result).unwrap();
        assert!(store.path_for("harbor").exists());

        let loaded = store.load_result("harbor").unwrap().unwrap();
        assert_eq!(loaded, result);

        assert!(store.remove_result("harbor").unwrap());
        assert!(!store.remove_result("harbor").unwrap());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        fs::write(store.path_for("bad"), "{not json").unwrap();

        let err = store.load_result("bad").unwrap_err();
        assert!(matches!(err, TidewatchError::Persistence(_)));
    }
}
