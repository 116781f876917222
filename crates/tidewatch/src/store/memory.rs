//! In-memory stores.

use indexmap::IndexMap;

use super::{RecordStore, ResultStore};
use crate::error::{Result, TidewatchError};
use crate::input::Record;
use crate::report::{AnalysisResult, RecordAssessment};

/// Bounded result store that evicts the least recently stored entry.
#[derive(Debug, Clone)]
pub struct MemoryResultStore {
    capacity: usize,
    results: IndexMap<String, AnalysisResult>,
}

impl MemoryResultStore {
    /// Create a store holding at most `capacity` results (minimum one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            results: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Stored dataset ids, oldest first.
    pub fn dataset_ids(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }
}

impl ResultStore for MemoryResultStore {
    fn store_result(&mut self, dataset_id: &str, result: &AnalysisResult) -> Result<()> {
        // Re-storing moves the entry to the back of the eviction order
        self.results.shift_remove(dataset_id);
        self.results.insert(dataset_id.to_string(), result.clone());

        while self.results.len() > self.capacity {
            if let Some((evicted, _)) = self.results.shift_remove_index(0) {
                tracing::debug!(dataset_id = %evicted, "evicted cached result");
            }
        }
        Ok(())
    }

    fn load_result(&self, dataset_id: &str) -> Result<Option<AnalysisResult>> {
        Ok(self.results.get(dataset_id).cloned())
    }

    fn remove_result(&mut self, dataset_id: &str) -> Result<bool> {
        Ok(self.results.shift_remove(dataset_id).is_some())
    }
}

/// Record store over rows held in memory.
///
/// Computed fields are kept beside the rows rather than merged into them,
/// so re-analysis reads the original data.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    rows: IndexMap<String, Vec<Record>>,
    assessments: IndexMap<String, Vec<RecordAssessment>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a dataset's rows.
    pub fn insert(&mut self, dataset_id: impl Into<String>, rows: Vec<Record>) {
        let dataset_id = dataset_id.into();
        self.assessments.shift_remove(&dataset_id);
        self.rows.insert(dataset_id, rows);
    }

    /// Computed fields last written for a dataset.
    pub fn assessments(&self, dataset_id: &str) -> Option<&[RecordAssessment]> {
        self.assessments.get(dataset_id).map(Vec::as_slice)
    }
}

impl RecordStore for MemoryRecordStore {
    fn read_rows(&self, dataset_id: &str) -> Result<Vec<Record>> {
        self.rows.get(dataset_id).cloned().ok_or_else(|| {
            TidewatchError::Persistence(format!("unknown dataset '{}'", dataset_id))
        })
    }

    fn write_record_fields(
        &mut self,
        dataset_id: &str,
        records: &[RecordAssessment],
    ) -> Result<()> {
        let Some(rows) = self.rows.get(dataset_id) else {
            return Err(TidewatchError::Persistence(format!(
                "unknown dataset '{}'",
                dataset_id
            )));
        };
        if let Some(bad) = records.iter().find(|r| r.index >= rows.len()) {
            return Err(TidewatchError::Persistence(format!(
                "record {} is out of range for dataset '{}' ({} rows)",
                bad.index,
                dataset_id,
                rows.len()
            )));
        }
        self.assessments
            .insert(dataset_id.to_string(), records.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str) -> AnalysisResult {
        AnalysisResult::failed(id, "placeholder")
    }

    #[test]
    fn test_store_and_load() {
        let mut store = MemoryResultStore::new(4);
        store.store_result("a", &result("a")).unwrap();

        assert_eq!(store.load_result("a").unwrap().unwrap().dataset_id, "a");
        assert!(store.load_result("b").unwrap().is_none());
        assert!(store.remove_result("a").unwrap());
        assert!(!store.remove_result("a").unwrap());
    }

    #[test]
    fn test_evicts_least_recently_stored() {
        let mut store = MemoryResultStore::new(2);
        store.store_result("a", &result("a")).unwrap();
        store.store_result("b", &result("b")).unwrap();
        store.store_result("a", &result("a")).unwrap();
        store.store_result("c", &result("c")).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.dataset_ids().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_record_store() {
        let mut store = MemoryRecordStore::new();
        store.insert("ds", vec![Record::new(), Record::new()]);
        assert_eq!(store.read_rows("ds").unwrap().len(), 2);
        assert!(store.read_rows("other").is_err());

        let fields = vec![RecordAssessment {
            index: 1,
            risk_value: Some(0.4),
            risk_level: None,
            anomaly: true,
        }];
        store.write_record_fields("ds", &fields).unwrap();
        assert_eq!(store.assessments("ds").unwrap(), fields.as_slice());

        let out_of_range = vec![RecordAssessment { index: 5, ..fields[0].clone() }];
        assert!(store.write_record_fields("ds", &out_of_range).is_err());
    }
}
