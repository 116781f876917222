//! Persistence seams between the engine and its host.
//!
//! The engine never owns storage. Callers hand it a [`ResultStore`] for
//! analysis documents and a [`RecordStore`] for raw rows; the in-memory and
//! JSON-file implementations here cover tests and the CLI.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::{MemoryRecordStore, MemoryResultStore};

use crate::error::Result;
use crate::input::Record;
use crate::report::{AnalysisResult, RecordAssessment};

/// Key-value store of analysis results, keyed by dataset id.
pub trait ResultStore {
    /// Store (or replace) the result for a dataset.
    fn store_result(&mut self, dataset_id: &str, result: &AnalysisResult) -> Result<()>;

    /// Load the stored result, `None` if there is none.
    fn load_result(&self, dataset_id: &str) -> Result<Option<AnalysisResult>>;

    /// Remove the stored result. Returns whether one existed.
    fn remove_result(&mut self, dataset_id: &str) -> Result<bool>;
}

/// Source of raw rows and sink for per-record computed fields.
pub trait RecordStore {
    /// Rows of a dataset, in stored order.
    fn read_rows(&self, dataset_id: &str) -> Result<Vec<Record>>;

    /// Write computed fields back, one assessment per analyzed row.
    fn write_record_fields(&mut self, dataset_id: &str, records: &[RecordAssessment])
    -> Result<()>;
}
