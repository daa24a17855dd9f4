//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use crate::schema::{CanonicalRecord, Schema};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store header of {path} does not match the schema (expected {expected:?}, found {found:?})")]
    SchemaMismatch {
        path: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Record was reconciled against a different schema")]
    RecordSchema,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only sink for canonical records
///
/// Rows are written in the order given and never rewritten. A store keeps a
/// running row index that continues across runs.
pub trait Storage {
    /// Schema every appended record must carry
    fn schema(&self) -> &Schema;

    /// Number of data rows currently in the store
    fn row_count(&self) -> u64;

    /// Appends records in order
    ///
    /// Each row is written whole or not at all. The header is written by the
    /// first append to an empty store, even when `records` is empty.
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn append(&mut self, records: &[CanonicalRecord]) -> StorageResult<usize>;
}
