//! Storage module for persisting canonical records
//!
//! This module handles the on-disk record store, including:
//! - Header verification against the closed schema
//! - Row-atomic appends across runs
//! - Repair of a row torn by an interrupted write

mod csv_store;
mod traits;

pub use csv_store::CsvStorage;
pub use traits::{Storage, StorageError, StorageResult};
