//! Statistics generation from the record store
//!
//! This module reads an existing CSV store and summarizes how complete its
//! columns are.

use crate::schema::INDEX_COLUMN;
use crate::storage::StorageResult;
use std::path::Path;

/// Store statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Number of data rows
    pub total_rows: u64,

    /// Non-null value count per column, in header order
    pub filled_by_column: Vec<(String, u64)>,
}

impl StoreStatistics {
    /// Fraction of rows with a value in `column`, in percent
    pub fn fill_rate(&self, column: &str) -> Option<f64> {
        let (_, filled) = self
            .filled_by_column
            .iter()
            .find(|(name, _)| name == column)?;
        if self.total_rows == 0 {
            return Some(0.0);
        }
        Some(*filled as f64 / self.total_rows as f64 * 100.0)
    }
}

/// Loads statistics from a CSV store
///
/// # Arguments
///
/// * `path` - Path to the store
/// * `null_marker` - Literal the store uses for missing values
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to read the store
pub fn load_store_statistics(path: &Path, null_marker: &str) -> StorageResult<StoreStatistics> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    // Skip the running index column
    let columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| *name != INDEX_COLUMN)
        .map(|(i, name)| (i, name.to_string()))
        .collect();

    let mut counts = vec![0u64; columns.len()];
    let mut total_rows = 0;
    for record in reader.records() {
        let record = record?;
        total_rows += 1;

        for (slot, (i, _)) in columns.iter().enumerate() {
            match record.get(*i) {
                Some(value) if value != null_marker => counts[slot] += 1,
                _ => {}
            }
        }
    }

    Ok(StoreStatistics {
        total_rows,
        filled_by_column: columns
            .into_iter()
            .map(|(_, name)| name)
            .zip(counts)
            .collect(),
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_store_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Total rows: {}", stats.total_rows);
    println!("  Columns: {}", stats.filled_by_column.len());
    println!();

    println!("Filled Values by Column:");
    let width = stats
        .filled_by_column
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0);

    for (name, filled) in &stats.filled_by_column {
        let percentage = stats.fill_rate(name).unwrap_or(0.0);
        let padding = width - name.chars().count();
        println!(
            "  {}{}  {:>6} ({:.1}%)",
            name,
            " ".repeat(padding),
            filled,
            percentage
        );
    }
}
