//! Projection of raw attribute maps onto the fixed schema
//!
//! Reconciliation runs in four steps:
//! 1. Each raw label is resolved through the alias table
//! 2. On a collision after aliasing, the first-seen value wins
//! 3. Labels that are not schema columns are dropped and reported
//! 4. Columns with no value stay null
//!
//! The output is always in schema order, whatever order the labels arrived in.

use crate::schema::{AliasTable, CanonicalRecord, Cell, RawAttributeMap, Schema};

/// Result of reconciling one raw attribute map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// The schema-shaped record
    pub record: CanonicalRecord,

    /// Raw labels with no schema column, in the order they were seen
    pub dropped_keys: Vec<String>,
}

/// Reconciles a raw attribute map into a canonical record
///
/// # Example
///
/// ```
/// use listing_crawler::schema::{reconcile, AliasTable, Cell, RawAttributeMap, Schema};
///
/// let schema = Schema::new(["CENA", "Balkón", "STAV"]).unwrap();
/// let raw: RawAttributeMap = [("CENA", "15 000 Kč"), ("Balkón", "")].into_iter().collect();
///
/// let reconciled = reconcile(&raw, &schema, &AliasTable::empty());
/// assert_eq!(reconciled.record.get("Balkón"), Some(&Cell::Present));
/// assert_eq!(reconciled.record.get("STAV"), Some(&Cell::Null));
/// ```
pub fn reconcile(raw: &RawAttributeMap, schema: &Schema, aliases: &AliasTable) -> Reconciled {
    let mut record = CanonicalRecord::empty(schema);
    let mut dropped_keys = Vec::new();

    for (label, value) in raw.iter() {
        let column = aliases.resolve(label);

        match schema.position(column) {
            Some(position) => {
                let cell = record.cell_mut(position);
                if cell.is_null() {
                    *cell = Cell::from_raw(value);
                } else {
                    tracing::trace!("Discarding later value for column '{}'", column);
                }
            }
            None => dropped_keys.push(label.to_string()),
        }
    }

    if !dropped_keys.is_empty() {
        tracing::debug!("Dropped {} unmapped labels: {:?}", dropped_keys.len(), dropped_keys);
    }

    Reconciled {
        record,
        dropped_keys,
    }
}
