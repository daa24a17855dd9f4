//! Schema module for the fixed listing table
//!
//! This module holds everything that turns a free-text attribute map into a
//! row of the closed output schema:
//! - `Schema`: the ordered, fixed column set
//! - `RawAttributeMap`: the sparse label → value map an extraction produces
//! - `CanonicalRecord`: one value or null per schema column
//! - `AliasTable`: versioned label-variant → column mapping
//! - `reconcile`: the projection of a raw map onto the schema

mod alias;
mod columns;
mod reconcile;
mod record;

pub use alias::AliasTable;
pub use columns::{Schema, INDEX_COLUMN, LISTING_COLUMNS};
pub use reconcile::{reconcile, Reconciled};
pub use record::{CanonicalRecord, Cell, RawAttributeMap, RawValue};

/// Literal written for a schema column with no extracted value
pub const DEFAULT_NULL_MARKER: &str = "NaN";

/// Value written when a row signals presence without an explicit value
pub const PRESENCE_SENTINEL: &str = "1";
