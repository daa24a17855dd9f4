use crate::schema::{Schema, PRESENCE_SENTINEL};

/// Value of one raw attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Text read from the page
    Text(String),

    /// The attribute was listed without an explicit value
    Present,
}

/// Sparse, insertion-ordered map of free-text labels to values
///
/// Labels are not unique: a label seen twice keeps both entries, and the
/// reconciler decides which one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAttributeMap {
    entries: Vec<(String, RawValue)>,
}

impl RawAttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a label with text; the label is trimmed
    pub fn insert_text(&mut self, label: &str, value: impl Into<String>) {
        self.entries
            .push((label.trim().to_string(), RawValue::Text(value.into())));
    }

    /// Appends a label that only signals presence
    pub fn insert_present(&mut self, label: &str) {
        self.entries.push((label.trim().to_string(), RawValue::Present));
    }

    /// First value recorded for a label
    pub fn get(&self, label: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == label)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawAttributeMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert_text(key.as_ref(), value);
        }
        map
    }
}

/// One cell of a canonical record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Value(String),
    /// Rendered as the presence sentinel
    Present,
    /// Rendered as the null marker
    Null,
}

impl Cell {
    /// Converts a raw value; empty text counts as presence
    pub fn from_raw(value: &RawValue) -> Self {
        match value {
            RawValue::Text(text) if text.trim().is_empty() => Cell::Present,
            RawValue::Text(text) => Cell::Value(text.trim().to_string()),
            RawValue::Present => Cell::Present,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Text written to the store for this cell
    pub fn render<'a>(&'a self, null_marker: &'a str) -> &'a str {
        match self {
            Cell::Value(value) => value,
            Cell::Present => PRESENCE_SENTINEL,
            Cell::Null => null_marker,
        }
    }
}

/// A row of the closed schema
///
/// Holds exactly one cell per schema column, in schema order. Records are
/// only produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    schema: Schema,
    cells: Vec<Cell>,
}

impl CanonicalRecord {
    /// A record with every column set to null
    pub(crate) fn empty(schema: &Schema) -> Self {
        Self {
            schema: schema.clone(),
            cells: vec![Cell::Null; schema.len()],
        }
    }

    pub(crate) fn cell_mut(&mut self, position: usize) -> &mut Cell {
        &mut self.cells[position]
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.schema.position(column).map(|i| &self.cells[i])
    }

    /// Column/cell pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.schema
            .columns()
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter())
    }

    pub fn null_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_null()).count()
    }

    /// Cells rendered for storage, in schema order
    pub fn render<'a>(&'a self, null_marker: &'a str) -> Vec<&'a str> {
        self.cells
            .iter()
            .map(|cell| cell.render(null_marker))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_map_keeps_duplicates_in_order() {
        let mut map = RawAttributeMap::new();
        map.insert_text("STAV", "Dobrý");
        map.insert_text(" STAV ", "Novostavba");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("STAV"), Some(&RawValue::Text("Dobrý".to_string())));
    }

    #[test]
    fn test_cell_from_raw() {
        assert_eq!(
            Cell::from_raw(&RawValue::Text(" 5 000 Kč ".to_string())),
            Cell::Value("5 000 Kč".to_string())
        );
        assert_eq!(Cell::from_raw(&RawValue::Text(String::new())), Cell::Present);
        assert_eq!(Cell::from_raw(&RawValue::Present), Cell::Present);
    }

    #[test]
    fn test_cell_render() {
        assert_eq!(Cell::Value("x".to_string()).render("NaN"), "x");
        assert_eq!(Cell::Present.render("NaN"), "1");
        assert_eq!(Cell::Null.render("NaN"), "NaN");
    }

    #[test]
    fn test_empty_record_is_all_null() {
        let schema = Schema::new(["A", "B", "C"]).unwrap();
        let record = CanonicalRecord::empty(&schema);
        assert_eq!(record.null_count(), 3);
        assert_eq!(record.render("NaN"), vec!["NaN", "NaN", "NaN"]);
        assert_eq!(record.get("B"), Some(&Cell::Null));
        assert_eq!(record.get("Z"), None);
    }
}
