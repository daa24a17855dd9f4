use crate::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;

/// Ordinal column prepended to every stored row
pub const INDEX_COLUMN: &str = "Index";

/// Columns of the listing table, in output order
pub const LISTING_COLUMNS: [&str; 37] = [
    "URL",
    "CENA",
    "POPLATKY ZA SLUŽBY",
    "POPLATKY ZA ENERGIE",
    "VRATNÁ KAUCE",
    "TYP NABÍDKY",
    "LOKACE",
    "ČÍSLO INZERÁTU",
    "DISPOZICE",
    "STAV",
    "DOSTUPNÉ OD",
    "VLASTNICTVÍ",
    "TYP BUDOVY",
    "PLOCHA",
    "VYBAVENO",
    "PODLAŽÍ",
    "PENB",
    "Internet",
    "Energie",
    "Balkón",
    "Terasa",
    "Sklep",
    "Lodžie",
    "Bezbariérový přístup",
    "Parkování",
    "Výtah",
    "Garáž",
    "MHD",
    "Pošta",
    "Obchod",
    "Banka",
    "Restaurace",
    "Lékárna",
    "Škola",
    "Mateřská škola",
    "Sportoviště",
    "Hřiště",
];

/// Ordered, closed set of output columns
///
/// A schema is built once before a crawl and shared by reference; nothing
/// observed during a crawl can add a column to it.
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

#[derive(Debug)]
struct SchemaInner {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema from column names
    ///
    /// Fails if a name is empty, duplicated, or collides with the index column.
    pub fn new<I, S>(columns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = Vec::new();
        let mut positions = HashMap::new();

        for column in columns {
            let column: String = column.into();
            if column.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "schema column names cannot be empty".to_string(),
                ));
            }
            if column == INDEX_COLUMN {
                return Err(ConfigError::Validation(format!(
                    "'{}' is reserved for the row index",
                    INDEX_COLUMN
                )));
            }
            if positions.insert(column.clone(), names.len()).is_some() {
                return Err(ConfigError::Validation(format!(
                    "duplicate schema column '{}'",
                    column
                )));
            }
            names.push(column);
        }

        if names.is_empty() {
            return Err(ConfigError::Validation(
                "schema must have at least one column".to_string(),
            ));
        }

        Ok(Self {
            inner: Arc::new(SchemaInner {
                columns: names,
                positions,
            }),
        })
    }

    /// The listing table schema
    pub fn listing() -> Self {
        let columns: Vec<String> = LISTING_COLUMNS.iter().map(|c| c.to_string()).collect();
        let positions = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Self {
            inner: Arc::new(SchemaInner { columns, positions }),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.inner.columns
    }

    pub fn len(&self) -> usize {
        self.inner.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.columns.is_empty()
    }

    /// Position of a column in output order
    pub fn position(&self, column: &str) -> Option<usize> {
        self.inner.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.inner.positions.contains_key(column)
    }

    /// Stored header: the index column followed by the schema columns
    pub fn header(&self) -> Vec<&str> {
        std::iter::once(INDEX_COLUMN)
            .chain(self.inner.columns.iter().map(String::as_str))
            .collect()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.columns == other.inner.columns
    }
}

impl Eq for Schema {}
