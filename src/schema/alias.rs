use crate::schema::Schema;
use crate::ConfigError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// On-disk form of an alias table
#[derive(Debug, Deserialize)]
struct AliasFile {
    version: String,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// Versioned mapping from observed label variants to schema columns
///
/// Alias tables live outside the code (see `config/aliases.toml`) so the set
/// of equivalent spellings can be reviewed and versioned on its own.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    version: String,
    fingerprint: String,
    aliases: HashMap<String, String>,
}

impl AliasTable {
    /// A table that maps nothing
    pub fn empty() -> Self {
        Self {
            version: "none".to_string(),
            ..Self::default()
        }
    }

    /// Builds a table from label/column pairs without schema validation
    pub fn from_pairs<I, K, V>(version: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            version: version.to_string(),
            fingerprint: String::new(),
            aliases: pairs
                .into_iter()
                .map(|(label, column)| (label.as_ref().trim().to_string(), column.into()))
                .collect(),
        }
    }

    /// Loads an alias table file and checks every target against `schema`
    pub fn load(path: &Path, schema: &Schema) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, schema)
    }

    /// Parses alias table TOML and checks every target against `schema`
    pub fn from_toml_str(content: &str, schema: &Schema) -> Result<Self, ConfigError> {
        let file: AliasFile = toml::from_str(content)?;

        if file.version.trim().is_empty() {
            return Err(ConfigError::Validation(
                "alias table version cannot be empty".to_string(),
            ));
        }

        for (label, column) in &file.aliases {
            if !schema.contains(column) {
                return Err(ConfigError::Validation(format!(
                    "alias '{}' targets unknown column '{}'",
                    label, column
                )));
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());

        let mut table = Self::from_pairs(&file.version, file.aliases);
        table.fingerprint = hex::encode(hasher.finalize());
        Ok(table)
    }

    /// Canonical column for a label; unknown labels map to themselves
    pub fn resolve<'a>(&'a self, label: &'a str) -> &'a str {
        self.aliases
            .get(label.trim())
            .map(String::as_str)
            .unwrap_or(label)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// SHA-256 of the source file, empty for tables built in code
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
