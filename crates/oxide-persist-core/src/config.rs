//! Persistence configuration.
//!
//! A [`PersistConfig`] is read from JSON:
//!
//! ```json
//! {
//!     "dialect": "sqlite",
//!     "site": "tenant",
//!     "entity": { "table": "accounts", "column": "id", "key": 7 },
//!     "batch_size": 250
//! }
//! ```
//!
//! Every field is optional.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::catalog::{EntityReference, Site};
use crate::dialect::{Dialect, GenericDialect, SqliteDialect};
use crate::error::{PersistError, Result};
use crate::identifier::{ColumnName, TableName};

/// Default number of rows per batched insert.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// The dialects a configuration can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialectKind {
    /// [`GenericDialect`].
    #[default]
    Generic,
    /// [`SqliteDialect`].
    Sqlite,
}

impl FromStr for DialectKind {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(PersistError::Config(format!("unknown dialect '{other}'"))),
        }
    }
}

/// The entity every row of the configured site belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntityConfig {
    /// Table holding the entities.
    pub table: String,
    /// Key column of that table.
    pub column: String,
    /// Key of the entity.
    pub key: i64,
}

/// Dialect, site and batching settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistConfig {
    /// Dialect name: `generic` or `sqlite`.
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// Site namespace.
    #[serde(default)]
    pub site: Option<String>,
    /// Entity scope of the site.
    #[serde(default)]
    pub entity: Option<EntityConfig>,
    /// Rows per batched insert; at least 1.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_dialect() -> String {
    String::from("generic")
}

const fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            site: None,
            entity: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl PersistConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Json` for a malformed document and `Config` for invalid
    /// values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise see
    /// [`PersistConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks every value.
    ///
    /// # Errors
    ///
    /// Returns `Config` for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PersistError::Config(String::from(
                "batch_size must be at least 1",
            )));
        }
        self.dialect_kind()?;
        self.site()?;
        Ok(())
    }

    /// Returns the selected dialect.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unknown dialect name.
    pub fn dialect_kind(&self) -> Result<DialectKind> {
        self.dialect.parse()
    }

    /// Builds the selected dialect.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unknown dialect name.
    pub fn dialect(&self) -> Result<Box<dyn Dialect>> {
        Ok(match self.dialect_kind()? {
            DialectKind::Generic => Box::new(GenericDialect),
            DialectKind::Sqlite => Box::new(SqliteDialect),
        })
    }

    /// Builds the configured site.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the site or entity names are not usable
    /// identifiers.
    pub fn site(&self) -> Result<Site> {
        let invalid = |e: PersistError| PersistError::Config(e.to_string());
        let site = match &self.site {
            Some(name) => Site::named(name.as_str()).map_err(invalid)?,
            None => Site::default(),
        };
        Ok(match &self.entity {
            Some(entity) => site.with_entity(EntityReference {
                table: TableName::new(entity.table.as_str()).map_err(invalid)?,
                column: ColumnName::new(entity.column.as_str()).map_err(invalid)?,
                key: entity.key,
            }),
            None => site,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PersistConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PersistConfig::default());
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.dialect().unwrap().name(), "generic");
        assert_eq!(config.site().unwrap(), Site::default());
    }

    #[test]
    fn test_full_document() {
        let config = PersistConfig::from_json_str(
            r#"{
                "dialect": "SQLite",
                "site": "tenant",
                "entity": { "table": "accounts", "column": "id", "key": 7 },
                "batch_size": 2
            }"#,
        )
        .unwrap();
        assert_eq!(config.dialect_kind().unwrap(), DialectKind::Sqlite);
        let site = config.site().unwrap();
        assert_eq!(site.namespace().unwrap().as_str(), "tenant");
        assert_eq!(site.entity().unwrap().key, 7);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PersistConfig::from_json_str(r#"{"batch_size": 0}"#),
            Err(PersistError::Config(_))
        ));
        assert!(matches!(
            PersistConfig::from_json_str(r#"{"dialect": "oracle"}"#),
            Err(PersistError::Config(_))
        ));
        assert!(matches!(
            PersistConfig::from_json_str(r#"{"site": "no spaces"}"#),
            Err(PersistError::Config(_))
        ));
        assert!(matches!(
            PersistConfig::from_json_str(r#"{"batch": 1}"#),
            Err(PersistError::Json(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.json");
        std::fs::write(&path, r#"{"dialect": "sqlite"}"#).unwrap();
        let config = PersistConfig::from_path(&path).unwrap();
        assert_eq!(config.dialect_kind().unwrap(), DialectKind::Sqlite);
        assert!(matches!(
            PersistConfig::from_path(dir.path().join("missing.json")),
            Err(PersistError::Io(_))
        ));
    }
}
