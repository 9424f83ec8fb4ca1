//! Identifiers for tables, columns, aliases and prefixes.
//!
//! Every identifier is validated when it is constructed: it must be
//! non-empty, consist of ASCII letters, digits and underscores, and its
//! rendered form (after prefixing or qualification) must not exceed
//! [`MAX_IDENTIFIER_LENGTH`] characters.

use core::fmt;

use crate::catalog::Site;
use crate::error::{PersistError, Result};

/// Maximum length of a rendered identifier.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

fn validate(value: &str) -> Result<()> {
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(PersistError::InvalidName(value.to_string()));
    }
    check_length(value)
}

fn check_length(rendered: &str) -> Result<()> {
    let length = rendered.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        return Err(PersistError::NameTooLong {
            name: rendered.to_string(),
            length,
        });
    }
    Ok(())
}

macro_rules! identifier {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Validates and wraps an identifier.
            ///
            /// # Errors
            ///
            /// Returns `InvalidName` for empty or non-identifier text and
            /// `NameTooLong` beyond 63 characters.
            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                validate(&value)?;
                Ok(Self(value))
            }

            /// Returns the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = PersistError;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value)
            }
        }
    };
}

identifier!(
    /// A plain name (site namespaces, member names).
    Name
);
identifier!(
    /// A projection alias.
    Alias
);
identifier!(
    /// A column-name prefix used when flattening embedded members.
    Prefix
);
identifier!(
    /// An unqualified column name.
    ColumnName
);
identifier!(
    /// An unqualified table name.
    TableName
);

impl ColumnName {
    /// Wraps a built-in column name.
    pub(crate) fn builtin(value: &'static str) -> Self {
        debug_assert!(validate(value).is_ok());
        Self(value.to_string())
    }
}

impl Prefix {
    /// Prepends this prefix to `name` as `<prefix>_<name>`.
    ///
    /// # Errors
    ///
    /// Returns `NameTooLong` if the combined name exceeds 63 characters.
    pub fn apply(&self, name: &str) -> Result<ColumnName> {
        ColumnName::new(format!("{}_{name}", self.0))
    }

    /// Extends this prefix with another segment.
    ///
    /// # Errors
    ///
    /// Returns `NameTooLong` if the combined prefix exceeds 63 characters.
    pub fn nest(&self, segment: &str) -> Result<Self> {
        Self::new(format!("{}_{segment}", self.0))
    }
}

/// A column name optionally qualified by its owning table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedColumnName {
    table: Option<TableName>,
    column: ColumnName,
}

impl QualifiedColumnName {
    /// Creates a qualified column name, checking the rendered length.
    ///
    /// # Errors
    ///
    /// Returns `NameTooLong` if `table.column` exceeds 63 characters.
    pub fn new(table: Option<TableName>, column: ColumnName) -> Result<Self> {
        let qualified = Self { table, column };
        check_length(&qualified.to_string())?;
        Ok(qualified)
    }

    /// Creates an unqualified column reference.
    #[must_use]
    pub const fn bare(column: ColumnName) -> Self {
        Self {
            table: None,
            column,
        }
    }

    /// Returns the owning table, if qualified.
    #[must_use]
    pub const fn table(&self) -> Option<&TableName> {
        self.table.as_ref()
    }

    /// Returns the column.
    #[must_use]
    pub const fn column(&self) -> &ColumnName {
        &self.column
    }
}

impl fmt::Display for QualifiedColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

impl From<ColumnName> for QualifiedColumnName {
    fn from(column: ColumnName) -> Self {
        Self::bare(column)
    }
}

/// A table name scoped by a site namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedTableName {
    site: Option<Name>,
    table: TableName,
}

impl QualifiedTableName {
    /// Scopes `table` by `site`, checking the rendered length.
    ///
    /// # Errors
    ///
    /// Returns `NameTooLong` if `site.table` exceeds 63 characters.
    pub fn new(site: &Site, table: TableName) -> Result<Self> {
        let qualified = Self {
            site: site.namespace().cloned(),
            table,
        };
        check_length(&qualified.to_string())?;
        Ok(qualified)
    }

    /// Returns the site namespace, if any.
    #[must_use]
    pub const fn namespace(&self) -> Option<&Name> {
        self.site.as_ref()
    }

    /// Returns the unqualified table name.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }
}

impl fmt::Display for QualifiedTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.site {
            Some(site) => write!(f, "{site}.{}", self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_boundary() {
        assert!(ColumnName::new("a".repeat(63)).is_ok());
        assert!(matches!(
            ColumnName::new("a".repeat(64)),
            Err(PersistError::NameTooLong { length: 64, .. })
        ));
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(matches!(Name::new(""), Err(PersistError::InvalidName(_))));
        assert!(matches!(
            TableName::new("users; DROP TABLE users"),
            Err(PersistError::InvalidName(_))
        ));
    }

    #[test]
    fn test_qualified_column_boundary() {
        let table = TableName::new("t".repeat(31)).unwrap();
        let column = ColumnName::new("c".repeat(31)).unwrap();
        let ok = QualifiedColumnName::new(Some(table.clone()), column).unwrap();
        assert_eq!(ok.to_string().len(), 63);

        let column = ColumnName::new("c".repeat(32)).unwrap();
        assert!(matches!(
            QualifiedColumnName::new(Some(table), column),
            Err(PersistError::NameTooLong { length: 64, .. })
        ));
    }

    #[test]
    fn test_qualified_table_boundary() {
        let site = Site::named("s".repeat(31)).unwrap();
        let ok = QualifiedTableName::new(&site, TableName::new("t".repeat(31)).unwrap());
        assert_eq!(ok.unwrap().to_string().len(), 63);

        let too_long = QualifiedTableName::new(&site, TableName::new("t".repeat(32)).unwrap());
        assert!(matches!(too_long, Err(PersistError::NameTooLong { .. })));
    }

    #[test]
    fn test_prefix_apply() {
        let prefix = Prefix::new("origin").unwrap();
        assert_eq!(prefix.apply("x").unwrap().as_str(), "origin_x");
        assert_eq!(
            prefix.nest("corner").unwrap().apply("y").unwrap().as_str(),
            "origin_corner_y"
        );
        let long = Prefix::new("p".repeat(62)).unwrap();
        assert!(matches!(
            long.apply("x"),
            Err(PersistError::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_default_site_is_unqualified() {
        let name = QualifiedTableName::new(&Site::default(), TableName::new("points").unwrap())
            .unwrap();
        assert_eq!(name.to_string(), "points");
        assert!(name.namespace().is_none());
    }
}
