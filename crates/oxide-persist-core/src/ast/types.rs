//! Portable SQL scalar types and column declarations.

use core::fmt;

use super::expression::Literal;
use crate::error::{PersistError, Result};
use crate::identifier::ColumnName;

/// Portable SQL scalar types.
///
/// Each variant maps to exactly one backend type code (the JDBC
/// `java.sql.Types` numbering, which most drivers understand) and one
/// portable custom-type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SqlType {
    /// No value; only NULL fits.
    Empty,
    /// Boolean.
    Boolean,
    /// 8-bit integer.
    Integer08,
    /// 16-bit integer.
    Integer16,
    /// 32-bit integer.
    Integer32,
    /// 64-bit integer.
    Integer64,
    /// Wide integer (128-bit two's complement).
    Integer,
    /// Single precision float.
    Decimal32,
    /// Double precision float.
    Decimal64,
    /// Exactly one character.
    String01,
    /// At most 64 characters.
    String64,
    /// Unbounded text.
    String,
    /// Exactly 16 bytes.
    Binary128,
    /// Exactly 32 bytes.
    Binary256,
    /// Unbounded bytes.
    Binary,
}

/// The sort of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKind {
    /// Boolean-valued.
    Boolean,
    /// Numeric.
    Number,
    /// Character data.
    String,
}

impl fmt::Display for SortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
        })
    }
}

impl SqlType {
    /// Every type, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Empty,
        Self::Boolean,
        Self::Integer08,
        Self::Integer16,
        Self::Integer32,
        Self::Integer64,
        Self::Integer,
        Self::Decimal32,
        Self::Decimal64,
        Self::String01,
        Self::String64,
        Self::String,
        Self::Binary128,
        Self::Binary256,
        Self::Binary,
    ];

    /// Returns the portable custom-type tag.
    #[must_use]
    pub const fn custom_type(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Boolean => "boolean",
            Self::Integer08 => "integer08",
            Self::Integer16 => "integer16",
            Self::Integer32 => "integer32",
            Self::Integer64 => "integer64",
            Self::Integer => "integer",
            Self::Decimal32 => "decimal32",
            Self::Decimal64 => "decimal64",
            Self::String01 => "string01",
            Self::String64 => "string64",
            Self::String => "string",
            Self::Binary128 => "binary128",
            Self::Binary256 => "binary256",
            Self::Binary => "binary",
        }
    }

    /// Returns the backend type code.
    #[must_use]
    pub const fn type_code(self) -> i32 {
        match self {
            Self::Empty => 0,
            Self::Boolean => 16,
            Self::Integer08 => -6,
            Self::Integer16 => 5,
            Self::Integer32 => 4,
            Self::Integer64 => -5,
            Self::Integer => 2,
            Self::Decimal32 => 7,
            Self::Decimal64 => 8,
            Self::String01 => 1,
            Self::String64 => 12,
            Self::String => -1,
            Self::Binary128 => -2,
            Self::Binary256 => -3,
            Self::Binary => -4,
        }
    }

    /// Looks a type up by its custom-type tag (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` for an unknown tag.
    pub fn from_custom_type(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.custom_type().eq_ignore_ascii_case(tag))
            .ok_or_else(|| PersistError::UnsupportedType {
                member: tag.to_string(),
                detail: String::from("no SQL type has this custom-type tag"),
            })
    }

    /// Looks a type up by its backend type code.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` for an unknown code.
    pub fn from_type_code(code: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.type_code() == code)
            .ok_or_else(|| PersistError::UnsupportedType {
                member: code.to_string(),
                detail: String::from("no SQL type has this backend type code"),
            })
    }

    /// Returns the expression sort values of this type belong to.
    ///
    /// Binary and empty types have no sort and cannot appear in typed
    /// expressions except as bare parameters.
    #[must_use]
    pub const fn sort(self) -> Option<SortKind> {
        match self {
            Self::Boolean => Some(SortKind::Boolean),
            Self::Integer08
            | Self::Integer16
            | Self::Integer32
            | Self::Integer64
            | Self::Integer
            | Self::Decimal32
            | Self::Decimal64 => Some(SortKind::Number),
            Self::String01 | Self::String64 | Self::String => Some(SortKind::String),
            Self::Empty | Self::Binary128 | Self::Binary256 | Self::Binary => None,
        }
    }

    /// Returns the fixed or maximum length of bounded types.
    #[must_use]
    pub const fn max_length(self) -> Option<usize> {
        match self {
            Self::String01 => Some(1),
            Self::String64 => Some(64),
            Self::Binary128 => Some(16),
            Self::Binary256 => Some(32),
            _ => None,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.custom_type().to_ascii_uppercase())
    }
}

/// A column definition for CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: ColumnName,
    /// Portable type; the dialect picks the spelling.
    pub sql_type: SqlType,
    /// Whether NOT NULL is declared.
    pub not_null: bool,
    /// Default value.
    pub default: Option<Literal>,
}

impl ColumnDef {
    /// Creates a nullable column definition.
    #[must_use]
    pub const fn new(name: ColumnName, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            not_null: false,
            default: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, literal: Literal) -> Self {
        self.default = Some(literal);
        self
    }
}
