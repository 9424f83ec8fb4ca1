//! SQL values and the coercion rules shared by every encoder and decoder.

use core::fmt;

use crate::ast::SqlType;
use crate::error::{PersistError, Result};

/// A runtime SQL value flowing through an encoder or decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 8-bit integer.
    Int8(i8),
    /// 16-bit integer.
    Int16(i16),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Wide integer.
    Integer(i128),
    /// Single precision float.
    Float32(f32),
    /// Double precision float.
    Float64(f64),
    /// Single character.
    Char(char),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns whether this is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the type this value naturally belongs to.
    #[must_use]
    pub const fn natural_type(&self) -> SqlType {
        match self {
            Self::Null => SqlType::Empty,
            Self::Bool(_) => SqlType::Boolean,
            Self::Int8(_) => SqlType::Integer08,
            Self::Int16(_) => SqlType::Integer16,
            Self::Int32(_) => SqlType::Integer32,
            Self::Int64(_) => SqlType::Integer64,
            Self::Integer(_) => SqlType::Integer,
            Self::Float32(_) => SqlType::Decimal32,
            Self::Float64(_) => SqlType::Decimal64,
            Self::Char(_) => SqlType::String01,
            Self::Text(_) => SqlType::String,
            Self::Blob(_) => SqlType::Binary,
        }
    }

    /// Returns the value of any integer variant widened to `i128`.
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Self::Int8(v) => Some(v.into()),
            Self::Int16(v) => Some(v.into()),
            Self::Int32(v) => Some(v.into()),
            Self::Int64(v) => Some(v.into()),
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    /// Converts this value into the representation `sql_type` requires.
    ///
    /// NULL coerces to every type. Integers narrow with a range check,
    /// `STRING01` needs exactly one character, `STRING64` at most 64, and the
    /// fixed binary types need exactly 16 or 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` when the value does not fit.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn coerce(self, sql_type: SqlType) -> Result<Self> {
        if self.is_null() {
            return Ok(Self::Null);
        }
        let fail = |value: &Self| PersistError::mismatch(sql_type, value);
        match sql_type {
            SqlType::Empty => Err(fail(&self)),
            SqlType::Boolean => match (&self, self.as_i128()) {
                (Self::Bool(b), _) => Ok(Self::Bool(*b)),
                (_, Some(0)) => Ok(Self::Bool(false)),
                (_, Some(1)) => Ok(Self::Bool(true)),
                _ => Err(fail(&self)),
            },
            SqlType::Integer08 => self
                .as_i128()
                .and_then(|v| i8::try_from(v).ok())
                .map(Self::Int8)
                .ok_or_else(|| fail(&self)),
            SqlType::Integer16 => self
                .as_i128()
                .and_then(|v| i16::try_from(v).ok())
                .map(Self::Int16)
                .ok_or_else(|| fail(&self)),
            SqlType::Integer32 => self
                .as_i128()
                .and_then(|v| i32::try_from(v).ok())
                .map(Self::Int32)
                .ok_or_else(|| fail(&self)),
            SqlType::Integer64 => self
                .as_i128()
                .and_then(|v| i64::try_from(v).ok())
                .map(Self::Int64)
                .ok_or_else(|| fail(&self)),
            SqlType::Integer => self.as_i128().map(Self::Integer).ok_or_else(|| fail(&self)),
            SqlType::Decimal32 => match self {
                Self::Float32(v) => Ok(Self::Float32(v)),
                Self::Float64(v) => Ok(Self::Float32(v as f32)),
                ref other => other
                    .as_i128()
                    .map(|v| Self::Float32(v as f32))
                    .ok_or_else(|| fail(other)),
            },
            SqlType::Decimal64 => match self {
                Self::Float32(v) => Ok(Self::Float64(f64::from(v))),
                Self::Float64(v) => Ok(Self::Float64(v)),
                ref other => other
                    .as_i128()
                    .map(|v| Self::Float64(v as f64))
                    .ok_or_else(|| fail(other)),
            },
            SqlType::String01 => match self {
                Self::Char(c) => Ok(Self::Char(c)),
                Self::Text(ref s) => {
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Ok(Self::Char(c)),
                        _ => Err(fail(&self)),
                    }
                }
                ref other => Err(fail(other)),
            },
            SqlType::String64 | SqlType::String => match self {
                Self::Char(c) => Ok(Self::Text(c.to_string())),
                Self::Text(s) => {
                    if sql_type == SqlType::String64 && s.chars().count() > 64 {
                        Err(fail(&Self::Text(s)))
                    } else {
                        Ok(Self::Text(s))
                    }
                }
                ref other => Err(fail(other)),
            },
            SqlType::Binary128 | SqlType::Binary256 | SqlType::Binary => match self {
                Self::Blob(bytes) => match sql_type.max_length() {
                    Some(len) if bytes.len() != len => Err(fail(&Self::Blob(bytes))),
                    _ => Ok(Self::Blob(bytes)),
                },
                ref other => Err(fail(other)),
            },
        }
    }

    /// Returns the SQL representation for inline use (escaped).
    ///
    /// **Warning**: Prefer using parameterized queries instead.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int8(n) => n.to_string(),
            Self::Int16(n) => n.to_string(),
            Self::Int32(n) => n.to_string(),
            Self::Int64(n) => n.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Float32(f) => f.to_string(),
            Self::Float64(f) => f.to_string(),
            Self::Char(c) => quote_text(&c.to_string()),
            Self::Text(s) => quote_text(s),
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }
}

/// Quotes text as a SQL string literal, doubling single quotes.
pub(crate) fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob(b) => write!(f, "{} byte(s) of binary", b.len()),
            Self::Text(s) => write!(f, "text of {} character(s)", s.chars().count()),
            other => write!(f, "{} {}", other.natural_type(), other.to_sql_inline()),
        }
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

macro_rules! impl_to_sql_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::$variant(self)
                }
            }
        )+
    };
}

impl_to_sql_value!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Integer,
    f32 => Float32,
    f64 => Float64,
    char => Char,
    String => Text,
    Vec<u8> => Blob,
);

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}
