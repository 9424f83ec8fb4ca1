//! The backend-neutral parameter and row protocol.
//!
//! An [`Encoder`] receives one value per placeholder, in placeholder order,
//! and [`Encoder::add_batch`] closes a row of a batched statement. A
//! [`Decoder`] is its mirror: each `decode_*` call reads the next column of
//! the current row.
//!
//! Encoders and decoders hold a single mutable cursor. They are not meant
//! to be shared between threads or interleaved between statements; doing so
//! is a caller error that is not detected.

mod memory;
mod row;

pub use memory::{RowSet, ValueBuffer};
pub use row::{RowBatch, SqlRow};

use crate::ast::SqlType;
use crate::error::{PersistError, Result};
use crate::value::SqlValue;

/// Writes parameters into a statement.
pub trait Encoder {
    /// Binds `value` to the next placeholder. `value` already has the
    /// representation `sql_type` requires, or is NULL.
    ///
    /// # Errors
    ///
    /// Returns `EncodingFailed` if the backend rejects the value and
    /// `UnsupportedOperation` if it cannot bind this type at all.
    fn bind(&mut self, sql_type: SqlType, value: SqlValue) -> Result<()>;

    /// Closes the current row of a batch.
    ///
    /// # Errors
    ///
    /// Returns `EncodingFailed` if the backend rejects the row.
    fn add_batch(&mut self) -> Result<()>;

    /// Coerces `value` to `sql_type` and binds it.
    ///
    /// # Errors
    ///
    /// Returns `EncodingFailed` if the value does not fit the type.
    fn encode(&mut self, sql_type: SqlType, value: SqlValue) -> Result<()> {
        let value = value
            .coerce(sql_type)
            .map_err(|e| PersistError::EncodingFailed(e.to_string()))?;
        self.bind(sql_type, value)
    }

    /// Binds NULL.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_null(&mut self, sql_type: SqlType) -> Result<()> {
        self.bind(sql_type, SqlValue::Null)
    }

    /// Binds a `BOOLEAN`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_boolean(&mut self, value: bool) -> Result<()> {
        self.bind(SqlType::Boolean, SqlValue::Bool(value))
    }

    /// Binds an `INTEGER08`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_integer08(&mut self, value: i8) -> Result<()> {
        self.bind(SqlType::Integer08, SqlValue::Int8(value))
    }

    /// Binds an `INTEGER16`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_integer16(&mut self, value: i16) -> Result<()> {
        self.bind(SqlType::Integer16, SqlValue::Int16(value))
    }

    /// Binds an `INTEGER32`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_integer32(&mut self, value: i32) -> Result<()> {
        self.bind(SqlType::Integer32, SqlValue::Int32(value))
    }

    /// Binds an `INTEGER64`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_integer64(&mut self, value: i64) -> Result<()> {
        self.bind(SqlType::Integer64, SqlValue::Int64(value))
    }

    /// Binds a wide `INTEGER`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_integer(&mut self, value: i128) -> Result<()> {
        self.bind(SqlType::Integer, SqlValue::Integer(value))
    }

    /// Binds a `DECIMAL32`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_decimal32(&mut self, value: f32) -> Result<()> {
        self.bind(SqlType::Decimal32, SqlValue::Float32(value))
    }

    /// Binds a `DECIMAL64`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_decimal64(&mut self, value: f64) -> Result<()> {
        self.bind(SqlType::Decimal64, SqlValue::Float64(value))
    }

    /// Binds a `STRING01`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_string01(&mut self, value: char) -> Result<()> {
        self.bind(SqlType::String01, SqlValue::Char(value))
    }

    /// Binds a `STRING64`.
    ///
    /// # Errors
    ///
    /// Returns `EncodingFailed` for more than 64 characters.
    fn encode_string64(&mut self, value: &str) -> Result<()> {
        self.encode(SqlType::String64, SqlValue::Text(value.to_string()))
    }

    /// Binds a `STRING`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_string(&mut self, value: &str) -> Result<()> {
        self.bind(SqlType::String, SqlValue::Text(value.to_string()))
    }

    /// Binds a `BINARY128`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_binary128(&mut self, value: &[u8; 16]) -> Result<()> {
        self.bind(SqlType::Binary128, SqlValue::Blob(value.to_vec()))
    }

    /// Binds a `BINARY256`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_binary256(&mut self, value: &[u8; 32]) -> Result<()> {
        self.bind(SqlType::Binary256, SqlValue::Blob(value.to_vec()))
    }

    /// Binds a `BINARY`.
    ///
    /// # Errors
    ///
    /// See [`Encoder::bind`].
    fn encode_binary(&mut self, value: &[u8]) -> Result<()> {
        self.bind(SqlType::Binary, SqlValue::Blob(value.to_vec()))
    }
}

/// Reads columns out of a result set.
pub trait Decoder {
    /// Reads the next column of the current row as the backend stores it,
    /// using `sql_type` as a hint, and advances the column cursor.
    ///
    /// # Errors
    ///
    /// Returns `MissingValue` when the row has no further column.
    fn read(&mut self, sql_type: SqlType) -> Result<SqlValue>;

    /// Returns whether the most recently read column was NULL.
    fn was_null(&self) -> bool;

    /// Moves to the next row, returning `false` once rows are exhausted.
    ///
    /// # Errors
    ///
    /// Returns `QueryExecutionFailed` if the backend fails to fetch.
    fn move_to_next_row(&mut self) -> Result<bool>;

    /// Moves back to the first row.
    ///
    /// # Errors
    ///
    /// Returns `EmptyResult` if there are no rows.
    fn move_to_first_row(&mut self) -> Result<()>;

    /// Reads the next column and coerces it to `sql_type`.
    ///
    /// # Errors
    ///
    /// Returns `MissingValue` or `TypeMismatch`.
    fn decode(&mut self, sql_type: SqlType) -> Result<SqlValue> {
        self.read(sql_type)?.coerce(sql_type)
    }

    /// Reads a `BOOLEAN`; NULL reads as `false`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_boolean(&mut self) -> Result<bool> {
        match self.decode(SqlType::Boolean)? {
            SqlValue::Bool(v) => Ok(v),
            other => null_or_mismatch(SqlType::Boolean, other),
        }
    }

    /// Reads an `INTEGER08`; NULL reads as `0`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_integer08(&mut self) -> Result<i8> {
        match self.decode(SqlType::Integer08)? {
            SqlValue::Int8(v) => Ok(v),
            other => null_or_mismatch(SqlType::Integer08, other),
        }
    }

    /// Reads an `INTEGER16`; NULL reads as `0`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_integer16(&mut self) -> Result<i16> {
        match self.decode(SqlType::Integer16)? {
            SqlValue::Int16(v) => Ok(v),
            other => null_or_mismatch(SqlType::Integer16, other),
        }
    }

    /// Reads an `INTEGER32`; NULL reads as `0`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_integer32(&mut self) -> Result<i32> {
        match self.decode(SqlType::Integer32)? {
            SqlValue::Int32(v) => Ok(v),
            other => null_or_mismatch(SqlType::Integer32, other),
        }
    }

    /// Reads an `INTEGER64`; NULL reads as `0`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_integer64(&mut self) -> Result<i64> {
        match self.decode(SqlType::Integer64)? {
            SqlValue::Int64(v) => Ok(v),
            other => null_or_mismatch(SqlType::Integer64, other),
        }
    }

    /// Reads a wide `INTEGER`; NULL reads as `0`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_integer(&mut self) -> Result<i128> {
        match self.decode(SqlType::Integer)? {
            SqlValue::Integer(v) => Ok(v),
            other => null_or_mismatch(SqlType::Integer, other),
        }
    }

    /// Reads a `DECIMAL32`; NULL reads as `0.0`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_decimal32(&mut self) -> Result<f32> {
        match self.decode(SqlType::Decimal32)? {
            SqlValue::Float32(v) => Ok(v),
            other => null_or_mismatch(SqlType::Decimal32, other),
        }
    }

    /// Reads a `DECIMAL64`; NULL reads as `0.0`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_decimal64(&mut self) -> Result<f64> {
        match self.decode(SqlType::Decimal64)? {
            SqlValue::Float64(v) => Ok(v),
            other => null_or_mismatch(SqlType::Decimal64, other),
        }
    }

    /// Reads a `STRING01`; NULL reads as `'\0'`.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` unless the column holds exactly one character.
    fn decode_string01(&mut self) -> Result<char> {
        match self.decode(SqlType::String01)? {
            SqlValue::Char(v) => Ok(v),
            other => null_or_mismatch(SqlType::String01, other),
        }
    }

    /// Reads a `STRING64`; NULL reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` beyond 64 characters.
    fn decode_string64(&mut self) -> Result<String> {
        match self.decode(SqlType::String64)? {
            SqlValue::Text(v) => Ok(v),
            other => null_or_mismatch(SqlType::String64, other),
        }
    }

    /// Reads a `STRING`; NULL reads as empty.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_string(&mut self) -> Result<String> {
        match self.decode(SqlType::String)? {
            SqlValue::Text(v) => Ok(v),
            other => null_or_mismatch(SqlType::String, other),
        }
    }

    /// Reads a `BINARY128`; NULL reads as zeroes.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` unless the column holds exactly 16 bytes.
    fn decode_binary128(&mut self) -> Result<[u8; 16]> {
        fixed_binary(self.decode(SqlType::Binary128)?, SqlType::Binary128)
    }

    /// Reads a `BINARY256`; NULL reads as zeroes.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` unless the column holds exactly 32 bytes.
    fn decode_binary256(&mut self) -> Result<[u8; 32]> {
        fixed_binary(self.decode(SqlType::Binary256)?, SqlType::Binary256)
    }

    /// Reads a `BINARY`; NULL reads as empty.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    fn decode_binary(&mut self) -> Result<Vec<u8>> {
        match self.decode(SqlType::Binary)? {
            SqlValue::Blob(v) => Ok(v),
            other => null_or_mismatch(SqlType::Binary, other),
        }
    }
}

fn null_or_mismatch<T: Default>(expected: SqlType, value: SqlValue) -> Result<T> {
    if value.is_null() {
        Ok(T::default())
    } else {
        Err(PersistError::mismatch(expected, value))
    }
}

fn fixed_binary<const N: usize>(value: SqlValue, expected: SqlType) -> Result<[u8; N]> {
    match value {
        SqlValue::Null => Ok([0; N]),
        SqlValue::Blob(bytes) => {
            <[u8; N]>::try_from(bytes).map_err(|b| PersistError::mismatch(expected, SqlValue::Blob(b)))
        }
        other => Err(PersistError::mismatch(expected, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_encoders_consume_one_slot_each() {
        let mut buffer = ValueBuffer::new();
        buffer.encode_integer32(3).unwrap();
        buffer.encode_string01('x').unwrap();
        buffer.encode_null(SqlType::Binary).unwrap();
        buffer.encode_binary128(&[7; 16]).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(
            buffer.types(),
            vec![
                SqlType::Integer32,
                SqlType::String01,
                SqlType::Binary,
                SqlType::Binary128
            ]
        );
    }

    #[test]
    fn test_string64_bound_is_checked() {
        let mut buffer = ValueBuffer::new();
        assert!(buffer.encode_string64(&"a".repeat(64)).is_ok());
        assert!(matches!(
            buffer.encode_string64(&"a".repeat(65)),
            Err(PersistError::EncodingFailed(_))
        ));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_typed_decoders_read_in_order() {
        let mut rows = RowSet::single(vec![
            SqlValue::Int64(7),
            SqlValue::Text(String::from("q")),
            SqlValue::Null,
            SqlValue::Blob(vec![1; 32]),
        ]);
        assert_eq!(rows.decode_integer16().unwrap(), 7);
        assert!(!rows.was_null());
        assert_eq!(rows.decode_string01().unwrap(), 'q');
        assert!(rows.decode_decimal64().unwrap().abs() < f64::EPSILON);
        assert!(rows.was_null());
        assert_eq!(rows.decode_binary256().unwrap(), [1; 32]);
        assert!(matches!(
            rows.decode_boolean(),
            Err(PersistError::MissingValue { column: 4 })
        ));
    }

    #[test]
    fn test_fixed_binary_length_mismatch() {
        let mut rows = RowSet::single(vec![SqlValue::Blob(vec![1; 15])]);
        assert!(matches!(
            rows.decode_binary128(),
            Err(PersistError::TypeMismatch {
                expected: SqlType::Binary128,
                ..
            })
        ));
    }
}
