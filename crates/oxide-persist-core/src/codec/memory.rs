//! In-memory encoder and decoder.
//!
//! [`ValueBuffer`] records every bound value and [`RowSet`] replays rows of
//! values, so a value can be collected, turned into rows and recovered
//! without a database.

use super::{Decoder, Encoder};
use crate::ast::SqlType;
use crate::error::{PersistError, Result};
use crate::value::SqlValue;

/// An [`Encoder`] that records bound values row by row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueBuffer {
    rows: Vec<Vec<(SqlType, SqlValue)>>,
    current: Vec<(SqlType, SqlValue)>,
}

impl ValueBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of values bound so far, across all rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum::<usize>() + self.current.len()
    }

    /// Returns whether nothing has been bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bound types, in bind order.
    #[must_use]
    pub fn types(&self) -> Vec<SqlType> {
        self.bindings().map(|(ty, _)| *ty).collect()
    }

    /// Returns the bound values, in bind order.
    #[must_use]
    pub fn values(&self) -> Vec<SqlValue> {
        self.bindings().map(|(_, value)| value.clone()).collect()
    }

    /// Returns the number of completed batch rows.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.rows.len()
    }

    fn bindings(&self) -> impl Iterator<Item = &(SqlType, SqlValue)> {
        self.rows.iter().flatten().chain(self.current.iter())
    }

    /// Returns the rows, treating unfinished bindings as a final row.
    #[must_use]
    pub fn into_rows(mut self) -> Vec<Vec<SqlValue>> {
        if !self.current.is_empty() {
            self.rows.push(core::mem::take(&mut self.current));
        }
        self.rows
            .into_iter()
            .map(|row| row.into_iter().map(|(_, value)| value).collect())
            .collect()
    }
}

impl Encoder for ValueBuffer {
    fn bind(&mut self, sql_type: SqlType, value: SqlValue) -> Result<()> {
        self.current.push((sql_type, value));
        Ok(())
    }

    fn add_batch(&mut self) -> Result<()> {
        self.rows.push(core::mem::take(&mut self.current));
        Ok(())
    }
}

/// A [`Decoder`] over rows held in memory.
///
/// Like a database cursor it starts before the first row; call
/// [`Decoder::move_to_next_row`] before reading. [`RowSet::single`] starts
/// on its only row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    rows: Vec<Vec<SqlValue>>,
    row: Option<usize>,
    column: usize,
    last_null: bool,
}

impl RowSet {
    /// Creates a row set positioned before the first row.
    #[must_use]
    pub fn new(rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Creates a row set holding one row, positioned on it.
    #[must_use]
    pub fn single(row: Vec<SqlValue>) -> Self {
        Self {
            rows: vec![row],
            row: Some(0),
            ..Self::default()
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<ValueBuffer> for RowSet {
    fn from(buffer: ValueBuffer) -> Self {
        Self::new(buffer.into_rows())
    }
}

impl Decoder for RowSet {
    fn read(&mut self, _sql_type: SqlType) -> Result<SqlValue> {
        let value = self
            .row
            .and_then(|row| self.rows.get(row))
            .and_then(|row| row.get(self.column))
            .cloned()
            .ok_or(PersistError::MissingValue {
                column: self.column,
            })?;
        self.column += 1;
        self.last_null = value.is_null();
        Ok(value)
    }

    fn was_null(&self) -> bool {
        self.last_null
    }

    fn move_to_next_row(&mut self) -> Result<bool> {
        let next = self.row.map_or(0, |row| row + 1);
        self.row = Some(next.min(self.rows.len()));
        self.column = 0;
        self.last_null = false;
        Ok(next < self.rows.len())
    }

    fn move_to_first_row(&mut self) -> Result<()> {
        if self.rows.is_empty() {
            return Err(PersistError::EmptyResult);
        }
        self.row = Some(0);
        self.column = 0;
        self.last_null = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_batches() {
        let mut buffer = ValueBuffer::new();
        buffer.encode_integer32(1).unwrap();
        buffer.add_batch().unwrap();
        buffer.encode_integer32(2).unwrap();
        assert_eq!(buffer.batch_count(), 1);
        assert_eq!(buffer.len(), 2);
        assert_eq!(
            buffer.into_rows(),
            vec![vec![SqlValue::Int32(1)], vec![SqlValue::Int32(2)]]
        );
    }

    #[test]
    fn test_row_set_iteration() {
        let mut rows = RowSet::new(vec![vec![SqlValue::Int64(1)], vec![SqlValue::Int64(2)]]);
        assert!(matches!(
            rows.read(SqlType::Integer64),
            Err(PersistError::MissingValue { column: 0 })
        ));
        assert!(rows.move_to_next_row().unwrap());
        assert_eq!(rows.decode_integer64().unwrap(), 1);
        assert!(rows.move_to_next_row().unwrap());
        assert_eq!(rows.decode_integer64().unwrap(), 2);
        assert!(!rows.move_to_next_row().unwrap());
        assert!(!rows.move_to_next_row().unwrap());

        rows.move_to_first_row().unwrap();
        assert_eq!(rows.decode_integer64().unwrap(), 1);
    }

    #[test]
    fn test_empty_row_set() {
        let mut rows = RowSet::new(Vec::new());
        assert!(matches!(
            rows.move_to_first_row(),
            Err(PersistError::EmptyResult)
        ));
        assert!(!rows.move_to_next_row().unwrap());
    }

    #[test]
    fn test_was_null_tracks_last_column() {
        let mut rows = RowSet::single(vec![
            SqlValue::Text(String::from("abc")),
            SqlValue::Null,
        ]);
        assert_eq!(rows.decode_string().unwrap(), "abc");
        assert!(!rows.was_null());
        assert_eq!(rows.decode_integer32().unwrap(), 0);
        assert!(rows.was_null());
    }
}
