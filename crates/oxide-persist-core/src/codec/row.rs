//! Row templates for batched statements.
//!
//! A [`RowBatch`] starts from one template row; columns shared by every row
//! (an owner key, an entity key) are set once and the template is then
//! multiplied. Multiplication copies bindings, so rows stay independent.

use super::Encoder;
use crate::ast::SqlType;
use crate::error::{PersistError, Result};
use crate::identifier::ColumnName;
use crate::value::{SqlValue, ToSqlValue};

/// One row of typed column bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRow {
    bindings: Vec<(ColumnName, SqlType, SqlValue)>,
}

impl SqlRow {
    /// Creates a row with every column bound to NULL.
    #[must_use]
    pub fn new(columns: impl IntoIterator<Item = (ColumnName, SqlType)>) -> Self {
        Self {
            bindings: columns
                .into_iter()
                .map(|(name, ty)| (name, ty, SqlValue::Null))
                .collect(),
        }
    }

    fn index_of(&self, column: &str) -> Result<usize> {
        self.bindings
            .iter()
            .position(|(name, _, _)| name.as_str() == column)
            .ok_or_else(|| PersistError::MalformedNode(format!("row has no column `{column}`")))
    }

    /// Binds `value` to `column`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` for an unknown column.
    pub fn set(&mut self, column: &str, value: impl ToSqlValue) -> Result<()> {
        let index = self.index_of(column)?;
        self.bindings[index].2 = value.to_sql_value();
        Ok(())
    }

    /// Binds `value` to the column at `index`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` for an index past the last column.
    pub fn set_at(&mut self, index: usize, value: impl ToSqlValue) -> Result<()> {
        let width = self.bindings.len();
        let binding = self.bindings.get_mut(index).ok_or_else(|| {
            PersistError::MalformedNode(format!("column {index} of a row of {width}"))
        })?;
        binding.2 = value.to_sql_value();
        Ok(())
    }

    /// Returns the value bound to `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.bindings
            .iter()
            .find(|(name, _, _)| name.as_str() == column)
            .map(|(_, _, value)| value)
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.bindings.len()
    }

    /// Returns the columns and their types.
    pub fn columns(&self) -> impl Iterator<Item = (&ColumnName, SqlType)> {
        self.bindings.iter().map(|(name, ty, _)| (name, *ty))
    }

    /// Encodes every binding in column order.
    ///
    /// # Errors
    ///
    /// Returns `EncodingFailed` if a value does not fit its column type.
    pub fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        for (_, ty, value) in &self.bindings {
            encoder.encode(*ty, value.clone())?;
        }
        Ok(())
    }
}

/// A batch of rows sharing one column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    rows: Vec<SqlRow>,
}

impl RowBatch {
    /// Creates a batch holding a single template row.
    #[must_use]
    pub fn new(template: SqlRow) -> Self {
        Self {
            rows: vec![template],
        }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the batch has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&SqlRow> {
        self.rows.get(index)
    }

    /// Returns the row at `index` for mutation.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut SqlRow> {
        self.rows.get_mut(index)
    }

    /// Returns every row.
    #[must_use]
    pub fn rows(&self) -> &[SqlRow] {
        &self.rows
    }

    /// Binds `value` to `column` in every row.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` for an unknown column.
    pub fn set_all(&mut self, column: &str, value: impl ToSqlValue) -> Result<()> {
        let value = value.to_sql_value();
        for row in &mut self.rows {
            row.set(column, value.clone())?;
        }
        Ok(())
    }

    /// Binds `value` to `column` in the row at `index`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` for an unknown row or column.
    pub fn set(&mut self, index: usize, column: &str, value: impl ToSqlValue) -> Result<()> {
        let len = self.rows.len();
        self.rows
            .get_mut(index)
            .ok_or_else(|| PersistError::MalformedNode(format!("row {index} of a batch of {len}")))?
            .set(column, value)
    }

    /// Replaces every row by `count` copies of it.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `count` is zero.
    pub fn multiply_rows(&mut self, count: usize) -> Result<()> {
        check_count(count)?;
        self.rows = self
            .rows
            .iter()
            .flat_map(|row| core::iter::repeat(row).take(count).cloned())
            .collect();
        Ok(())
    }

    /// Replaces the row at `index` by `count` copies of it, in place.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `count` is zero or `index` is out of range.
    pub fn multiply_row(&mut self, index: usize, count: usize) -> Result<()> {
        check_count(count)?;
        let row = self.rows.get(index).cloned().ok_or_else(|| {
            PersistError::MalformedNode(format!("row {index} of a batch of {}", self.rows.len()))
        })?;
        let tail = self.rows.split_off(index + 1);
        self.rows.extend(core::iter::repeat(row).take(count - 1));
        self.rows.extend(tail);
        Ok(())
    }

    /// Encodes every row, closing each with [`Encoder::add_batch`].
    ///
    /// # Errors
    ///
    /// Returns the first encoding error.
    pub fn encode_into(&self, encoder: &mut dyn Encoder) -> Result<()> {
        for row in &self.rows {
            row.encode(encoder)?;
            encoder.add_batch()?;
        }
        Ok(())
    }
}

fn check_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(PersistError::MalformedNode(String::from(
            "cannot multiply a row zero times",
        )));
    }
    Ok(())
}
