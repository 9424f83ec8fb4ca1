//! Fetched SQLite rows as a [`Decoder`].

use oxide_persist_core::ast::SqlType;
use oxide_persist_core::codec::{Decoder, RowSet};
use oxide_persist_core::error::{PersistError, Result};
use oxide_persist_core::value::SqlValue;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// A fully fetched SQLite result set.
///
/// Values are read back in their storage class (`INTEGER`, `REAL`, `TEXT`
/// or `BLOB`) and narrowed by [`Decoder::decode`]. Wide integers are
/// stored as text and parsed on read.
#[derive(Debug, Clone, Default)]
pub struct SqliteRows {
    rows: RowSet,
}

impl SqliteRows {
    /// Converts fetched rows.
    ///
    /// # Errors
    ///
    /// Returns `QueryExecutionFailed` if a column cannot be read.
    pub fn from_rows(rows: &[SqliteRow]) -> Result<Self> {
        let rows = rows.iter().map(row_values).collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rows: RowSet::new(rows),
        })
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the result set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn row_values(row: &SqliteRow) -> Result<Vec<SqlValue>> {
    (0..row.len()).map(|index| column_value(row, index)).collect()
}

fn column_value(row: &SqliteRow, index: usize) -> Result<SqlValue> {
    let failed = |e: sqlx::Error| PersistError::QueryExecutionFailed(Box::new(e));
    let raw = row.try_get_raw(index).map_err(failed)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_ascii_uppercase();
    Ok(match storage.as_str() {
        "REAL" => SqlValue::Float64(row.try_get_unchecked(index).map_err(failed)?),
        "TEXT" => SqlValue::Text(row.try_get_unchecked(index).map_err(failed)?),
        "BLOB" => SqlValue::Blob(row.try_get_unchecked(index).map_err(failed)?),
        _ => SqlValue::Int64(row.try_get_unchecked(index).map_err(failed)?),
    })
}

impl Decoder for SqliteRows {
    fn read(&mut self, sql_type: SqlType) -> Result<SqlValue> {
        match (sql_type, self.rows.read(sql_type)?) {
            (SqlType::Integer, SqlValue::Text(text)) => {
                text.trim()
                    .parse()
                    .map(SqlValue::Integer)
                    .map_err(|_| PersistError::TypeMismatch {
                        expected: SqlType::Integer,
                        found: format!("text '{text}'"),
                    })
            }
            (_, value) => Ok(value),
        }
    }

    fn was_null(&self) -> bool {
        self.rows.was_null()
    }

    fn move_to_next_row(&mut self) -> Result<bool> {
        self.rows.move_to_next_row()
    }

    fn move_to_first_row(&mut self) -> Result<()> {
        self.rows.move_to_first_row()
    }
}
