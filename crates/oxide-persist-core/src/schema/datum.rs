//! Values as they travel between a storable type and the converter.

use super::Persist;
use crate::error::{PersistError, Result};
use crate::value::SqlValue;

/// The stored form of one member.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// A scalar column value.
    Value(SqlValue),
    /// An embedded record, `None` when absent.
    Record(Option<Record>),
    /// The rows of a dependent collection.
    Records(Vec<Record>),
    /// The key of a referenced row.
    Key(SqlValue),
}

impl Datum {
    /// Returns whether this datum stands for an absent value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Value(SqlValue::Null) | Self::Key(SqlValue::Null) | Self::Record(None)
        )
    }

    /// Returns the scalar value of a `Value` or `Key` datum.
    #[must_use]
    pub fn into_value(self) -> Option<SqlValue> {
        match self {
            Self::Value(v) | Self::Key(v) => Some(v),
            Self::Record(_) | Self::Records(_) => None,
        }
    }

    /// Returns a short description of the datum's shape.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "a value",
            Self::Record(_) => "a record",
            Self::Records(_) => "a collection",
            Self::Key(_) => "a reference key",
        }
    }
}

/// One datum per member of a storable type, in member order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Vec<Datum>);

impl Record {
    /// Creates a record.
    #[must_use]
    pub const fn new(data: Vec<Datum>) -> Self {
        Self(data)
    }

    /// Returns the datum of member `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Datum> {
        self.0.get(index)
    }

    /// Returns the number of data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the record is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the data.
    #[must_use]
    pub fn data(&self) -> &[Datum] {
        &self.0
    }

    /// Replaces the datum of member `index`.
    ///
    /// # Errors
    ///
    /// Returns `MissingValue` when `index` is out of range.
    pub fn set(&mut self, index: usize, datum: Datum) -> Result<()> {
        let slot = self
            .0
            .get_mut(index)
            .ok_or(PersistError::MissingValue { column: index })?;
        *slot = datum;
        Ok(())
    }

    /// Starts reading members in order.
    #[must_use]
    pub fn reader(self) -> RecordReader {
        RecordReader {
            data: self.0.into_iter(),
            index: 0,
        }
    }
}

impl From<Vec<Datum>> for Record {
    fn from(data: Vec<Datum>) -> Self {
        Self(data)
    }
}

/// Reads the members of a [`Record`] in order.
#[derive(Debug)]
pub struct RecordReader {
    data: std::vec::IntoIter<Datum>,
    index: usize,
}

impl RecordReader {
    /// Converts the next datum into `T`.
    ///
    /// # Errors
    ///
    /// Returns `MissingValue` once the record is exhausted, or the member's
    /// own conversion error.
    pub fn read<T: Persist>(&mut self) -> Result<T> {
        let datum = self.data.next().ok_or(PersistError::MissingValue {
            column: self.index,
        })?;
        self.index += 1;
        T::from_datum(datum)
    }
}
