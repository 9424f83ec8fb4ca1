//! Members stored outside their owner's row.

use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use super::{Annotation, Datum, MemberType, Persist, Storable};
use crate::error::{PersistError, Result};
use crate::value::{SqlValue, ToSqlValue};

/// A reference to a row of `T`'s table, stored as one foreign key column.
///
/// The key is the value of the referenced column, by default the single
/// primary key member of `T`.
pub struct Ref<T> {
    key: SqlValue,
    _target: PhantomData<fn() -> T>,
}

impl<T: Storable> Ref<T> {
    /// References `target` through its single primary key member.
    ///
    /// # Errors
    ///
    /// Returns `MissingReferencedField` unless `T` has exactly one scalar
    /// primary key member.
    pub fn to(target: &T) -> Result<Self> {
        let descriptor = T::descriptor();
        let missing = || PersistError::MissingReferencedField {
            target: descriptor.type_name.to_string(),
            column: String::from("<primary key>"),
        };
        let primary_key = descriptor.primary_key();
        let [index] = primary_key.as_slice() else {
            return Err(missing());
        };
        let key = target
            .to_record()
            .get(*index)
            .cloned()
            .and_then(Datum::into_value)
            .ok_or_else(missing)?;
        Ok(Self::from_key(key))
    }
}

impl<T> Ref<T> {
    /// References the row whose key is `key`.
    pub fn from_key(key: impl ToSqlValue) -> Self {
        Self {
            key: key.to_sql_value(),
            _target: PhantomData,
        }
    }

    /// Returns the referenced key.
    #[must_use]
    pub const fn key(&self) -> &SqlValue {
        &self.key
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            _target: PhantomData,
        }
    }
}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&self.key).finish()
    }
}

impl<T: Storable> Persist for Ref<T> {
    fn member_type() -> MemberType {
        MemberType::Composite(T::descriptor)
    }

    fn implied_annotations() -> Vec<Annotation> {
        vec![Annotation::References {
            column: None,
            on_delete: None,
            on_update: None,
        }]
    }

    fn to_datum(&self) -> Datum {
        Datum::Key(self.key.clone())
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        match datum {
            Datum::Key(SqlValue::Null) | Datum::Value(SqlValue::Null) => Err(
                PersistError::UnexpectedNull(format!("reference to {}", T::descriptor().type_name)),
            ),
            Datum::Key(key) | Datum::Value(key) => Ok(Self::from_key(key)),
            other => Err(PersistError::UnsupportedOperation(format!(
                "a reference cannot be read from {}",
                other.kind()
            ))),
        }
    }
}

/// A one-to-many collection stored in a dependent table.
///
/// Each element becomes one row of `<owner table>_<member>`, keyed by the
/// owner's primary key and the element's position.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependents<T>(pub Vec<T>);

impl<T> Default for Dependents<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> From<Vec<T>> for Dependents<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T> Deref for Dependents<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Dependents<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Storable> Persist for Dependents<T> {
    fn member_type() -> MemberType {
        MemberType::Collection(T::descriptor)
    }

    fn null_datum() -> Datum {
        Datum::Records(Vec::new())
    }

    fn to_datum(&self) -> Datum {
        Datum::Records(self.0.iter().map(T::to_record).collect())
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        match datum {
            Datum::Records(records) => records
                .into_iter()
                .map(T::from_record)
                .collect::<Result<Vec<_>>>()
                .map(Self),
            other => Err(PersistError::UnsupportedOperation(format!(
                "a collection cannot be read from {}",
                other.kind()
            ))),
        }
    }
}
