//! [`Persist`] for scalar Rust types and `Option<T>`.

use super::{Annotation, Datum, MemberType, Persist};
use crate::ast::SqlType;
use crate::error::{PersistError, Result};
use crate::value::SqlValue;

fn scalar(datum: Datum, sql_type: SqlType) -> Result<SqlValue> {
    let kind = datum.kind();
    let value = datum
        .into_value()
        .ok_or_else(|| PersistError::mismatch(sql_type, kind))?
        .coerce(sql_type)?;
    if value.is_null() {
        return Err(PersistError::UnexpectedNull(sql_type.to_string()));
    }
    Ok(value)
}

macro_rules! persist_scalar {
    (@take copy $value:expr) => {
        *$value
    };
    (@take clone $value:expr) => {
        $value.clone()
    };
    ($($ty:ty => $sql:ident, $variant:ident, $take:ident);+ $(;)?) => {
        $(
            impl Persist for $ty {
                fn member_type() -> MemberType {
                    MemberType::Scalar(SqlType::$sql)
                }

                fn to_datum(&self) -> Datum {
                    Datum::Value(SqlValue::$variant(persist_scalar!(@take $take self)))
                }

                fn from_datum(datum: Datum) -> Result<Self> {
                    match scalar(datum, SqlType::$sql)? {
                        SqlValue::$variant(v) => Ok(v),
                        other => Err(PersistError::mismatch(SqlType::$sql, other)),
                    }
                }
            }
        )+
    };
}

persist_scalar!(
    bool => Boolean, Bool, copy;
    i8 => Integer08, Int8, copy;
    i16 => Integer16, Int16, copy;
    i32 => Integer32, Int32, copy;
    i64 => Integer64, Int64, copy;
    i128 => Integer, Integer, copy;
    f32 => Decimal32, Float32, copy;
    f64 => Decimal64, Float64, copy;
    char => String01, Char, copy;
    String => String, Text, clone;
    Vec<u8> => Binary, Blob, clone;
);

macro_rules! persist_fixed_binary {
    ($($len:literal => $sql:ident),+) => {
        $(
            impl Persist for [u8; $len] {
                fn member_type() -> MemberType {
                    MemberType::Scalar(SqlType::$sql)
                }

                fn to_datum(&self) -> Datum {
                    Datum::Value(SqlValue::Blob(self.to_vec()))
                }

                fn from_datum(datum: Datum) -> Result<Self> {
                    match scalar(datum, SqlType::$sql)? {
                        SqlValue::Blob(bytes) => <[u8; $len]>::try_from(bytes)
                            .map_err(|b| PersistError::mismatch(SqlType::$sql, SqlValue::Blob(b))),
                        other => Err(PersistError::mismatch(SqlType::$sql, other)),
                    }
                }
            }
        )+
    };
}

persist_fixed_binary!(16 => Binary128, 32 => Binary256);

impl Persist for () {
    fn member_type() -> MemberType {
        MemberType::Scalar(SqlType::Empty)
    }

    fn to_datum(&self) -> Datum {
        Datum::Value(SqlValue::Null)
    }

    fn from_datum(_datum: Datum) -> Result<Self> {
        Ok(())
    }
}

impl<T: Persist> Persist for Option<T> {
    fn member_type() -> MemberType {
        T::member_type()
    }

    fn nullable() -> bool {
        true
    }

    fn implied_annotations() -> Vec<Annotation> {
        T::implied_annotations()
    }

    fn null_datum() -> Datum {
        T::null_datum()
    }

    fn to_datum(&self) -> Datum {
        self.as_ref().map_or_else(T::null_datum, T::to_datum)
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        if datum.is_null() {
            return Ok(None);
        }
        T::from_datum(datum).map(Some)
    }
}
