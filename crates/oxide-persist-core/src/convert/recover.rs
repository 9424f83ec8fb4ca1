//! Reading a record back from a [`Decoder`] in field order.

use super::fields::{CustomField, FieldKind};
use crate::codec::Decoder;
use crate::error::{PersistError, Result};
use crate::schema::{Datum, Record};

/// Reads one row's worth of columns for `fields`.
///
/// Every slot is read before any null check, so a failed check never
/// leaves the decoder in the middle of a row group. Dependent fields come
/// back as empty collections.
pub(crate) fn recover_record(
    fields: &[CustomField],
    decoder: &mut dyn Decoder,
) -> Result<Record> {
    let raw = read_fields(fields, decoder)?;
    settle(fields, raw)
}

/// Like [`recover_record`], but an all-NULL row reads as `None`.
pub(crate) fn recover_optional(
    fields: &[CustomField],
    decoder: &mut dyn Decoder,
) -> Result<Option<Record>> {
    let raw = read_fields(fields, decoder)?;
    if is_all_null(&raw) {
        return Ok(None);
    }
    settle(fields, raw).map(Some)
}

/// Returns whether every column of the record is NULL.
pub(crate) fn is_all_null(record: &Record) -> bool {
    record.data().iter().all(|datum| match datum {
        Datum::Record(Some(group)) => is_all_null(group),
        Datum::Records(rows) => rows.is_empty(),
        other => other.is_null(),
    })
}

fn read_fields(fields: &[CustomField], decoder: &mut dyn Decoder) -> Result<Record> {
    let mut data = Vec::with_capacity(fields.len());
    for field in fields {
        let datum = match &field.kind {
            FieldKind::Scalar(sql_type) => Datum::Value(decoder.decode(*sql_type)?),
            FieldKind::Reference(reference) => Datum::Key(decoder.decode(reference.sql_type)?),
            FieldKind::Embedded(nested) => Datum::Record(Some(read_fields(nested, decoder)?)),
            FieldKind::Dependent(_) => Datum::Records(Vec::new()),
        };
        data.push(datum);
    }
    Ok(Record::new(data))
}

fn settle(fields: &[CustomField], raw: Record) -> Result<Record> {
    let mut data = Vec::with_capacity(fields.len());
    for (field, datum) in fields.iter().zip(raw.data().iter().cloned()) {
        let datum = match (&field.kind, datum) {
            (FieldKind::Embedded(nested), Datum::Record(Some(group))) => {
                if field.nullable && is_all_null(&group) {
                    Datum::Record(None)
                } else {
                    Datum::Record(Some(settle(nested, group)?))
                }
            }
            (_, datum) if datum.is_null() && !field.nullable => {
                return Err(PersistError::UnexpectedNull(field.name.to_string()));
            }
            (_, datum) => datum,
        };
        data.push(datum);
    }
    Ok(Record::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SqlType;
    use crate::codec::RowSet;
    use crate::identifier::ColumnName;
    use crate::value::SqlValue;

    fn field(name: &str, index: usize, kind: FieldKind, nullable: bool) -> CustomField {
        CustomField {
            name: ColumnName::new(name).unwrap(),
            index,
            kind,
            nullable,
            constraints: Vec::new(),
        }
    }

    fn pair_fields() -> Vec<CustomField> {
        vec![
            field("name", 0, FieldKind::Scalar(SqlType::String), false),
            field("age", 1, FieldKind::Scalar(SqlType::Integer32), true),
        ]
    }

    #[test]
    fn test_nullable_column_reads_null() {
        let mut rows = RowSet::single(vec![SqlValue::Text("abc".into()), SqlValue::Null]);
        let record = recover_record(&pair_fields(), &mut rows).unwrap();
        assert_eq!(
            record.data(),
            [
                Datum::Value(SqlValue::Text("abc".into())),
                Datum::Value(SqlValue::Null)
            ]
        );
        assert!(rows.was_null());
    }

    #[test]
    fn test_non_nullable_null_is_rejected() {
        let mut rows = RowSet::single(vec![SqlValue::Null, SqlValue::Int32(3)]);
        assert!(matches!(
            recover_record(&pair_fields(), &mut rows),
            Err(PersistError::UnexpectedNull(column)) if column == "name"
        ));
    }

    #[test]
    fn test_short_row_is_missing_value() {
        let mut rows = RowSet::single(vec![SqlValue::Text("abc".into())]);
        assert!(matches!(
            recover_record(&pair_fields(), &mut rows),
            Err(PersistError::MissingValue { column: 1 })
        ));
    }

    #[test]
    fn test_all_null_optional_group_is_absent() {
        let fields = vec![
            field("id", 0, FieldKind::Scalar(SqlType::Integer64), false),
            field("pair", 1, FieldKind::Embedded(pair_fields()), true),
        ];
        let mut rows = RowSet::single(vec![SqlValue::Int64(1), SqlValue::Null, SqlValue::Null]);
        let record = recover_record(&fields, &mut rows).unwrap();
        assert_eq!(record.get(1), Some(&Datum::Record(None)));

        // A present group still enforces its own non-nullable columns.
        let mut rows = RowSet::single(vec![SqlValue::Int64(1), SqlValue::Null, SqlValue::Int32(4)]);
        assert!(matches!(
            recover_record(&fields, &mut rows),
            Err(PersistError::UnexpectedNull(_))
        ));
    }

    #[test]
    fn test_optional_row() {
        let mut rows = RowSet::single(vec![SqlValue::Null, SqlValue::Null]);
        assert!(recover_optional(&pair_fields(), &mut rows).unwrap().is_none());
        let mut rows = RowSet::single(vec![SqlValue::Text("a".into()), SqlValue::Null]);
        assert!(recover_optional(&pair_fields(), &mut rows).unwrap().is_some());
    }

    #[test]
    fn test_wrong_type_is_a_mismatch() {
        let mut rows = RowSet::single(vec![SqlValue::Text("abc".into()), SqlValue::Text("x".into())]);
        assert!(matches!(
            recover_record(&pair_fields(), &mut rows),
            Err(PersistError::TypeMismatch { .. })
        ));
    }
}
