//! Pushing an instance's values into an [`Encoder`] in field order.

use super::fields::{CustomField, FieldKind, ReferenceField};
use crate::codec::Encoder;
use crate::error::{PersistError, Result};
use crate::schema::{Datum, Record};
use crate::value::SqlValue;

/// Encodes one slot per column of `fields`.
///
/// An absent record, or an absent embedded group, encodes a typed NULL in
/// every slot it would otherwise fill, so the slot count never depends on
/// the data.
pub(crate) fn collect_record(
    fields: &[CustomField],
    record: Option<&Record>,
    encoder: &mut dyn Encoder,
) -> Result<()> {
    for field in fields {
        let datum = match record {
            Some(record) => Some(record.get(field.index).ok_or_else(|| {
                PersistError::EncodingFailed(format!("no value for member '{}'", field.name))
            })?),
            None => None,
        };
        match &field.kind {
            FieldKind::Scalar(sql_type) => {
                let value = match datum {
                    Some(datum) => scalar_value(field, datum)?,
                    None => SqlValue::Null,
                };
                encoder.encode(*sql_type, value)?;
            }
            FieldKind::Reference(reference) => {
                let value = match datum {
                    Some(datum) => reference_key(field, reference, datum)?,
                    None => SqlValue::Null,
                };
                encoder.encode(reference.sql_type, value)?;
            }
            FieldKind::Embedded(nested) => {
                let group = match datum {
                    None | Some(Datum::Record(None)) => None,
                    Some(Datum::Record(Some(group))) => Some(group),
                    Some(other) => return Err(shape(field, other)),
                };
                collect_record(nested, group, encoder)?;
            }
            FieldKind::Dependent(_) => {}
        }
    }
    Ok(())
}

fn scalar_value(field: &CustomField, datum: &Datum) -> Result<SqlValue> {
    match datum {
        Datum::Value(value) => Ok(value.clone()),
        other => Err(shape(field, other)),
    }
}

fn reference_key(field: &CustomField, reference: &ReferenceField, datum: &Datum) -> Result<SqlValue> {
    match datum {
        Datum::Key(key) | Datum::Value(key) => Ok(key.clone()),
        Datum::Record(None) => Ok(SqlValue::Null),
        Datum::Record(Some(target)) => match target.get(reference.member_index) {
            Some(Datum::Value(key) | Datum::Key(key)) => Ok(key.clone()),
            _ => Err(PersistError::EncodingFailed(format!(
                "referenced column '{}' of member '{}' is not a scalar",
                reference.column, field.name
            ))),
        },
        Datum::Records(_) => Err(shape(field, datum)),
    }
}

fn shape(field: &CustomField, datum: &Datum) -> PersistError {
    PersistError::EncodingFailed(format!(
        "member '{}' cannot be encoded from {}",
        field.name,
        datum.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SqlType;
    use crate::codec::ValueBuffer;
    use crate::convert::fields::TypeRef;
    use crate::identifier::{ColumnName, TableName};
    use crate::schema::{Storable, TypeDescriptor};

    fn scalar(name: &str, index: usize, sql_type: SqlType, nullable: bool) -> CustomField {
        CustomField {
            name: ColumnName::new(name).unwrap(),
            index,
            kind: FieldKind::Scalar(sql_type),
            nullable,
            constraints: Vec::new(),
        }
    }

    fn point_fields() -> Vec<CustomField> {
        vec![
            scalar("x", 0, SqlType::Integer32, false),
            scalar("y", 1, SqlType::Integer32, false),
        ]
    }

    fn point(x: i32, y: i32) -> Record {
        Record::new(vec![
            Datum::Value(SqlValue::Int32(x)),
            Datum::Value(SqlValue::Int32(y)),
        ])
    }

    fn segment_fields() -> Vec<CustomField> {
        vec![
            CustomField {
                name: ColumnName::new("start").unwrap(),
                index: 0,
                kind: FieldKind::Embedded(point_fields()),
                nullable: false,
                constraints: Vec::new(),
            },
            CustomField {
                name: ColumnName::new("end").unwrap(),
                index: 1,
                kind: FieldKind::Embedded(point_fields()),
                nullable: true,
                constraints: Vec::new(),
            },
        ]
    }

    #[test]
    fn test_values_follow_field_order() {
        let mut buffer = ValueBuffer::new();
        collect_record(&point_fields(), Some(&point(1, 2)), &mut buffer).unwrap();
        assert_eq!(buffer.values(), vec![SqlValue::Int32(1), SqlValue::Int32(2)]);
    }

    #[test]
    fn test_absent_instance_fills_every_slot() {
        let record = Record::new(vec![Datum::Record(Some(point(1, 2))), Datum::Record(None)]);
        let mut present = ValueBuffer::new();
        collect_record(&segment_fields(), Some(&record), &mut present).unwrap();
        let mut absent = ValueBuffer::new();
        collect_record(&segment_fields(), None, &mut absent).unwrap();

        assert_eq!(present.len(), 4);
        assert_eq!(absent.len(), present.len());
        assert_eq!(absent.types(), present.types());
        assert!(absent.values().iter().all(SqlValue::is_null));
        assert_eq!(
            present.values(),
            vec![
                SqlValue::Int32(1),
                SqlValue::Int32(2),
                SqlValue::Null,
                SqlValue::Null
            ]
        );
    }

    #[test]
    fn test_coercion_failure_is_an_encoding_error() {
        let fields = vec![scalar("tag", 0, SqlType::String01, false)];
        let record = Record::new(vec![Datum::Value(SqlValue::Text("long".into()))]);
        let mut buffer = ValueBuffer::new();
        assert!(matches!(
            collect_record(&fields, Some(&record), &mut buffer),
            Err(PersistError::EncodingFailed(_))
        ));
    }

    #[derive(Debug)]
    struct Target;

    impl crate::schema::Persist for Target {
        fn member_type() -> crate::schema::MemberType {
            crate::schema::MemberType::Composite(Self::descriptor)
        }

        fn to_datum(&self) -> Datum {
            Datum::Record(None)
        }

        fn from_datum(_datum: Datum) -> Result<Self> {
            Ok(Self)
        }
    }

    impl Storable for Target {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::new::<Self>("Target", "targets", Vec::new())
        }

        fn to_record(&self) -> Record {
            Record::default()
        }

        fn from_record(_record: Record) -> Result<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn test_reference_takes_key_from_embedded_record() {
        let fields = vec![CustomField {
            name: ColumnName::new("target").unwrap(),
            index: 0,
            kind: FieldKind::Reference(ReferenceField {
                target: TypeRef::new(Target::descriptor),
                table: TableName::new("targets").unwrap(),
                column: ColumnName::new("id").unwrap(),
                member_index: 1,
                sql_type: SqlType::Integer64,
                on_delete: None,
                on_update: None,
            }),
            nullable: false,
            constraints: Vec::new(),
        }];
        let target = Record::new(vec![
            Datum::Value(SqlValue::Text("name".into())),
            Datum::Value(SqlValue::Int64(42)),
        ]);
        let record = Record::new(vec![Datum::Record(Some(target))]);
        let mut buffer = ValueBuffer::new();
        collect_record(&fields, Some(&record), &mut buffer).unwrap();
        assert_eq!(buffer.values(), vec![SqlValue::Int64(42)]);

        let record = Record::new(vec![Datum::Key(SqlValue::Int32(7))]);
        let mut buffer = ValueBuffer::new();
        collect_record(&fields, Some(&record), &mut buffer).unwrap();
        assert_eq!(buffer.values(), vec![SqlValue::Int64(7)]);
    }
}
