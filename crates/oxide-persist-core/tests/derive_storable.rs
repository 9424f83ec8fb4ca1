//! Tests for the `#[derive(Storable)]` macro output.
//!
//! These tests verify that the derive macro generates:
//! - a `TypeDescriptor` with the right table name, members and annotations
//! - record conversions the converter can collect from and recover into
//! - field lists the conversion engine accepts or rejects as expected

mod common;

use common::{Owner, Pair, Pet, Point, Route, Segment, Wide};
use oxide_persist_core::ast::{ForeignKeyAction, Literal, SqlType};
use oxide_persist_core::catalog::SchemaRegistry;
use oxide_persist_core::codec::{Decoder, RowSet, ValueBuffer};
use oxide_persist_core::convert::{slot_count, Converter, FieldConstraint, FieldKind};
use oxide_persist_core::schema::{Annotation, Datum, MemberType, Persist, Storable};
use oxide_persist_core::value::SqlValue;
use oxide_persist_core::{Dependents, PersistError, Ref};
use oxide_persist_derive::Storable;

// =============================================================================
// Test: Descriptors
// =============================================================================

#[test]
fn test_explicit_table_name() {
    let descriptor = Point::descriptor();
    assert_eq!(descriptor.type_name, "Point");
    assert_eq!(descriptor.table, "points");
    assert_eq!(descriptor.primary_key(), vec![0, 1]);
}

#[test]
fn test_default_table_name_is_snake_case() {
    #[derive(Debug, Storable)]
    #[allow(dead_code)]
    struct LineItem {
        quantity: i32,
    }

    assert_eq!(LineItem::descriptor().table, "line_item");
    assert_eq!(Segment::descriptor().table, "segment");
}

#[test]
fn test_member_types_and_nullability() {
    let descriptor = Pair::descriptor();
    let [name, age] = descriptor.members.as_slice() else {
        panic!("expected two members");
    };
    assert_eq!(name.name, "name");
    assert!(matches!(name.member_type, MemberType::Scalar(SqlType::String)));
    assert!(!name.nullable);
    assert!(matches!(age.member_type, MemberType::Scalar(SqlType::Integer32)));
    assert!(age.nullable);
}

#[test]
fn test_column_attributes() {
    let descriptor = Pet::descriptor();
    let nickname = &descriptor.members[2];
    assert_eq!(nickname.name, "nickname");
    assert_eq!(nickname.column_name(), "nick");

    let owner = &descriptor.members[1];
    assert!(owner.annotations.iter().any(|a| matches!(
        a,
        Annotation::References {
            column: None,
            on_delete: Some(ForeignKeyAction::Cascade),
            on_update: None,
        }
    )));

    let legs = &descriptor.members[3];
    assert!(legs
        .annotations
        .iter()
        .any(|a| matches!(a, Annotation::Default(Literal::Integer(0)))));
    assert!(legs
        .annotations
        .iter()
        .any(|a| matches!(a, Annotation::Check(_))));

    let name = &Owner::descriptor().members[1];
    assert_eq!(name.sql_type, Some(SqlType::String64));
    assert!(name.annotations.iter().any(|a| matches!(a, Annotation::Unique)));
}

#[test]
fn test_collections_are_collection_members() {
    let descriptor = Route::descriptor();
    assert!(matches!(
        descriptor.members[2].member_type,
        MemberType::Collection(_)
    ));
}

// =============================================================================
// Test: Records
// =============================================================================

#[test]
fn test_record_round_trip() {
    let segment = Segment {
        start: Point { x: 1, y: 2 },
        end: None,
    };
    let record = segment.to_record();
    assert_eq!(record.len(), 2);
    assert_eq!(record.get(1), Some(&Datum::Record(None)));
    assert_eq!(Segment::from_record(record).unwrap(), segment);
}

#[test]
fn test_absent_composite_is_unexpected_null() {
    assert!(matches!(
        Point::from_datum(Datum::Record(None)),
        Err(PersistError::UnexpectedNull(name)) if name == "Point"
    ));
    assert!(matches!(
        Point::from_datum(Datum::Key(SqlValue::Int64(1))),
        Err(PersistError::UnsupportedOperation(_))
    ));
}

#[test]
fn test_short_record_is_missing_value() {
    let record = Pair {
        name: "a".into(),
        age: None,
    }
    .to_record();
    let mut data = record.data().to_vec();
    data.pop();
    assert!(matches!(
        Pair::from_record(data.into()),
        Err(PersistError::MissingValue { column: 1 })
    ));
}

// =============================================================================
// Test: Conversion of derived types
// =============================================================================

#[test]
fn test_derived_field_lists() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);

    let fields = converter.derive_fields::<Pet>().unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[2].name.as_str(), "nick");
    let FieldKind::Reference(owner) = &fields[1].kind else {
        panic!("expected a reference");
    };
    assert_eq!(owner.table.as_str(), "owners");
    assert_eq!(owner.sql_type, SqlType::Integer64);
    assert!(fields[3].has(&FieldConstraint::Default(Literal::Integer(0))));

    let fields = converter.derive_fields::<Route>().unwrap();
    assert_eq!(slot_count(&fields), 2);
}

#[test]
fn test_derivation_is_idempotent() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    let first = converter.derive_fields::<Segment>().unwrap();
    let second = converter.derive_fields::<Segment>().unwrap();
    assert_eq!(first, second);

    let uncached = Converter::new(&SchemaRegistry::new())
        .derive_fields::<Segment>()
        .unwrap();
    assert_eq!(first, uncached);
}

#[test]
fn test_null_count_symmetry() {
    fn slots<T: Storable>(instance: Option<&T>) -> Vec<SqlType> {
        let registry = SchemaRegistry::new();
        let converter = Converter::new(&registry);
        let mut buffer = ValueBuffer::new();
        converter.collect_values(instance, &mut buffer).unwrap();
        assert_eq!(
            buffer.len(),
            slot_count(&converter.derive_fields::<T>().unwrap())
        );
        buffer.types()
    }

    let segment = Segment {
        start: Point { x: 1, y: 2 },
        end: Some(Point { x: 3, y: 4 }),
    };
    assert_eq!(slots::<Segment>(None), slots(Some(&segment)));

    let pet = Pet {
        id: 1,
        owner: Ref::from_key(9_i64),
        nickname: None,
        legs: 4,
    };
    assert_eq!(slots::<Pet>(None), slots(Some(&pet)));
}

#[test]
fn test_round_trip_through_value_stream() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    let wide = Wide {
        id: 1,
        flag: true,
        tiny: -8,
        small: 300,
        big: i128::MAX,
        ratio: 0.5,
        precise: -2.25,
        initial: 'w',
        digest: [7; 16],
        payload: vec![1, 2, 3],
    };

    let mut buffer = ValueBuffer::new();
    converter.collect_values(Some(&wide), &mut buffer).unwrap();
    let mut rows = RowSet::from(buffer);
    rows.move_to_first_row().unwrap();
    assert_eq!(converter.recover::<Wide>(&mut rows).unwrap(), wide);
}

#[test]
fn test_round_trip_of_optional_embedded() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    for segment in [
        Segment {
            start: Point { x: 1, y: 2 },
            end: None,
        },
        Segment {
            start: Point { x: 0, y: 0 },
            end: Some(Point { x: 5, y: 6 }),
        },
    ] {
        let mut buffer = ValueBuffer::new();
        converter.collect_values(Some(&segment), &mut buffer).unwrap();
        let mut rows = RowSet::from(buffer);
        rows.move_to_first_row().unwrap();
        assert_eq!(converter.recover::<Segment>(&mut rows).unwrap(), segment);
    }
}

#[test]
fn test_recover_nullable() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    let mut buffer = ValueBuffer::new();
    converter.collect_values::<Pair>(None, &mut buffer).unwrap();
    let mut rows = RowSet::from(buffer);
    rows.move_to_first_row().unwrap();
    assert_eq!(converter.recover_nullable::<Pair>(&mut rows).unwrap(), None);
}

#[test]
fn test_collect_non_null_rejects_absent() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    let mut buffer = ValueBuffer::new();
    assert!(matches!(
        converter.collect_non_null::<Pair>(None, &mut buffer),
        Err(PersistError::UnexpectedNull(name)) if name == "Pair"
    ));
    assert!(buffer.is_empty());
}

// =============================================================================
// Test: Rejected types
// =============================================================================

#[derive(Debug, Storable)]
#[allow(dead_code)]
struct Nested {
    #[column(primary_key)]
    id: i64,
    inner: Box<Nested>,
}

impl Persist for Box<Nested> {
    fn member_type() -> MemberType {
        Nested::member_type()
    }

    fn to_datum(&self) -> Datum {
        self.as_ref().to_datum()
    }

    fn from_datum(datum: Datum) -> oxide_persist_core::Result<Self> {
        Nested::from_datum(datum).map(Box::new)
    }
}

#[test]
fn test_embedded_cycle_is_cyclic_schema() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    assert!(matches!(
        converter.derive_fields::<Nested>(),
        Err(PersistError::CyclicSchema { type_name, .. }) if type_name == "Nested"
    ));
}

#[derive(Debug, Storable)]
#[allow(dead_code)]
struct Conflicted {
    #[column(embedded, references)]
    point: Point,
}

#[test]
fn test_embedded_and_referenced_is_ambiguous() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    assert!(matches!(
        converter.derive_fields::<Conflicted>(),
        Err(PersistError::AmbiguousDecomposition { member, .. }) if member == "Conflicted.point"
    ));
}

#[derive(Debug, Storable)]
#[allow(dead_code)]
struct Outer {
    #[column(primary_key)]
    id: i64,
    route: Route,
}

#[test]
fn test_collection_inside_embedded_is_unsupported() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    assert!(matches!(
        converter.derive_fields::<Outer>(),
        Err(PersistError::UnsupportedType { member, .. }) if member == "Route.stops"
    ));
}

#[derive(Debug, Storable)]
#[allow(dead_code)]
struct ByName {
    #[column(references = "name")]
    owner: Owner,
    #[column(references = "missing")]
    other: Option<Owner>,
}

#[test]
fn test_reference_to_unknown_column() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    assert!(matches!(
        converter.derive_fields::<ByName>(),
        Err(PersistError::MissingReferencedField { target, column })
            if target == "Owner" && column == "missing"
    ));
}

#[derive(Debug, Storable)]
#[allow(dead_code)]
struct Keyless {
    tags: Dependents<Pair>,
}

#[test]
fn test_dependents_without_owner_key() {
    let registry = SchemaRegistry::new();
    let converter = Converter::new(&registry);
    assert!(matches!(
        converter.derive_fields::<Keyless>(),
        Err(PersistError::MissingReferencedField { target, .. }) if target == "Keyless"
    ));
    assert!(registry.is_empty());
}
