//! Schema descriptors for storable types.
//!
//! A storable type describes itself once, statically, through
//! [`Storable::descriptor`]: an ordered list of [`Member`]s, each with a
//! scalar type or a nested type and its annotations. The conversion engine
//! only ever walks descriptors; it never inspects values directly, which go
//! through [`Persist::to_datum`] and [`Persist::from_datum`].
//!
//! Descriptors are normally produced by `#[derive(Storable)]`:
//!
//! ```rust
//! use oxide_persist_core::schema::{Storable, MemberType};
//! use oxide_persist_derive::Storable;
//!
//! #[derive(Debug, Storable)]
//! #[table(name = "points")]
//! struct Point {
//!     #[column(primary_key)]
//!     x: i32,
//!     #[column(primary_key)]
//!     y: i32,
//! }
//!
//! let descriptor = Point::descriptor();
//! assert_eq!(descriptor.table, "points");
//! assert_eq!(descriptor.members.len(), 2);
//! ```

mod datum;
mod reference;
mod scalars;

use core::any::TypeId;
use core::fmt;

pub use datum::{Datum, Record, RecordReader};
pub use reference::{Dependents, Ref};

use crate::ast::{BooleanExpr, ForeignKeyAction, Literal, SqlType};
use crate::error::Result;
use crate::identifier::ColumnName;

/// What a member stores.
#[derive(Clone, Copy)]
pub enum MemberType {
    /// A single column of the given type.
    Scalar(SqlType),
    /// A nested storable type, embedded inline or referenced.
    Composite(fn() -> TypeDescriptor),
    /// A collection of a storable type, stored in a dependent table.
    Collection(fn() -> TypeDescriptor),
}

impl fmt::Debug for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(ty) => f.debug_tuple("Scalar").field(ty).finish(),
            Self::Composite(d) => f.debug_tuple("Composite").field(&d().type_name).finish(),
            Self::Collection(d) => f.debug_tuple("Collection").field(&d().type_name).finish(),
        }
    }
}

/// A constraint or decomposition annotation on a member.
#[derive(Debug, Clone)]
pub enum Annotation {
    /// NOT NULL (implied for non-optional members).
    NotNull,
    /// Part of the primary key.
    PrimaryKey,
    /// UNIQUE.
    Unique,
    /// DEFAULT literal.
    Default(Literal),
    /// Flatten a composite member into the owner's columns.
    Embedded,
    /// Store a composite member as a foreign key to its own table.
    References {
        /// Referenced column; defaults to the target's single primary key.
        column: Option<&'static str>,
        /// ON DELETE action.
        on_delete: Option<ForeignKeyAction>,
        /// ON UPDATE action.
        on_update: Option<ForeignKeyAction>,
    },
    /// CHECK predicate built from the member's column.
    Check(fn(&ColumnName) -> BooleanExpr),
}

/// One declared member of a storable type.
#[derive(Debug, Clone)]
pub struct Member {
    /// Member name as declared.
    pub name: &'static str,
    /// Column name override.
    pub column: Option<&'static str>,
    /// What the member stores.
    pub member_type: MemberType,
    /// Whether the member may be absent.
    pub nullable: bool,
    /// Scalar type override (e.g. `STRING64` for a `String`).
    pub sql_type: Option<SqlType>,
    /// Annotations, implied ones first.
    pub annotations: Vec<Annotation>,
}

impl Member {
    /// Describes a member of type `T`.
    #[must_use]
    pub fn of<T: Persist>(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            member_type: T::member_type(),
            nullable: T::nullable(),
            sql_type: None,
            annotations: T::implied_annotations(),
        }
    }

    /// Overrides the column name.
    #[must_use]
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Overrides the scalar type.
    #[must_use]
    pub const fn sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns the column name: the override or the member name.
    #[must_use]
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }

    /// Returns whether the member is annotated as part of the primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.annotations
            .iter()
            .any(|a| matches!(a, Annotation::PrimaryKey))
    }
}

/// The static description of a storable type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Rust type name, for diagnostics.
    pub type_name: &'static str,
    /// Table name.
    pub table: &'static str,
    /// Identity of the described type.
    pub type_id: TypeId,
    /// Members in declaration order.
    pub members: Vec<Member>,
}

impl TypeDescriptor {
    /// Creates a descriptor for `T`.
    #[must_use]
    pub fn new<T: 'static>(type_name: &'static str, table: &'static str, members: Vec<Member>) -> Self {
        Self {
            type_name,
            table,
            type_id: TypeId::of::<T>(),
            members,
        }
    }

    /// Returns the indices of the primary key members.
    #[must_use]
    pub fn primary_key(&self) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_primary_key())
            .map(|(i, _)| i)
            .collect()
    }
}

/// A type that can be stored in one or more columns.
///
/// Implemented for scalars, `Option<T>`, [`Ref`], [`Dependents`] and every
/// `#[derive(Storable)]` type.
pub trait Persist: Sized {
    /// Returns what a member of this type stores.
    fn member_type() -> MemberType;

    /// Returns whether a member of this type may be absent.
    fn nullable() -> bool {
        false
    }

    /// Returns annotations every member of this type carries.
    fn implied_annotations() -> Vec<Annotation> {
        Vec::new()
    }

    /// Returns the datum standing for an absent value of this type.
    fn null_datum() -> Datum {
        Datum::Value(crate::value::SqlValue::Null)
    }

    /// Converts the value into a datum.
    fn to_datum(&self) -> Datum;

    /// Rebuilds the value from a datum.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedNull` for an absent value and `TypeMismatch` for
    /// a datum of the wrong shape.
    fn from_datum(datum: Datum) -> Result<Self>;
}

/// A type with its own table.
pub trait Storable: Persist + 'static {
    /// Returns the static description of this type.
    fn descriptor() -> TypeDescriptor;

    /// Converts the value into one datum per member, in member order.
    fn to_record(&self) -> Record;

    /// Rebuilds the value from one datum per member, in member order.
    ///
    /// # Errors
    ///
    /// Returns the first member conversion error.
    fn from_record(record: Record) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_builder() {
        let member = Member::of::<Option<String>>("nick")
            .column("nickname")
            .sql_type(SqlType::String64)
            .annotate(Annotation::Unique);
        assert_eq!(member.column_name(), "nickname");
        assert!(member.nullable);
        assert_eq!(member.sql_type, Some(SqlType::String64));
        assert!(matches!(member.member_type, MemberType::Scalar(SqlType::String)));
        assert!(!member.is_primary_key());
    }

    #[test]
    fn test_primary_key_indices() {
        let descriptor = TypeDescriptor::new::<()>(
            "Pair",
            "pairs",
            vec![
                Member::of::<i32>("a").annotate(Annotation::PrimaryKey),
                Member::of::<i32>("b"),
                Member::of::<i32>("c").annotate(Annotation::PrimaryKey),
            ],
        );
        assert_eq!(descriptor.primary_key(), vec![0, 2]);
    }
}
