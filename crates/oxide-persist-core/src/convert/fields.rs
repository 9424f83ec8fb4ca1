//! Schema derivation: from a [`TypeDescriptor`] to an ordered field list.
//!
//! The field list is the single source of ordering for table creation,
//! value collection and value recovery. Derivation is all-or-nothing: a
//! type with one bad member yields an error and no fields.

use core::any::TypeId;
use core::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::ast::{BooleanExpr, ForeignKeyAction, Literal, SqlType};
use crate::error::{PersistError, Result};
use crate::identifier::{ColumnName, Prefix, TableName};
use crate::schema::{Annotation, Member, MemberType, TypeDescriptor};

/// A handle on a storable type's descriptor.
#[derive(Clone, Copy)]
pub struct TypeRef(fn() -> TypeDescriptor);

impl TypeRef {
    /// Wraps a descriptor function.
    #[must_use]
    pub const fn new(descriptor: fn() -> TypeDescriptor) -> Self {
        Self(descriptor)
    }

    /// Builds the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> TypeDescriptor {
        (self.0)()
    }

    /// Returns the identity of the described type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.descriptor().type_id
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().type_name)
    }
}

/// A column-level constraint carried by a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldConstraint {
    /// NOT NULL.
    NotNull,
    /// Part of the primary key.
    PrimaryKey,
    /// UNIQUE.
    Unique,
    /// DEFAULT literal.
    Default(Literal),
    /// CHECK predicate.
    Check(BooleanExpr),
}

/// A foreign key column standing for a composite member.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceField {
    /// The referenced type.
    pub target: TypeRef,
    /// The referenced table.
    pub table: TableName,
    /// The referenced column.
    pub column: ColumnName,
    /// Index of the referenced member in the target's record.
    pub member_index: usize,
    /// Type of the referenced column.
    pub sql_type: SqlType,
    /// ON DELETE action.
    pub on_delete: Option<ForeignKeyAction>,
    /// ON UPDATE action.
    pub on_update: Option<ForeignKeyAction>,
}

/// A collection member stored in its own table.
#[derive(Debug, Clone, PartialEq)]
pub struct DependentField {
    /// The element type.
    pub target: TypeRef,
    /// The dependent table, `<owner>_<member>`.
    pub table: TableName,
    /// Fields of the element type.
    pub fields: Arc<[CustomField]>,
}

/// What a field stores.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// One column.
    Scalar(SqlType),
    /// Columns of a nested type, flattened with a prefix.
    Embedded(Vec<CustomField>),
    /// One foreign key column.
    Reference(ReferenceField),
    /// Rows of a dependent table; no column in the owner's row.
    Dependent(DependentField),
}

/// A schema element derived from one member.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomField {
    /// Column name, or column prefix for embedded fields.
    pub name: ColumnName,
    /// Index of the member in its owner's record.
    pub index: usize,
    /// What the field stores.
    pub kind: FieldKind,
    /// Whether the member may be absent.
    pub nullable: bool,
    /// Column constraints in annotation order.
    pub constraints: Vec<FieldConstraint>,
}

impl CustomField {
    /// Returns whether the field is part of the primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.has(&FieldConstraint::PrimaryKey)
    }

    /// Returns whether the field carries `constraint`.
    #[must_use]
    pub fn has(&self, constraint: &FieldConstraint) -> bool {
        self.constraints.contains(constraint)
    }

    /// Returns how many parameter slots the field fills in its owner's row.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        match &self.kind {
            FieldKind::Scalar(_) | FieldKind::Reference(_) => 1,
            FieldKind::Embedded(fields) => slot_count(fields),
            FieldKind::Dependent(_) => 0,
        }
    }
}

/// Returns how many parameter slots a field list fills.
#[must_use]
pub fn slot_count(fields: &[CustomField]) -> usize {
    fields.iter().map(CustomField::slot_count).sum()
}

/// One column of a flattened field list.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatColumn {
    /// Column name.
    pub name: ColumnName,
    /// Column type.
    pub sql_type: SqlType,
    /// Whether NOT NULL is declared.
    pub not_null: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Default value.
    pub default: Option<Literal>,
    /// The reference this column stands for.
    pub reference: Option<ReferenceField>,
}

/// Flattens a field list into its columns, in slot order.
///
/// Columns under a nullable embedded field are declared nullable, since an
/// absent group stores NULL in every column.
#[must_use]
pub fn flatten(fields: &[CustomField]) -> Vec<FlatColumn> {
    let mut columns = Vec::with_capacity(slot_count(fields));
    flatten_into(fields, false, false, &mut columns);
    columns
}

fn flatten_into(fields: &[CustomField], optional: bool, key: bool, out: &mut Vec<FlatColumn>) {
    for field in fields {
        let primary_key = key || field.is_primary_key();
        let not_null = primary_key
            || field.has(&FieldConstraint::NotNull)
            || (!optional && !field.nullable);
        let default = field.constraints.iter().find_map(|c| match c {
            FieldConstraint::Default(literal) => Some(literal.clone()),
            _ => None,
        });
        match &field.kind {
            FieldKind::Scalar(sql_type) => out.push(FlatColumn {
                name: field.name.clone(),
                sql_type: *sql_type,
                not_null,
                primary_key,
                default,
                reference: None,
            }),
            FieldKind::Reference(reference) => out.push(FlatColumn {
                name: field.name.clone(),
                sql_type: reference.sql_type,
                not_null,
                primary_key,
                default,
                reference: Some(reference.clone()),
            }),
            FieldKind::Embedded(nested) => {
                flatten_into(nested, optional || field.nullable, primary_key, out);
            }
            FieldKind::Dependent(_) => {}
        }
    }
}

/// Derives fields for one descriptor, tracking the types being derived.
pub(crate) struct Derivation {
    stack: Vec<(TypeId, &'static str)>,
}

impl Derivation {
    pub(crate) const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub(crate) fn derive(&mut self, descriptor: &TypeDescriptor) -> Result<Vec<CustomField>> {
        self.derive_nested(descriptor, None)
    }

    fn derive_nested(
        &mut self,
        descriptor: &TypeDescriptor,
        prefix: Option<&Prefix>,
    ) -> Result<Vec<CustomField>> {
        if self.stack.iter().any(|(id, _)| *id == descriptor.type_id) {
            let mut path: Vec<&str> = self.stack.iter().map(|(_, name)| *name).collect();
            path.push(descriptor.type_name);
            return Err(PersistError::CyclicSchema {
                type_name: descriptor.type_name.to_string(),
                path: path.join(" -> "),
            });
        }
        debug!(type_name = descriptor.type_name, "Deriving fields");
        self.stack.push((descriptor.type_id, descriptor.type_name));
        let fields = descriptor
            .members
            .iter()
            .enumerate()
            .map(|(index, member)| self.derive_member(descriptor, index, member, prefix))
            .collect::<Result<Vec<_>>>();
        self.stack.pop();
        let fields = fields?;
        if prefix.is_none() {
            check_dependents_have_owner_key(descriptor, &fields)?;
        }
        Ok(fields)
    }

    fn derive_member(
        &mut self,
        owner: &TypeDescriptor,
        index: usize,
        member: &Member,
        prefix: Option<&Prefix>,
    ) -> Result<CustomField> {
        let qualified = || format!("{}.{}", owner.type_name, member.name);
        let ambiguous = |detail: &str| PersistError::AmbiguousDecomposition {
            member: qualified(),
            detail: detail.to_string(),
        };

        let name = match prefix {
            Some(prefix) => prefix.apply(member.column_name())?,
            None => ColumnName::new(member.column_name())?,
        };
        let embedded = member
            .annotations
            .iter()
            .any(|a| matches!(a, Annotation::Embedded));
        let reference = member.annotations.iter().rev().find_map(|a| match a {
            Annotation::References {
                column,
                on_delete,
                on_update,
            } => Some((*column, *on_delete, *on_update)),
            _ => None,
        });

        let kind = match member.member_type {
            MemberType::Scalar(declared) => {
                if embedded || reference.is_some() {
                    return Err(ambiguous("a scalar member can be neither embedded nor referenced"));
                }
                let sql_type = member.sql_type.unwrap_or(declared);
                if sql_type == SqlType::Empty {
                    return Err(PersistError::UnsupportedType {
                        member: qualified(),
                        detail: String::from("EMPTY has no column representation"),
                    });
                }
                FieldKind::Scalar(sql_type)
            }
            MemberType::Composite(target) => {
                if member.sql_type.is_some() {
                    return Err(PersistError::UnsupportedType {
                        member: qualified(),
                        detail: String::from("a composite member has no single SQL type"),
                    });
                }
                match reference {
                    Some(_) if embedded => {
                        return Err(ambiguous("a member cannot be both embedded and referenced"));
                    }
                    Some((column, on_delete, on_update)) => FieldKind::Reference(
                        resolve_reference(TypeRef::new(target), column, on_delete, on_update)?,
                    ),
                    None => {
                        let nested = match prefix {
                            Some(prefix) => prefix.nest(member.column_name())?,
                            None => Prefix::new(member.column_name())?,
                        };
                        let fields = self.derive_nested(&target(), Some(&nested))?;
                        FieldKind::Embedded(fields)
                    }
                }
            }
            MemberType::Collection(target) => {
                if embedded || reference.is_some() || member.sql_type.is_some() {
                    return Err(ambiguous("a collection is always stored in a dependent table"));
                }
                if member.is_primary_key() {
                    return Err(ambiguous("a collection cannot be part of the primary key"));
                }
                if prefix.is_some() {
                    return Err(PersistError::UnsupportedType {
                        member: qualified(),
                        detail: String::from("collections cannot be nested inside embedded members"),
                    });
                }
                let element = target();
                let fields = self.derive_nested(&element, None)?;
                if fields
                    .iter()
                    .any(|f| matches!(f.kind, FieldKind::Dependent(_)))
                {
                    return Err(PersistError::UnsupportedType {
                        member: qualified(),
                        detail: format!("{} has collections of its own", element.type_name),
                    });
                }
                FieldKind::Dependent(DependentField {
                    target: TypeRef::new(target),
                    table: TableName::new(format!("{}_{}", owner.table, member.name))?,
                    fields: fields.into(),
                })
            }
        };

        let constraints = member
            .annotations
            .iter()
            .filter_map(|a| match a {
                Annotation::NotNull => Some(FieldConstraint::NotNull),
                Annotation::PrimaryKey => Some(FieldConstraint::PrimaryKey),
                Annotation::Unique => Some(FieldConstraint::Unique),
                Annotation::Default(literal) => Some(FieldConstraint::Default(literal.clone())),
                Annotation::Check(build) => Some(FieldConstraint::Check(build(&name))),
                Annotation::Embedded | Annotation::References { .. } => None,
            })
            .collect();

        Ok(CustomField {
            name,
            index,
            kind,
            nullable: member.nullable,
            constraints,
        })
    }
}

fn resolve_reference(
    target: TypeRef,
    column: Option<&'static str>,
    on_delete: Option<ForeignKeyAction>,
    on_update: Option<ForeignKeyAction>,
) -> Result<ReferenceField> {
    let descriptor = target.descriptor();
    let missing = || PersistError::MissingReferencedField {
        target: descriptor.type_name.to_string(),
        column: column.unwrap_or("<primary key>").to_string(),
    };
    let member_index = match column {
        Some(column) => descriptor
            .members
            .iter()
            .position(|m| m.column_name() == column)
            .ok_or_else(missing)?,
        None => match descriptor.primary_key().as_slice() {
            [index] => *index,
            _ => return Err(missing()),
        },
    };
    let member = &descriptor.members[member_index];
    let MemberType::Scalar(declared) = member.member_type else {
        return Err(missing());
    };
    Ok(ReferenceField {
        target,
        table: TableName::new(descriptor.table)?,
        column: ColumnName::new(member.column_name())?,
        member_index,
        sql_type: member.sql_type.unwrap_or(declared),
        on_delete,
        on_update,
    })
}

fn check_dependents_have_owner_key(
    descriptor: &TypeDescriptor,
    fields: &[CustomField],
) -> Result<()> {
    let has_dependents = fields
        .iter()
        .any(|f| matches!(f.kind, FieldKind::Dependent(_)));
    if has_dependents && !flatten(fields).iter().any(|c| c.primary_key) {
        return Err(PersistError::MissingReferencedField {
            target: descriptor.type_name.to_string(),
            column: String::from("<primary key>"),
        });
    }
    Ok(())
}
