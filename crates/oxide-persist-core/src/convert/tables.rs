//! Table definitions and keyed statements derived from field lists.

use super::collect::collect_record;
use super::fields::{flatten, CustomField, DependentField, FieldConstraint, FieldKind, FlatColumn, TypeRef};
use crate::ast::{
    Assignment, BooleanExpr, CheckConstraint, ColumnDef, CreateTable, Delete, ForeignKeyAction,
    ForeignKeyConstraint, Insert, Node, OrderDirection, PrimaryKeyConstraint, Select, SqlType,
    TableConstraint, Update, UniqueConstraint,
};
use crate::catalog::{Site, ENTITY_COLUMN};
use crate::codec::{Encoder, RowBatch, SqlRow, ValueBuffer};
use crate::error::{PersistError, Result};
use crate::identifier::{ColumnName, Prefix, QualifiedColumnName, TableName};
use crate::schema::{Datum, Record, TypeDescriptor};
use crate::value::SqlValue;

/// Name of the element position column of dependent tables.
pub const POSITION_COLUMN: &str = "position";

const OWNER_PREFIX: &str = "owner";

/// A statement together with its parameter values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound<S> {
    /// The statement.
    pub statement: S,
    /// One value per placeholder.
    pub values: Vec<SqlValue>,
}

impl<S> Bound<S> {
    /// Encodes the values against the placeholder types of the rendered
    /// statement.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if the counts differ and `EncodingFailed` if
    /// a value does not fit its placeholder.
    pub fn encode(&self, parameters: &[SqlType], encoder: &mut dyn Encoder) -> Result<()> {
        if parameters.len() != self.values.len() {
            return Err(PersistError::MalformedNode(format!(
                "statement has {} placeholder(s) but {} value(s)",
                parameters.len(),
                self.values.len()
            )));
        }
        for (sql_type, value) in parameters.iter().zip(&self.values) {
            encoder.encode(*sql_type, value.clone())?;
        }
        Ok(())
    }
}

/// The rows of one dependent collection, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct DependentRows {
    /// Single-row INSERT into the dependent table.
    pub insert: Insert,
    /// One row per element.
    pub batch: RowBatch,
}

pub(crate) fn entity_key(site: &Site) -> Option<SqlValue> {
    site.entity().map(|entity| SqlValue::Int64(entity.key))
}

fn entity_filter(site: &Site) -> Option<BooleanExpr> {
    site.entity().map(|_| {
        BooleanExpr::key_match(ColumnName::builtin(ENTITY_COLUMN), SqlType::Integer64)
    })
}

fn column_def(column: &FlatColumn) -> ColumnDef {
    let mut def = ColumnDef::new(column.name.clone(), column.sql_type);
    if column.not_null {
        def = def.not_null();
    }
    if let Some(literal) = &column.default {
        def = def.default(literal.clone());
    }
    def
}

fn foreign_key(
    columns: Vec<ColumnName>,
    table: TableName,
    reference_columns: Vec<ColumnName>,
    on_delete: Option<ForeignKeyAction>,
    on_update: Option<ForeignKeyAction>,
) -> Result<TableConstraint> {
    let mut fk = ForeignKeyConstraint::new(columns, table, reference_columns)?;
    fk.on_delete = on_delete;
    fk.on_update = on_update;
    Ok(TableConstraint::ForeignKey(fk))
}

fn reference_constraints(columns: &[FlatColumn]) -> Result<Vec<TableConstraint>> {
    columns
        .iter()
        .filter_map(|c| c.reference.as_ref().map(|r| (c, r)))
        .map(|(column, reference)| {
            foreign_key(
                vec![column.name.clone()],
                reference.table.clone(),
                vec![reference.column.clone()],
                reference.on_delete,
                reference.on_update,
            )
        })
        .collect()
}

fn check_constraints(fields: &[CustomField], out: &mut Vec<TableConstraint>) -> Result<()> {
    for field in fields {
        for constraint in &field.constraints {
            if let FieldConstraint::Check(predicate) = constraint {
                out.push(TableConstraint::Check(CheckConstraint::new(predicate.clone())?));
            }
        }
        if let FieldKind::Embedded(nested) = &field.kind {
            check_constraints(nested, out)?;
        }
    }
    Ok(())
}

fn unique_constraints(fields: &[CustomField], out: &mut Vec<TableConstraint>) -> Result<()> {
    for field in fields {
        if field.has(&FieldConstraint::Unique) {
            let columns = flatten(core::slice::from_ref(field))
                .into_iter()
                .map(|c| c.name)
                .collect();
            out.push(TableConstraint::Unique(UniqueConstraint::new(columns)?));
        }
        if let FieldKind::Embedded(nested) = &field.kind {
            unique_constraints(nested, out)?;
        }
    }
    Ok(())
}

/// Builds the CREATE TABLE statement of a type's own table.
pub(crate) fn create_table(
    descriptor: &TypeDescriptor,
    fields: &[CustomField],
    site: &Site,
) -> Result<CreateTable> {
    let columns = flatten(fields);
    let mut defs: Vec<ColumnDef> = site.entity_column().into_iter().collect();
    defs.extend(columns.iter().map(column_def));

    let mut constraints = Vec::new();
    let key: Vec<ColumnName> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();
    if !key.is_empty() {
        constraints.push(TableConstraint::PrimaryKey(PrimaryKeyConstraint::new(key)?));
    }
    unique_constraints(fields, &mut constraints)?;
    constraints.extend(reference_constraints(&columns)?);
    check_constraints(fields, &mut constraints)?;
    constraints.extend(site.entity_reference()?);

    let create = CreateTable::new(TableName::new(descriptor.table)?, defs)?;
    Ok(constraints
        .into_iter()
        .fold(create, CreateTable::constraint)
        .if_not_exists())
}

fn owner_key(fields: &[CustomField]) -> Result<Vec<(ColumnName, ColumnName, SqlType)>> {
    let prefix = Prefix::new(OWNER_PREFIX)?;
    flatten(fields)
        .into_iter()
        .filter(|c| c.primary_key)
        .map(|c| Ok((prefix.apply(c.name.as_str())?, c.name, c.sql_type)))
        .collect()
}

/// Returns every column of a dependent table, failing with
/// `AmbiguousDecomposition` if an element column takes the name of the
/// entity, owner key or position column.
fn dependent_columns(
    owner_fields: &[CustomField],
    dependent: &DependentField,
    site: &Site,
) -> Result<Vec<(ColumnName, SqlType)>> {
    let mut columns: Vec<(ColumnName, SqlType)> = site
        .entity_column()
        .into_iter()
        .map(|c| (c.name, c.sql_type))
        .collect();
    columns.extend(
        owner_key(owner_fields)?
            .into_iter()
            .map(|(column, _, sql_type)| (column, sql_type)),
    );
    columns.push((ColumnName::builtin(POSITION_COLUMN), SqlType::Integer32));
    for column in flatten(&dependent.fields) {
        if columns.iter().any(|(reserved, _)| *reserved == column.name) {
            return Err(PersistError::AmbiguousDecomposition {
                member: column.name.to_string(),
                detail: format!(
                    "column is reserved in dependent table '{}'",
                    dependent.table
                ),
            });
        }
        columns.push((column.name, column.sql_type));
    }
    Ok(columns)
}

/// Builds the CREATE TABLE statement of one dependent collection.
///
/// The table holds the owner's key columns as `owner_<column>`, the
/// element position and the element's own columns. Rows are deleted with
/// their owner.
pub(crate) fn create_dependent_table(
    owner: &TypeDescriptor,
    owner_fields: &[CustomField],
    dependent: &DependentField,
    site: &Site,
) -> Result<CreateTable> {
    dependent_columns(owner_fields, dependent, site)?;
    let owner_key = owner_key(owner_fields)?;
    let element = flatten(&dependent.fields);

    let mut defs: Vec<ColumnDef> = site.entity_column().into_iter().collect();
    defs.extend(
        owner_key
            .iter()
            .map(|(column, _, sql_type)| ColumnDef::new(column.clone(), *sql_type).not_null()),
    );
    defs.push(ColumnDef::new(ColumnName::builtin(POSITION_COLUMN), SqlType::Integer32).not_null());
    defs.extend(element.iter().map(column_def));

    let owner_columns: Vec<ColumnName> = owner_key.iter().map(|(c, _, _)| c.clone()).collect();
    let mut key = owner_columns.clone();
    key.push(ColumnName::builtin(POSITION_COLUMN));

    let mut constraints = vec![
        TableConstraint::PrimaryKey(PrimaryKeyConstraint::new(key)?),
        foreign_key(
            owner_columns,
            TableName::new(owner.table)?,
            owner_key.iter().map(|(_, c, _)| c.clone()).collect(),
            Some(ForeignKeyAction::Cascade),
            None,
        )?,
    ];
    constraints.extend(reference_constraints(&element)?);
    check_constraints(&dependent.fields, &mut constraints)?;
    constraints.extend(site.entity_reference()?);

    let create = CreateTable::new(dependent.table.clone(), defs)?;
    Ok(constraints
        .into_iter()
        .fold(create, CreateTable::constraint)
        .if_not_exists())
}

/// Returns the referenced types stored in a type's own row.
pub(crate) fn row_references(fields: &[CustomField]) -> Vec<TypeRef> {
    let mut targets = Vec::new();
    collect_references(fields, &mut targets);
    targets
}

fn collect_references(fields: &[CustomField], out: &mut Vec<TypeRef>) {
    for field in fields {
        match &field.kind {
            FieldKind::Reference(reference) => out.push(reference.target),
            FieldKind::Embedded(nested) => collect_references(nested, out),
            FieldKind::Scalar(_) | FieldKind::Dependent(_) => {}
        }
    }
}

/// Returns the dependent fields of a type.
pub(crate) fn dependents(fields: &[CustomField]) -> impl Iterator<Item = (&CustomField, &DependentField)> {
    fields.iter().filter_map(|field| match &field.kind {
        FieldKind::Dependent(dependent) => Some((field, dependent)),
        _ => None,
    })
}

fn column_types(fields: &[CustomField], site: &Site) -> Vec<(ColumnName, SqlType)> {
    let mut columns: Vec<(ColumnName, SqlType)> = site
        .entity_column()
        .into_iter()
        .map(|c| (c.name, c.sql_type))
        .collect();
    columns.extend(flatten(fields).into_iter().map(|c| (c.name, c.sql_type)));
    columns
}

/// Builds an INSERT of `rows` rows of every column.
pub(crate) fn insert_statement(
    descriptor: &TypeDescriptor,
    fields: &[CustomField],
    site: &Site,
    rows: usize,
) -> Result<Insert> {
    Insert::parameterized(TableName::new(descriptor.table)?, &column_types(fields, site), rows)
}

/// Encodes one INSERT row: the entity key, then every column.
pub(crate) fn encode_insert_row(
    fields: &[CustomField],
    site: &Site,
    record: Option<&Record>,
    encoder: &mut dyn Encoder,
) -> Result<()> {
    if let Some(key) = entity_key(site) {
        encoder.encode(SqlType::Integer64, key)?;
    }
    collect_record(fields, record, encoder)
}

/// Builds a SELECT of every column, scoped to the site's entity.
pub(crate) fn select_statement(
    descriptor: &TypeDescriptor,
    fields: &[CustomField],
    site: &Site,
    filter: Option<BooleanExpr>,
) -> Result<Select> {
    let select = flatten(fields)
        .into_iter()
        .fold(Select::new(TableName::new(descriptor.table)?), |s, c| {
            s.column(c.name)
        });
    Ok(
        match BooleanExpr::all(entity_filter(site).into_iter().chain(filter)) {
            Some(predicate) => select.where_clause(predicate),
            None => select,
        },
    )
}

/// Builds a SELECT whose values are the entity key, then `values`.
pub(crate) fn select(
    descriptor: &TypeDescriptor,
    fields: &[CustomField],
    site: &Site,
    filter: Option<BooleanExpr>,
    values: Vec<SqlValue>,
) -> Result<Bound<Select>> {
    let statement = select_statement(descriptor, fields, site, filter)?;
    let values = entity_key(site).into_iter().chain(values).collect();
    Ok(Bound { statement, values })
}

fn require_key(descriptor: &TypeDescriptor, columns: &[FlatColumn]) -> Result<()> {
    if columns.iter().any(|c| c.primary_key) {
        Ok(())
    } else {
        Err(PersistError::UnsupportedOperation(format!(
            "{} has no primary key",
            descriptor.type_name
        )))
    }
}

fn key_predicate<'c>(
    columns: impl Iterator<Item = &'c FlatColumn>,
    site: &Site,
) -> Option<BooleanExpr> {
    BooleanExpr::all(
        columns
            .map(|c| BooleanExpr::key_match(c.name.clone(), c.sql_type))
            .chain(entity_filter(site)),
    )
}

fn record_values(fields: &[CustomField], record: &Record) -> Result<Vec<SqlValue>> {
    let mut buffer = ValueBuffer::new();
    collect_record(fields, Some(record), &mut buffer)?;
    Ok(buffer.values())
}

/// Returns the owner key columns and values of a record.
pub(crate) fn key_values(fields: &[CustomField], record: &Record) -> Result<Vec<(FlatColumn, SqlValue)>> {
    Ok(flatten(fields)
        .into_iter()
        .zip(record_values(fields, record)?)
        .filter(|(column, _)| column.primary_key)
        .collect())
}

/// Builds a keyed UPDATE of every non-key column.
pub(crate) fn update(
    descriptor: &TypeDescriptor,
    fields: &[CustomField],
    site: &Site,
    record: &Record,
) -> Result<Bound<Update>> {
    let columns = flatten(fields);
    require_key(descriptor, &columns)?;
    let values = record_values(fields, record)?;

    let (keys, rest): (Vec<_>, Vec<_>) = columns.iter().zip(values).partition(|(c, _)| c.primary_key);
    let assignments = rest
        .iter()
        .map(|(c, _)| Assignment {
            column: c.name.clone(),
            value: Node::parameter(c.sql_type),
        })
        .collect();
    let mut statement = Update::new(TableName::new(descriptor.table)?, assignments)?;
    if let Some(predicate) = key_predicate(keys.iter().map(|(c, _)| *c), site) {
        statement = statement.where_clause(predicate);
    }
    let values = rest
        .into_iter()
        .chain(keys)
        .map(|(_, v)| v)
        .chain(entity_key(site))
        .collect();
    Ok(Bound { statement, values })
}

/// Builds a keyed DELETE.
pub(crate) fn delete(
    descriptor: &TypeDescriptor,
    fields: &[CustomField],
    site: &Site,
    record: &Record,
) -> Result<Bound<Delete>> {
    let columns = flatten(fields);
    require_key(descriptor, &columns)?;
    let keys = key_values(fields, record)?;
    let mut statement = Delete::new(TableName::new(descriptor.table)?);
    if let Some(predicate) = key_predicate(keys.iter().map(|(c, _)| c), site) {
        statement = statement.where_clause(predicate);
    }
    let values = keys
        .into_iter()
        .map(|(_, v)| v)
        .chain(entity_key(site))
        .collect();
    Ok(Bound { statement, values })
}

/// Builds the rows of one dependent collection of `record`.
///
/// Returns `None` for an empty collection.
pub(crate) fn dependent_rows(
    owner_fields: &[CustomField],
    field: &CustomField,
    dependent: &DependentField,
    site: &Site,
    record: &Record,
) -> Result<Option<DependentRows>> {
    let elements = match record.get(field.index) {
        Some(Datum::Records(elements)) => elements,
        Some(other) => {
            return Err(PersistError::EncodingFailed(format!(
                "member '{}' cannot be encoded from {}",
                field.name,
                other.kind()
            )));
        }
        None => {
            return Err(PersistError::EncodingFailed(format!(
                "no value for member '{}'",
                field.name
            )));
        }
    };
    if elements.is_empty() {
        return Ok(None);
    }

    let columns = dependent_columns(owner_fields, dependent, site)?;
    let insert = Insert::parameterized(dependent.table.clone(), &columns, 1)?;

    let mut batch = RowBatch::new(SqlRow::new(columns));
    if let Some(key) = entity_key(site) {
        batch.set_all(ENTITY_COLUMN, key)?;
    }
    let prefix = Prefix::new(OWNER_PREFIX)?;
    for (column, value) in key_values(owner_fields, record)? {
        batch.set_all(prefix.apply(column.name.as_str())?.as_str(), value)?;
    }
    batch.multiply_rows(elements.len())?;

    let offset = usize::from(site.entity().is_some()) + owner_key(owner_fields)?.len() + 1;
    for (position, element) in elements.iter().enumerate() {
        let index = i32::try_from(position).map_err(|_| {
            PersistError::EncodingFailed(format!("collection '{}' is too long", field.name))
        })?;
        batch.set(position, POSITION_COLUMN, index)?;
        let row = batch.row_mut(position).ok_or_else(|| {
            PersistError::MalformedNode(format!("row {position} of a dependent batch"))
        })?;
        for (column, value) in record_values(&dependent.fields, element)?.into_iter().enumerate() {
            row.set_at(offset + column, value)?;
        }
    }
    Ok(Some(DependentRows { insert, batch }))
}

fn owner_predicate(
    owner_fields: &[CustomField],
    site: &Site,
    record: &Record,
) -> Result<(Option<BooleanExpr>, Vec<SqlValue>)> {
    let prefix = Prefix::new(OWNER_PREFIX)?;
    let keys = key_values(owner_fields, record)?;
    let matches = keys
        .iter()
        .map(|(c, _)| Ok(BooleanExpr::key_match(prefix.apply(c.name.as_str())?, c.sql_type)))
        .collect::<Result<Vec<_>>>()?;
    let predicate = BooleanExpr::all(entity_filter(site).into_iter().chain(matches));
    let values = entity_key(site)
        .into_iter()
        .chain(keys.into_iter().map(|(_, v)| v))
        .collect();
    Ok((predicate, values))
}

/// Builds the DELETE of one owner's dependent rows.
pub(crate) fn delete_dependents(
    owner_fields: &[CustomField],
    dependent: &DependentField,
    site: &Site,
    record: &Record,
) -> Result<Bound<Delete>> {
    let (predicate, values) = owner_predicate(owner_fields, site, record)?;
    let mut statement = Delete::new(dependent.table.clone());
    if let Some(predicate) = predicate {
        statement = statement.where_clause(predicate);
    }
    Ok(Bound { statement, values })
}

/// Builds the SELECT of one owner's dependent rows, in position order.
pub(crate) fn select_dependents(
    owner_fields: &[CustomField],
    dependent: &DependentField,
    site: &Site,
    record: &Record,
) -> Result<Bound<Select>> {
    let (predicate, values) = owner_predicate(owner_fields, site, record)?;
    let mut statement = flatten(&dependent.fields)
        .into_iter()
        .fold(Select::new(dependent.table.clone()), |s, c| s.column(c.name))
        .order_by(
            Node::Column(QualifiedColumnName::bare(ColumnName::builtin(POSITION_COLUMN))),
            OrderDirection::Asc,
        );
    if let Some(predicate) = predicate {
        statement = statement.where_clause(predicate);
    }
    Ok(Bound { statement, values })
}
