//! The object-relational conversion engine.
//!
//! A [`Converter`] turns a [`Storable`] type into an ordered list of
//! [`CustomField`]s and uses that list for everything else: the CREATE TABLE
//! statements of the type and of the types it references, the parameter
//! values of an instance, and the instance rebuilt from a result row. The
//! field list of each type is derived once and cached in the
//! [`SchemaRegistry`].
//!
//! ```rust
//! use oxide_persist_core::catalog::{SchemaRegistry, Site};
//! use oxide_persist_core::codec::{Decoder, RowSet, ValueBuffer};
//! use oxide_persist_core::convert::Converter;
//! use oxide_persist_derive::Storable;
//!
//! #[derive(Debug, PartialEq, Storable)]
//! #[table(name = "pairs")]
//! struct Pair {
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! let registry = SchemaRegistry::new();
//! let converter = Converter::new(&registry);
//!
//! let pair = Pair { name: "abc".into(), age: None };
//! let mut buffer = ValueBuffer::new();
//! converter.collect_values(Some(&pair), &mut buffer).unwrap();
//! assert_eq!(buffer.len(), 2);
//!
//! let mut rows = RowSet::from(buffer);
//! rows.move_to_first_row().unwrap();
//! assert_eq!(converter.recover::<Pair>(&mut rows).unwrap(), pair);
//! ```

mod collect;
mod fields;
mod recover;
mod tables;

use core::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

pub use fields::{
    flatten, slot_count, CustomField, DependentField, FieldConstraint, FieldKind, FlatColumn,
    ReferenceField, TypeRef,
};
pub use tables::{Bound, DependentRows, POSITION_COLUMN};

use crate::ast::{BooleanExpr, CreateTable, Delete, Insert, Select, Update};
use crate::catalog::{SchemaRegistry, Site, Table};
use crate::codec::{Decoder, Encoder};
use crate::error::{PersistError, Result};
use crate::schema::{Record, Storable, TypeDescriptor};
use crate::value::SqlValue;

/// Converts storable types to tables, parameters and back.
#[derive(Debug, Clone, Copy)]
pub struct Converter<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> Converter<'r> {
    /// Creates a converter backed by `registry`.
    #[must_use]
    pub const fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Returns the fields of `T`, deriving them on first use.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType`, `AmbiguousDecomposition`,
    /// `MissingReferencedField`, `CyclicSchema` or a name error for a type
    /// that cannot be stored. Nothing is cached on failure.
    pub fn derive_fields<T: Storable>(&self) -> Result<Arc<[CustomField]>> {
        self.fields_of(&T::descriptor())
    }

    /// Returns the fields of the described type, deriving them on first use.
    ///
    /// # Errors
    ///
    /// See [`Converter::derive_fields`].
    pub fn fields_of(&self, descriptor: &TypeDescriptor) -> Result<Arc<[CustomField]>> {
        if let Some(fields) = self.registry.cached_fields(descriptor.type_id) {
            return Ok(fields);
        }
        debug!(type_name = descriptor.type_name, "Field cache miss");
        let fields = fields::Derivation::new().derive(descriptor)?;
        Ok(self.registry.cache_fields(descriptor.type_id, fields.into()))
    }

    /// Encodes one value per column of `T`, in field order.
    ///
    /// `None` encodes a typed NULL for every column, so both cases fill the
    /// same number of slots.
    ///
    /// # Errors
    ///
    /// Returns a derivation error, or `EncodingFailed` if a value does not
    /// fit its column.
    pub fn collect_values<T: Storable>(
        &self,
        instance: Option<&T>,
        encoder: &mut dyn Encoder,
    ) -> Result<()> {
        let fields = self.derive_fields::<T>()?;
        let record = instance.map(T::to_record);
        collect::collect_record(&fields, record.as_ref(), encoder)
    }

    /// Like [`Converter::collect_values`] but rejects an absent instance.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedNull` for `None`, otherwise see
    /// [`Converter::collect_values`].
    pub fn collect_non_null<T: Storable>(
        &self,
        instance: Option<&T>,
        encoder: &mut dyn Encoder,
    ) -> Result<()> {
        if instance.is_none() {
            return Err(PersistError::UnexpectedNull(
                T::descriptor().type_name.to_string(),
            ));
        }
        self.collect_values(instance, encoder)
    }

    /// Reads the columns of `T` from the current row.
    ///
    /// # Errors
    ///
    /// Returns `MissingValue` for a short row, `TypeMismatch` for a value of
    /// the wrong type and `UnexpectedNull` for NULL in a non-nullable field.
    pub fn recover<T: Storable>(&self, decoder: &mut dyn Decoder) -> Result<T> {
        let record = self.recover_record(&T::descriptor(), decoder)?;
        T::from_record(record)
    }

    /// Reads the columns of `T` from the current row, or `None` when every
    /// column is NULL.
    ///
    /// # Errors
    ///
    /// See [`Converter::recover`].
    pub fn recover_nullable<T: Storable>(&self, decoder: &mut dyn Decoder) -> Result<Option<T>> {
        let fields = self.derive_fields::<T>()?;
        recover::recover_optional(&fields, decoder)?
            .map(T::from_record)
            .transpose()
    }

    /// Reads the record of the described type from the current row.
    /// Dependent collections come back empty.
    ///
    /// # Errors
    ///
    /// See [`Converter::recover`].
    pub fn recover_record(
        &self,
        descriptor: &TypeDescriptor,
        decoder: &mut dyn Decoder,
    ) -> Result<Record> {
        let fields = self.fields_of(descriptor)?;
        recover::recover_record(&fields, decoder)
    }

    /// Reads a record for an already derived field list, such as the
    /// element fields of a [`DependentField`].
    ///
    /// # Errors
    ///
    /// See [`Converter::recover`].
    pub fn recover_fields(fields: &[CustomField], decoder: &mut dyn Decoder) -> Result<Record> {
        recover::recover_record(fields, decoder)
    }

    /// Builds and registers the CREATE TABLE statement of `T`.
    ///
    /// # Errors
    ///
    /// Returns a derivation error, or `DuplicateTable` if a different
    /// definition is registered under the same name.
    pub fn create_table<T: Storable>(&self, site: &Site) -> Result<CreateTable> {
        let descriptor = T::descriptor();
        let fields = self.fields_of(&descriptor)?;
        let create = tables::create_table(&descriptor, &fields, site)?;
        self.register(site, core::slice::from_ref(&create))?;
        Ok(create)
    }

    /// Builds and registers every table `T` needs, referenced tables first.
    ///
    /// Each table appears once, even when several members reference it.
    /// Every statement carries IF NOT EXISTS, so running the list again is
    /// harmless. Nothing is registered unless the whole list builds.
    ///
    /// # Errors
    ///
    /// Returns `CyclicSchema` if two distinct types reference each other
    /// through their rows, a derivation error, or `DuplicateTable`.
    pub fn create_required_tables<T: Storable>(&self, site: &Site) -> Result<Vec<CreateTable>> {
        let mut requirement = Requirement::default();
        self.require(&T::descriptor(), site, &mut requirement)?;
        self.register(site, &requirement.tables)?;
        Ok(requirement.tables)
    }

    /// Builds and registers the dependent tables of `T`.
    ///
    /// # Errors
    ///
    /// Returns a derivation error or `DuplicateTable`.
    pub fn create_dependent_tables<T: Storable>(&self, site: &Site) -> Result<Vec<CreateTable>> {
        let creates = self.dependent_tables(&T::descriptor(), site)?;
        self.register(site, &creates)?;
        Ok(creates)
    }

    fn dependent_tables(&self, descriptor: &TypeDescriptor, site: &Site) -> Result<Vec<CreateTable>> {
        let fields = self.fields_of(descriptor)?;
        tables::dependents(&fields)
            .map(|(_, dependent)| tables::create_dependent_table(descriptor, &fields, dependent, site))
            .collect()
    }

    fn require(
        &self,
        descriptor: &TypeDescriptor,
        site: &Site,
        requirement: &mut Requirement,
    ) -> Result<()> {
        let type_id = descriptor.type_id;
        if requirement.done.contains(&type_id) {
            return Ok(());
        }
        if let Some(start) = requirement.visiting.iter().position(|(id, _)| *id == type_id) {
            let mut path: Vec<&str> = requirement.visiting[start..]
                .iter()
                .map(|(_, name)| *name)
                .collect();
            path.push(descriptor.type_name);
            return Err(PersistError::CyclicSchema {
                type_name: descriptor.type_name.to_string(),
                path: path.join(" -> "),
            });
        }

        let fields = self.fields_of(descriptor)?;
        requirement.visiting.push((type_id, descriptor.type_name));
        for target in tables::row_references(&fields) {
            let target = target.descriptor();
            if target.type_id != type_id {
                self.require(&target, site, requirement)?;
            }
        }
        requirement.visiting.pop();
        requirement.done.insert(type_id);
        requirement
            .tables
            .push(tables::create_table(descriptor, &fields, site)?);

        // Dependent rows may reference this type, so they come after its table.
        for (_, dependent) in tables::dependents(&fields) {
            for target in tables::row_references(&dependent.fields) {
                let target = target.descriptor();
                if target.type_id != type_id {
                    self.require(&target, site, requirement)?;
                }
            }
        }
        requirement.tables.extend(self.dependent_tables(descriptor, site)?);
        Ok(())
    }

    fn register(&self, site: &Site, creates: &[CreateTable]) -> Result<()> {
        let group = creates
            .iter()
            .map(|create| Table::new(site, create.clone()))
            .collect::<Result<Vec<_>>>()?;
        self.registry.add_all(group)
    }

    /// Builds an INSERT of `rows` instances of `T`.
    ///
    /// # Errors
    ///
    /// Returns a derivation error, or `MalformedNode` if `rows` is zero.
    pub fn insert_statement<T: Storable>(&self, site: &Site, rows: usize) -> Result<Insert> {
        let descriptor = T::descriptor();
        let fields = self.fields_of(&descriptor)?;
        tables::insert_statement(&descriptor, &fields, site, rows)
    }

    /// Encodes one row of [`Converter::insert_statement`]: the site's
    /// entity key, if any, then the values of `instance`.
    ///
    /// # Errors
    ///
    /// See [`Converter::collect_values`].
    pub fn encode_insert_row<T: Storable>(
        &self,
        site: &Site,
        instance: &T,
        encoder: &mut dyn Encoder,
    ) -> Result<()> {
        let fields = self.derive_fields::<T>()?;
        tables::encode_insert_row(&fields, site, Some(&instance.to_record()), encoder)
    }

    /// Builds a SELECT of every column of `T`, scoped to the site's entity
    /// and narrowed by `filter`.
    ///
    /// The entity key, when the site has one, is the first parameter.
    ///
    /// # Errors
    ///
    /// Returns a derivation error.
    pub fn select_statement<T: Storable>(
        &self,
        site: &Site,
        filter: Option<BooleanExpr>,
    ) -> Result<Select> {
        let descriptor = T::descriptor();
        let fields = self.fields_of(&descriptor)?;
        tables::select_statement(&descriptor, &fields, site, filter)
    }

    /// Like [`Converter::select_statement`], paired with its values: the
    /// entity key, then `values` for the placeholders of `filter`.
    ///
    /// # Errors
    ///
    /// Returns a derivation error.
    pub fn select<T: Storable>(
        &self,
        site: &Site,
        filter: Option<BooleanExpr>,
        values: Vec<SqlValue>,
    ) -> Result<Bound<Select>> {
        let descriptor = T::descriptor();
        let fields = self.fields_of(&descriptor)?;
        tables::select(&descriptor, &fields, site, filter, values)
    }

    /// Builds the keyed UPDATE of `instance`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if `T` has no primary key, or
    /// `MalformedNode` if it has no other column.
    pub fn update<T: Storable>(&self, site: &Site, instance: &T) -> Result<Bound<Update>> {
        let descriptor = T::descriptor();
        let fields = self.fields_of(&descriptor)?;
        tables::update(&descriptor, &fields, site, &instance.to_record())
    }

    /// Builds the keyed DELETE of `instance`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if `T` has no primary key.
    pub fn delete<T: Storable>(&self, site: &Site, instance: &T) -> Result<Bound<Delete>> {
        let descriptor = T::descriptor();
        let fields = self.fields_of(&descriptor)?;
        tables::delete(&descriptor, &fields, site, &instance.to_record())
    }

    /// Builds the dependent rows of `instance`, one entry per non-empty
    /// collection.
    ///
    /// # Errors
    ///
    /// Returns a derivation error or `EncodingFailed`.
    pub fn insert_into_dependent_table<T: Storable>(
        &self,
        site: &Site,
        instance: &T,
    ) -> Result<Vec<DependentRows>> {
        let fields = self.derive_fields::<T>()?;
        let record = instance.to_record();
        let mut rows = Vec::new();
        for (field, dependent) in tables::dependents(&fields) {
            rows.extend(tables::dependent_rows(&fields, field, dependent, site, &record)?);
        }
        Ok(rows)
    }

    /// Builds one DELETE per dependent collection of `instance`.
    ///
    /// # Errors
    ///
    /// Returns a derivation error.
    pub fn delete_dependents<T: Storable>(
        &self,
        site: &Site,
        instance: &T,
    ) -> Result<Vec<Bound<Delete>>> {
        let fields = self.derive_fields::<T>()?;
        let record = instance.to_record();
        tables::dependents(&fields)
            .map(|(_, dependent)| tables::delete_dependents(&fields, dependent, site, &record))
            .collect()
    }

    /// Builds one SELECT per dependent collection of a recovered record,
    /// paired with the member index the rows belong to.
    ///
    /// # Errors
    ///
    /// Returns a derivation error.
    pub fn select_dependents(
        &self,
        descriptor: &TypeDescriptor,
        site: &Site,
        record: &Record,
    ) -> Result<Vec<(usize, Arc<[CustomField]>, Bound<Select>)>> {
        let fields = self.fields_of(descriptor)?;
        tables::dependents(&fields)
            .map(|(field, dependent)| {
                let select = tables::select_dependents(&fields, dependent, site, record)?;
                Ok((field.index, Arc::clone(&dependent.fields), select))
            })
            .collect()
    }
}

#[derive(Default)]
struct Requirement {
    visiting: Vec<(TypeId, &'static str)>,
    done: HashSet<TypeId>,
    tables: Vec<CreateTable>,
}
