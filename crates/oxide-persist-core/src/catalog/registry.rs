//! The schema registry.
//!
//! A [`SchemaRegistry`] is created by the host application and passed by
//! reference to whatever needs it. It holds the registered tables and the
//! memoized field lists of every storable type converted so far. Both maps
//! are read-mostly and guarded by `RwLock`s; a poisoned lock is recovered
//! since neither map is left half-updated by a panicking writer.

use core::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use super::Table;
use crate::convert::CustomField;
use crate::error::{PersistError, Result};
use crate::identifier::QualifiedTableName;

/// Registered tables and cached field lists.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: RwLock<HashMap<QualifiedTableName, Arc<Table>>>,
    fields: RwLock<HashMap<TypeId, Arc<[CustomField]>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table.
    ///
    /// Registering a definition identical to the existing one is a no-op
    /// that returns the existing entry.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTable` if a different definition is already
    /// registered under the same qualified name.
    pub fn add(&self, table: Table) -> Result<Option<Arc<Table>>> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = tables.get(table.name()) {
            if **existing == table {
                debug!(table = %table.name(), "Table already registered");
                return Ok(Some(Arc::clone(existing)));
            }
            return Err(PersistError::DuplicateTable(table.name().to_string()));
        }
        info!(table = %table.name(), columns = table.columns().len(), "Registered table");
        tables.insert(table.name().clone(), Arc::new(table));
        Ok(None)
    }

    /// Registers a group of tables under one write lock.
    ///
    /// Every table is checked against the registry and against the rest of
    /// the group before any is inserted, so a failure leaves the registry
    /// unchanged. Tables identical to a registered or earlier entry are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTable` if any table conflicts with a registered
    /// definition or with another table of the group.
    pub fn add_all(&self, group: Vec<Table>) -> Result<()> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let mut pending: Vec<Table> = Vec::with_capacity(group.len());
        for table in group {
            let registered = tables.get(table.name()).map(|existing| &**existing);
            let queued = pending.iter().find(|p| p.name() == table.name());
            match registered.or(queued) {
                Some(existing) if *existing == table => {
                    debug!(table = %table.name(), "Table already registered");
                }
                Some(_) => return Err(PersistError::DuplicateTable(table.name().to_string())),
                None => pending.push(table),
            }
        }
        for table in pending {
            info!(table = %table.name(), columns = table.columns().len(), "Registered table");
            tables.insert(table.name().clone(), Arc::new(table));
        }
        Ok(())
    }

    /// Registers a table, overwriting any previous definition.
    pub fn replace(&self, table: Table) -> Option<Arc<Table>> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        info!(table = %table.name(), "Replacing table definition");
        tables.insert(table.name().clone(), Arc::new(table))
    }

    /// Looks a table up.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTable` if nothing is registered under `name`.
    pub fn get(&self, name: &QualifiedTableName) -> Result<Arc<Table>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| PersistError::UnknownTable(name.to_string()))
    }

    /// Returns whether a table is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &QualifiedTableName) -> bool {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Returns the number of registered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether no table is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn cached_fields(&self, type_id: TypeId) -> Option<Arc<[CustomField]>> {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned()
    }

    /// Publishes a derived field list; the first publication wins.
    pub(crate) fn cache_fields(
        &self,
        type_id: TypeId,
        fields: Arc<[CustomField]>,
    ) -> Arc<[CustomField]> {
        let mut cache = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(type_id).or_insert(fields))
    }
}
