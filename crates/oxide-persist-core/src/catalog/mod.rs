//! Table definitions, sites and the schema registry.

mod registry;

pub use registry::SchemaRegistry;

use crate::ast::{
    ColumnDef, CreateTable, ForeignKeyAction, ForeignKeyConstraint, SqlType, TableConstraint,
};
use crate::error::Result;
use crate::identifier::{ColumnName, Name, QualifiedTableName, TableName};

/// Name of the column that scopes rows to a site's entity.
pub const ENTITY_COLUMN: &str = "entity";

/// The row every table of a site belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityReference {
    /// Table holding the entities.
    pub table: TableName,
    /// Key column of that table.
    pub column: ColumnName,
    /// Key of this site's entity.
    pub key: i64,
}

/// A namespace under which table names are resolved.
///
/// The default site has no namespace and no entity scope. A site with an
/// entity reference gives every table created under it a leading
/// [`ENTITY_COLUMN`] referencing that entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Site {
    namespace: Option<Name>,
    entity: Option<EntityReference>,
}

impl Site {
    /// Creates a site with a namespace.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` or `NameTooLong` for an unusable namespace.
    pub fn named(namespace: impl Into<String>) -> Result<Self> {
        Ok(Self {
            namespace: Some(Name::new(namespace)?),
            entity: None,
        })
    }

    /// Scopes rows under this site to an entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityReference) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Returns the namespace, if any.
    #[must_use]
    pub const fn namespace(&self) -> Option<&Name> {
        self.namespace.as_ref()
    }

    /// Returns the entity scope, if any.
    #[must_use]
    pub const fn entity(&self) -> Option<&EntityReference> {
        self.entity.as_ref()
    }

    /// Returns the entity column definition, if this site is scoped.
    #[must_use]
    pub fn entity_column(&self) -> Option<ColumnDef> {
        self.entity.as_ref().map(|_| {
            ColumnDef::new(ColumnName::builtin(ENTITY_COLUMN), SqlType::Integer64).not_null()
        })
    }

    /// Returns the foreign key tying a table's rows to this site's entity.
    ///
    /// # Errors
    ///
    /// Never fails for a well-formed entity reference; the result mirrors
    /// [`ForeignKeyConstraint::new`].
    pub fn entity_reference(&self) -> Result<Option<TableConstraint>> {
        self.entity
            .as_ref()
            .map(|entity| {
                ForeignKeyConstraint::new(
                    vec![ColumnName::builtin(ENTITY_COLUMN)],
                    entity.table.clone(),
                    vec![entity.column.clone()],
                )
                .map(|fk| TableConstraint::ForeignKey(fk.on_delete(ForeignKeyAction::Cascade)))
            })
            .transpose()
    }
}

/// A table definition registered under a site.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: QualifiedTableName,
    definition: CreateTable,
}

impl Table {
    /// Creates a table from its CREATE TABLE statement.
    ///
    /// # Errors
    ///
    /// Returns `NameTooLong` if the site-qualified name is too long.
    pub fn new(site: &Site, definition: CreateTable) -> Result<Self> {
        Ok(Self {
            name: QualifiedTableName::new(site, definition.table().clone())?,
            definition,
        })
    }

    /// Returns the qualified name.
    #[must_use]
    pub const fn name(&self) -> &QualifiedTableName {
        &self.name
    }

    /// Returns the column definitions.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        self.definition.columns()
    }

    /// Returns the constraints.
    #[must_use]
    pub fn constraints(&self) -> &[TableConstraint] {
        self.definition.constraints()
    }

    /// Returns the column names and types, in column order.
    #[must_use]
    pub fn column_types(&self) -> Vec<(ColumnName, SqlType)> {
        self.columns()
            .iter()
            .map(|c| (c.name.clone(), c.sql_type))
            .collect()
    }

    /// Returns the CREATE TABLE statement.
    #[must_use]
    pub const fn create_statement(&self) -> &CreateTable {
        &self.definition
    }
}
