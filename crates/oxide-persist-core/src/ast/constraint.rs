//! Table constraints for CREATE TABLE.

use super::expression::BooleanExpr;
use crate::error::{PersistError, Result};
use crate::identifier::{ColumnName, TableName};

/// Foreign key action on delete/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKeyAction {
    /// No action.
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses an action name such as `cascade` or `set_null`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` for an unknown action.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().replace(' ', "_").as_str() {
            "no_action" => Ok(Self::NoAction),
            "restrict" => Ok(Self::Restrict),
            "cascade" => Ok(Self::Cascade),
            "set_null" => Ok(Self::SetNull),
            "set_default" => Ok(Self::SetDefault),
            _ => Err(PersistError::MalformedNode(format!(
                "unknown foreign key action `{name}`"
            ))),
        }
    }
}

fn non_empty(columns: Vec<ColumnName>, what: &str) -> Result<Vec<ColumnName>> {
    if columns.is_empty() {
        return Err(PersistError::MalformedNode(format!(
            "{what} requires at least one column"
        )));
    }
    Ok(columns)
}

/// `PRIMARY KEY (columns)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyConstraint {
    columns: Vec<ColumnName>,
}

impl PrimaryKeyConstraint {
    /// Creates a primary key over `columns`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `columns` is empty.
    pub fn new(columns: Vec<ColumnName>) -> Result<Self> {
        non_empty(columns, "PRIMARY KEY").map(|columns| Self { columns })
    }

    /// Returns the key columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }
}

/// `UNIQUE (columns)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    columns: Vec<ColumnName>,
}

impl UniqueConstraint {
    /// Creates a uniqueness constraint over `columns`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `columns` is empty.
    pub fn new(columns: Vec<ColumnName>) -> Result<Self> {
        non_empty(columns, "UNIQUE").map(|columns| Self { columns })
    }

    /// Returns the constrained columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }
}

/// `FOREIGN KEY (columns) REFERENCES table (columns)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    columns: Vec<ColumnName>,
    reference: TableName,
    reference_columns: Vec<ColumnName>,
    /// ON DELETE action.
    pub on_delete: Option<ForeignKeyAction>,
    /// ON UPDATE action.
    pub on_update: Option<ForeignKeyAction>,
}

impl ForeignKeyConstraint {
    /// Creates a foreign key.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if either column list is empty or their
    /// lengths differ.
    pub fn new(
        columns: Vec<ColumnName>,
        reference: TableName,
        reference_columns: Vec<ColumnName>,
    ) -> Result<Self> {
        let columns = non_empty(columns, "FOREIGN KEY")?;
        let reference_columns = non_empty(reference_columns, "REFERENCES")?;
        if columns.len() != reference_columns.len() {
            return Err(PersistError::MalformedNode(format!(
                "FOREIGN KEY has {} column(s) but references {}",
                columns.len(),
                reference_columns.len()
            )));
        }
        Ok(Self {
            columns,
            reference,
            reference_columns,
            on_delete: None,
            on_update: None,
        })
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Returns the referencing columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Returns the referenced table.
    #[must_use]
    pub const fn reference(&self) -> &TableName {
        &self.reference
    }

    /// Returns the referenced columns.
    #[must_use]
    pub fn reference_columns(&self) -> &[ColumnName] {
        &self.reference_columns
    }
}

/// `CHECK (predicate)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConstraint {
    predicate: BooleanExpr,
}

impl CheckConstraint {
    /// Creates a check constraint.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if the predicate contains a parameter, since
    /// DDL has no values to bind.
    pub fn new(predicate: BooleanExpr) -> Result<Self> {
        if predicate.node().parameter_count() > 0 {
            return Err(PersistError::MalformedNode(String::from(
                "CHECK constraints cannot contain parameters",
            )));
        }
        Ok(Self { predicate })
    }

    /// Returns the predicate.
    #[must_use]
    pub const fn predicate(&self) -> &BooleanExpr {
        &self.predicate
    }
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    /// PRIMARY KEY.
    PrimaryKey(PrimaryKeyConstraint),
    /// UNIQUE.
    Unique(UniqueConstraint),
    /// FOREIGN KEY.
    ForeignKey(ForeignKeyConstraint),
    /// CHECK.
    Check(CheckConstraint),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NumberExpr, SqlType};

    fn col(name: &str) -> ColumnName {
        ColumnName::new(name).unwrap()
    }

    #[test]
    fn test_column_lists_are_non_empty() {
        assert!(matches!(
            PrimaryKeyConstraint::new(vec![]),
            Err(PersistError::MalformedNode(_))
        ));
        assert!(UniqueConstraint::new(vec![]).is_err());
        assert!(
            ForeignKeyConstraint::new(vec![col("a")], TableName::new("t").unwrap(), vec![])
                .is_err()
        );
    }

    #[test]
    fn test_foreign_key_arity_must_match() {
        let fk = ForeignKeyConstraint::new(
            vec![col("a"), col("b")],
            TableName::new("t").unwrap(),
            vec![col("id")],
        );
        assert!(matches!(fk, Err(PersistError::MalformedNode(_))));
    }

    #[test]
    fn test_check_rejects_parameters() {
        let x = NumberExpr::column(col("x"));
        assert!(CheckConstraint::new(x.clone().gt(NumberExpr::integer(0))).is_ok());
        let param = NumberExpr::parameter(SqlType::Integer32).unwrap();
        assert!(matches!(
            CheckConstraint::new(x.gt(param)),
            Err(PersistError::MalformedNode(_))
        ));
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(
            ForeignKeyAction::parse("set_null").unwrap(),
            ForeignKeyAction::SetNull
        );
        assert_eq!(
            ForeignKeyAction::parse("CASCADE").unwrap(),
            ForeignKeyAction::Cascade
        );
        assert!(ForeignKeyAction::parse("explode").is_err());
    }
}
