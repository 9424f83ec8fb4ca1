//! SQL statement AST types.
//!
//! Tables are named without their site; the site is supplied when the
//! statement is rendered, so one statement can be rendered for many sites.

use super::constraint::TableConstraint;
use super::expression::{BooleanExpr, Node};
use super::types::{ColumnDef, SqlType};
use crate::error::{PersistError, Result};
use crate::identifier::{Alias, ColumnName, QualifiedColumnName, TableName};

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An ORDER BY clause entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The expression to order by.
    pub expr: Node,
    /// The direction (ASC or DESC).
    pub direction: OrderDirection,
}

/// A projected expression in a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// The projected expression.
    pub expr: Node,
    /// Optional alias (AS name).
    pub alias: Option<Alias>,
}

/// `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    table: TableName,
    columns: Vec<ColumnDef>,
    constraints: Vec<TableConstraint>,
    if_not_exists: bool,
}

impl CreateTable {
    /// Creates a CREATE TABLE statement.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `columns` is empty.
    pub fn new(table: TableName, columns: Vec<ColumnDef>) -> Result<Self> {
        if columns.is_empty() {
            return Err(PersistError::MalformedNode(format!(
                "CREATE TABLE {table} has no columns"
            )));
        }
        Ok(Self {
            table,
            columns,
            constraints: Vec::new(),
            if_not_exists: false,
        })
    }

    /// Adds a table constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Adds IF NOT EXISTS.
    #[must_use]
    pub const fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Returns the table name.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }

    /// Returns the column definitions.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the constraints.
    #[must_use]
    pub fn constraints(&self) -> &[TableConstraint] {
        &self.constraints
    }

    /// Returns whether IF NOT EXISTS is set.
    #[must_use]
    pub const fn is_if_not_exists(&self) -> bool {
        self.if_not_exists
    }
}

/// `DROP TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    /// The table to drop.
    pub table: TableName,
    /// Whether IF EXISTS is set.
    pub if_exists: bool,
    /// Whether CASCADE is set.
    pub cascade: bool,
}

impl DropTable {
    /// Creates a DROP TABLE statement.
    #[must_use]
    pub const fn new(table: TableName) -> Self {
        Self {
            table,
            if_exists: false,
            cascade: false,
        }
    }

    /// Adds IF EXISTS.
    #[must_use]
    pub const fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Adds CASCADE.
    #[must_use]
    pub const fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

/// Source of rows for an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// One or more VALUES rows.
    Values(Vec<Vec<Node>>),
    /// A subquery.
    Select(Box<Select>),
}

/// `INSERT INTO`.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: TableName,
    columns: Vec<ColumnName>,
    source: InsertSource,
}

impl Insert {
    /// Creates an INSERT of a single row of expressions.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `columns` is empty or the row width
    /// differs from the column count.
    pub fn values(table: TableName, columns: Vec<ColumnName>, row: Vec<Node>) -> Result<Self> {
        if columns.is_empty() {
            return Err(PersistError::MalformedNode(format!(
                "INSERT INTO {table} names no columns"
            )));
        }
        let insert = Self {
            table,
            columns,
            source: InsertSource::Values(Vec::new()),
        };
        insert.and_values(row)
    }

    /// Creates an INSERT whose every value is a parameter, repeated for
    /// `rows` rows.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `columns` is empty or `rows` is zero.
    pub fn parameterized(
        table: TableName,
        columns: &[(ColumnName, SqlType)],
        rows: usize,
    ) -> Result<Self> {
        if rows == 0 {
            return Err(PersistError::MalformedNode(format!(
                "INSERT INTO {table} has no rows"
            )));
        }
        let names = columns.iter().map(|(name, _)| name.clone()).collect();
        let row: Vec<Node> = columns.iter().map(|(_, ty)| Node::parameter(*ty)).collect();
        let mut insert = Self::values(table, names, row.clone())?;
        for _ in 1..rows {
            insert = insert.and_values(row.clone())?;
        }
        Ok(insert)
    }

    /// Appends another VALUES row.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if the row width differs from the column
    /// count or the insert reads from a subquery.
    pub fn and_values(mut self, row: Vec<Node>) -> Result<Self> {
        if row.len() != self.columns.len() {
            return Err(PersistError::MalformedNode(format!(
                "INSERT INTO {} has {} column(s) but a row of {}",
                self.table,
                self.columns.len(),
                row.len()
            )));
        }
        match &mut self.source {
            InsertSource::Values(rows) => rows.push(row),
            InsertSource::Select(_) => {
                return Err(PersistError::MalformedNode(String::from(
                    "cannot add VALUES to INSERT ... SELECT",
                )));
            }
        }
        Ok(self)
    }

    /// Creates an INSERT ... SELECT.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `columns` is empty or the projection
    /// width differs from the column count.
    pub fn from_select(table: TableName, columns: Vec<ColumnName>, select: Select) -> Result<Self> {
        if columns.is_empty() {
            return Err(PersistError::MalformedNode(format!(
                "INSERT INTO {table} names no columns"
            )));
        }
        if !select.projection.is_empty() && select.projection.len() != columns.len() {
            return Err(PersistError::MalformedNode(format!(
                "INSERT INTO {table} has {} column(s) but selects {}",
                columns.len(),
                select.projection.len()
            )));
        }
        Ok(Self {
            table,
            columns,
            source: InsertSource::Select(Box::new(select)),
        })
    }

    /// Returns the table name.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }

    /// Returns the target columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Returns the row source.
    #[must_use]
    pub const fn source(&self) -> &InsertSource {
        &self.source
    }

    /// Counts the placeholders, row by row.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        match &self.source {
            InsertSource::Values(rows) => rows.iter().flatten().map(Node::parameter_count).sum(),
            InsertSource::Select(select) => select.parameter_count(),
        }
    }
}

/// A `column = value` assignment in an UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// The column to assign.
    pub column: ColumnName,
    /// The value to assign.
    pub value: Node,
}

/// `UPDATE`.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: TableName,
    assignments: Vec<Assignment>,
    where_clause: Option<BooleanExpr>,
}

impl Update {
    /// Creates an UPDATE.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `assignments` is empty.
    pub fn new(table: TableName, assignments: Vec<Assignment>) -> Result<Self> {
        if assignments.is_empty() {
            return Err(PersistError::MalformedNode(format!(
                "UPDATE {table} assigns nothing"
            )));
        }
        Ok(Self {
            table,
            assignments,
            where_clause: None,
        })
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, predicate: BooleanExpr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    /// Returns the table name.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }

    /// Returns the assignments.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Returns the WHERE clause.
    #[must_use]
    pub const fn predicate(&self) -> Option<&BooleanExpr> {
        self.where_clause.as_ref()
    }

    /// Counts the placeholders: assignments, then the WHERE clause.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.assignments
            .iter()
            .map(|a| a.value.parameter_count())
            .sum::<usize>()
            + self
                .where_clause
                .as_ref()
                .map_or(0, |p| p.node().parameter_count())
    }
}

/// `DELETE FROM`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    /// The table to delete from.
    pub table: TableName,
    /// Optional WHERE clause.
    pub where_clause: Option<BooleanExpr>,
}

impl Delete {
    /// Creates a DELETE of every row.
    #[must_use]
    pub const fn new(table: TableName) -> Self {
        Self {
            table,
            where_clause: None,
        }
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, predicate: BooleanExpr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    /// Counts the placeholders.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.where_clause
            .as_ref()
            .map_or(0, |p| p.node().parameter_count())
    }
}

/// `SELECT`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Projected expressions; empty selects `*`.
    pub projection: Vec<Projection>,
    /// The table to select from.
    pub table: TableName,
    /// Optional WHERE clause.
    pub where_clause: Option<BooleanExpr>,
    /// ORDER BY entries.
    pub order_by: Vec<OrderBy>,
}

impl Select {
    /// Creates `SELECT * FROM table`.
    #[must_use]
    pub const fn new(table: TableName) -> Self {
        Self {
            projection: Vec::new(),
            table,
            where_clause: None,
            order_by: Vec::new(),
        }
    }

    /// Projects a bare column.
    #[must_use]
    pub fn column(self, column: ColumnName) -> Self {
        self.project(Node::Column(QualifiedColumnName::bare(column)), None)
    }

    /// Projects an expression with an optional alias.
    #[must_use]
    pub fn project(mut self, expr: impl Into<Node>, alias: Option<Alias>) -> Self {
        self.projection.push(Projection {
            expr: expr.into(),
            alias,
        });
        self
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, predicate: BooleanExpr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    /// Appends an ORDER BY entry.
    #[must_use]
    pub fn order_by(mut self, expr: impl Into<Node>, direction: OrderDirection) -> Self {
        self.order_by.push(OrderBy {
            expr: expr.into(),
            direction,
        });
        self
    }

    /// Counts the placeholders: projection, WHERE, then ORDER BY.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.projection
            .iter()
            .map(|p| p.expr.parameter_count())
            .sum::<usize>()
            + self
                .where_clause
                .as_ref()
                .map_or(0, |p| p.node().parameter_count())
            + self
                .order_by
                .iter()
                .map(|o| o.expr.parameter_count())
                .sum::<usize>()
    }
}

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE.
    CreateTable(CreateTable),
    /// DROP TABLE.
    DropTable(DropTable),
    /// INSERT.
    Insert(Insert),
    /// UPDATE.
    Update(Update),
    /// DELETE.
    Delete(Delete),
    /// SELECT.
    Select(Select),
}

impl Statement {
    /// Counts the placeholders this statement renders.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        match self {
            Self::CreateTable(_) | Self::DropTable(_) => 0,
            Self::Insert(s) => s.parameter_count(),
            Self::Update(s) => s.parameter_count(),
            Self::Delete(s) => s.parameter_count(),
            Self::Select(s) => s.parameter_count(),
        }
    }
}

macro_rules! statement_from {
    ($($variant:ident),+) => {
        $(
            impl From<$variant> for Statement {
                fn from(statement: $variant) -> Self {
                    Self::$variant(statement)
                }
            }
        )+
    };
}

statement_from!(CreateTable, DropTable, Insert, Update, Delete, Select);
