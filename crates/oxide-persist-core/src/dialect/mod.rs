//! SQL Dialect support.
//!
//! Every AST node implements [`Unparse`], which owns the structural
//! punctuation (parentheses, separators, keywords) and asks the [`Dialect`]
//! only for the backend-specific pieces: identifier spelling, literal
//! spelling, type names and operator forms. Adding a dialect therefore never
//! touches the AST.
//!
//! Placeholders are always `?`, appended in render order, and each one
//! records the type of the value that will be bound to it.

mod generic;
mod sqlite;
mod unparse;

use core::fmt;

pub use generic::GenericDialect;
pub use sqlite::SqliteDialect;

use crate::ast::{
    AggregateOperator, BinaryOperator, Literal, SqlType, UnaryNotation, UnaryOperator,
    VariadicOperator,
};
use crate::catalog::Site;
use crate::error::{PersistError, Result};
use crate::identifier::{QualifiedColumnName, QualifiedTableName, TableName};
use crate::value::quote_text;

/// Accumulates SQL text and the types of its placeholders.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    sql: String,
    parameters: Vec<SqlType>,
}

impl SqlBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a string.
    pub fn push_str(&mut self, s: impl AsRef<str>) {
        self.sql.push_str(s.as_ref());
    }

    /// Push a character.
    pub fn push(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Push a `?` placeholder for a value of type `sql_type`.
    pub fn push_param(&mut self, sql_type: SqlType) {
        self.parameters.push(sql_type);
        self.sql.push('?');
    }

    /// Push elements of an iterator separated by `sep`, stopping at the
    /// first element that fails to render.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `push_elem`.
    pub fn push_iter<T>(
        &mut self,
        iter: impl IntoIterator<Item = T>,
        sep: &str,
        mut push_elem: impl FnMut(&mut Self, T) -> Result<()>,
    ) -> Result<()> {
        for (i, item) in iter.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            push_elem(self, item)?;
        }
        Ok(())
    }

    /// Returns the SQL rendered so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.sql
    }

    /// Finishes the builder.
    #[must_use]
    pub fn finish(self) -> RenderedSql {
        RenderedSql {
            sql: self.sql,
            parameters: self.parameters,
        }
    }
}

/// Rendered SQL text with the types of its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSql {
    /// The SQL text.
    pub sql: String,
    /// One entry per `?`, in render order.
    pub parameters: Vec<SqlType>,
}

impl RenderedSql {
    /// Returns the number of placeholders.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

impl fmt::Display for RenderedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Renders an AST node for a dialect and site.
pub trait Unparse {
    /// Appends this node to `out`.
    ///
    /// A failed render may leave partial text in `out`; callers must
    /// discard the whole buffer on error.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedNode` when the dialect cannot express the node
    /// and `NameTooLong` when a site-qualified name is too long.
    fn unparse(&self, dialect: &dyn Dialect, site: &Site, out: &mut SqlBuilder) -> Result<()>;

    /// Renders this node into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Same as [`Unparse::unparse`]; no partial text is returned.
    fn to_sql(&self, dialect: &dyn Dialect, site: &Site) -> Result<RenderedSql> {
        let mut out = SqlBuilder::new();
        self.unparse(dialect, site, &mut out)?;
        Ok(out.finish())
    }
}

/// How a binary operator is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryForm {
    /// `(left) SYM (right)`
    Infix(&'static str),
    /// `NAME(left, right)`
    Function(&'static str),
    /// `CAST((left) SYM (right) AS TARGET)`
    Cast {
        /// Infix symbol.
        symbol: &'static str,
        /// Target type name.
        target: &'static str,
    },
}

/// How a unary operator is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnaryForm {
    /// Placement around the operand.
    pub notation: UnaryNotation,
    /// Keyword or function name.
    pub symbol: &'static str,
}

/// How a variadic operator is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariadicForm {
    /// `NAME(a, b, ...)`
    Function(&'static str),
    /// `(a) SYM (b) SYM ...`
    Infix(&'static str),
    /// `(a)`, the lone operand itself.
    Operand,
}

/// Trait for SQL dialect-specific behavior.
///
/// Every hook has a default matching the generic dialect except
/// [`Dialect::type_name`]. Returning `None` from an operator hook makes the
/// node unsupported in this dialect.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the backend spelling of a scalar type, or `None` if it has
    /// no column representation.
    fn type_name(&self, sql_type: SqlType) -> Option<&'static str>;

    /// Returns how an identifier is spelled.
    fn identifier(&self, name: &str) -> String {
        name.to_string()
    }

    /// Returns the boolean literal spelling.
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// Returns how a binary operator is spelled.
    fn binary_form(&self, op: BinaryOperator) -> Option<BinaryForm> {
        Some(BinaryForm::Infix(op.symbol()))
    }

    /// Returns how a unary operator is spelled.
    fn unary_form(&self, op: UnaryOperator) -> Option<UnaryForm> {
        Some(UnaryForm {
            notation: op.notation(),
            symbol: op.symbol(),
        })
    }

    /// Returns how a variadic operator over `arity` operands is spelled.
    fn variadic_form(&self, op: VariadicOperator, _arity: usize) -> Option<VariadicForm> {
        Some(VariadicForm::Function(op.symbol()))
    }

    /// Returns the aggregate function name.
    fn aggregate_name(&self, op: AggregateOperator) -> Option<&'static str> {
        Some(op.symbol())
    }

    /// Returns the most placeholders one statement may carry, if the
    /// backend has a limit.
    fn max_parameters(&self) -> Option<usize> {
        None
    }

    /// Returns whether `DROP TABLE ... CASCADE` is supported.
    fn supports_drop_cascade(&self) -> bool {
        true
    }

    /// Pushes an identifier.
    fn push_identifier(&self, name: &str, out: &mut SqlBuilder) {
        out.push_str(self.identifier(name));
    }

    /// Pushes a table name qualified by `site`.
    ///
    /// # Errors
    ///
    /// Returns `NameTooLong` if the qualified name exceeds the limit.
    fn push_table(&self, site: &Site, table: &TableName, out: &mut SqlBuilder) -> Result<()> {
        let qualified = QualifiedTableName::new(site, table.clone())?;
        if let Some(namespace) = qualified.namespace() {
            self.push_identifier(namespace.as_str(), out);
            out.push('.');
        }
        self.push_identifier(qualified.table().as_str(), out);
        Ok(())
    }

    /// Pushes a column reference.
    fn push_column(&self, column: &QualifiedColumnName, out: &mut SqlBuilder) {
        if let Some(table) = column.table() {
            self.push_identifier(table.as_str(), out);
            out.push('.');
        }
        self.push_identifier(column.column().as_str(), out);
    }

    /// Pushes a literal.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedNode` for non-finite floats.
    fn push_literal(&self, literal: &Literal, out: &mut SqlBuilder) -> Result<()> {
        match literal {
            Literal::Boolean(b) => out.push_str(self.boolean_literal(*b)),
            Literal::Integer(n) => out.push_str(n.to_string()),
            Literal::Float(f) if f.is_finite() => out.push_str(format!("{f:?}")),
            Literal::Float(f) => return Err(unsupported(self, format!("float literal {f}"))),
            Literal::String(s) => out.push_str(quote_text(s)),
            Literal::Null => out.push_str("NULL"),
        }
        Ok(())
    }

    /// Returns the type name or fails with `UnsupportedNode`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedNode` when [`Dialect::type_name`] has no spelling.
    fn require_type_name(&self, sql_type: SqlType) -> Result<&'static str> {
        self.type_name(sql_type)
            .ok_or_else(|| unsupported(self, format!("column type {sql_type}")))
    }
}

/// Builds an `UnsupportedNode` error for `dialect`.
pub(crate) fn unsupported<D: Dialect + ?Sized>(dialect: &D, node: String) -> PersistError {
    PersistError::UnsupportedNode {
        dialect: dialect.name(),
        node,
    }
}
