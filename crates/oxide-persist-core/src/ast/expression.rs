//! Expression AST types.
//!
//! [`Node`] is the untyped, structurally shared expression tree that
//! statements hold. [`Expr`] wraps a node with its sort so that building a
//! tree like `'a' + TRUE` does not compile:
//!
//! ```rust
//! use oxide_persist_core::ast::{NumberExpr, BooleanExpr};
//! use oxide_persist_core::identifier::ColumnName;
//!
//! let x = NumberExpr::column(ColumnName::new("x").unwrap());
//! let filter: BooleanExpr = x.add(NumberExpr::integer(1)).gt(NumberExpr::integer(10));
//! assert_eq!(filter.node().parameter_count(), 0);
//! ```

use core::marker::PhantomData;
use std::sync::Arc;

use super::operator::{AggregateOperator, BinaryOperator, UnaryOperator, VariadicOperator};
use super::types::{SortKind, SqlType};
use crate::error::{PersistError, Result};
use crate::identifier::QualifiedColumnName;

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Boolean literal.
    Boolean(bool),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// NULL literal.
    Null,
}

impl Literal {
    /// Returns the sort of this literal; NULL fits every sort.
    #[must_use]
    pub const fn sort(&self) -> Option<SortKind> {
        match self {
            Self::Boolean(_) => Some(SortKind::Boolean),
            Self::Integer(_) | Self::Float(_) => Some(SortKind::Number),
            Self::String(_) => Some(SortKind::String),
            Self::Null => None,
        }
    }
}

/// An untyped expression node.
///
/// Children are reference counted, so cloning a node shares its subtrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A literal value.
    Literal(Literal),

    /// A placeholder whose value arrives through the encoder.
    Parameter(SqlType),

    /// A column reference.
    Column(QualifiedColumnName),

    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOperator,
        /// Operand.
        child: Arc<Node>,
    },

    /// A binary expression.
    Binary {
        /// Operator.
        op: BinaryOperator,
        /// Left operand.
        left: Arc<Node>,
        /// Right operand.
        right: Arc<Node>,
    },

    /// An operator over one or more operands.
    Variadic {
        /// Operator.
        op: VariadicOperator,
        /// Operands; rendering fails on an empty list.
        children: Arc<[Node]>,
    },

    /// An aggregate over a column, or over all rows when `column` is `None`.
    Aggregate {
        /// Operator.
        op: AggregateOperator,
        /// Aggregated column.
        column: Option<QualifiedColumnName>,
    },
}

impl Node {
    /// Creates a parameter placeholder of any type, including binary types
    /// that have no expression sort.
    #[must_use]
    pub const fn parameter(sql_type: SqlType) -> Self {
        Self::Parameter(sql_type)
    }

    /// Counts the parameter placeholders in this tree.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        match self {
            Self::Parameter(_) => 1,
            Self::Literal(_) | Self::Column(_) | Self::Aggregate { .. } => 0,
            Self::Unary { child, .. } => child.parameter_count(),
            Self::Binary { left, right, .. } => left.parameter_count() + right.parameter_count(),
            Self::Variadic { children, .. } => children.iter().map(Self::parameter_count).sum(),
        }
    }

    fn binary(op: BinaryOperator, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    fn unary(op: UnaryOperator, child: Self) -> Self {
        Self::Unary {
            op,
            child: Arc::new(child),
        }
    }

    fn variadic(op: VariadicOperator, children: Vec<Self>) -> Result<Self> {
        if children.is_empty() {
            return Err(PersistError::MalformedNode(format!(
                "{} requires at least one operand",
                op.symbol()
            )));
        }
        Ok(Self::Variadic {
            op,
            children: children.into(),
        })
    }
}

impl From<Literal> for Node {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

mod private {
    pub trait Sealed {}
}

/// Marker trait for expression sorts.
pub trait Sort: private::Sealed + Copy + core::fmt::Debug {
    /// The sort this marker stands for.
    const KIND: SortKind;
}

/// Boolean sort marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanSort;
/// Numeric sort marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberSort;
/// String sort marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringSort;

impl private::Sealed for BooleanSort {}
impl private::Sealed for NumberSort {}
impl private::Sealed for StringSort {}

impl Sort for BooleanSort {
    const KIND: SortKind = SortKind::Boolean;
}
impl Sort for NumberSort {
    const KIND: SortKind = SortKind::Number;
}
impl Sort for StringSort {
    const KIND: SortKind = SortKind::String;
}

/// An expression of a statically known sort.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr<S: Sort> {
    node: Node,
    _sort: PhantomData<S>,
}

/// A boolean expression (predicates, WHERE clauses).
pub type BooleanExpr = Expr<BooleanSort>;
/// A numeric expression.
pub type NumberExpr = Expr<NumberSort>;
/// A string expression.
pub type StringExpr = Expr<StringSort>;

impl<S: Sort> Expr<S> {
    const fn wrap(node: Node) -> Self {
        Self {
            node,
            _sort: PhantomData,
        }
    }

    /// Returns the underlying node.
    #[must_use]
    pub const fn node(&self) -> &Node {
        &self.node
    }

    /// Discards the sort and returns the node.
    #[must_use]
    pub fn into_node(self) -> Node {
        self.node
    }

    /// Creates a column reference of this sort.
    #[must_use]
    pub fn column(name: impl Into<QualifiedColumnName>) -> Self {
        Self::wrap(Node::Column(name.into()))
    }

    /// Creates a parameter placeholder.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `sql_type` does not belong to this sort.
    pub fn parameter(sql_type: SqlType) -> Result<Self> {
        if sql_type.sort() != Some(S::KIND) {
            return Err(PersistError::MalformedNode(format!(
                "parameter of type {sql_type} is not a {} expression",
                S::KIND
            )));
        }
        Ok(Self::wrap(Node::Parameter(sql_type)))
    }

    /// Creates a NULL literal of this sort.
    #[must_use]
    pub const fn null() -> Self {
        Self::wrap(Node::Literal(Literal::Null))
    }

    /// Wraps a literal after checking its sort.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if the literal belongs to another sort.
    pub fn literal(literal: Literal) -> Result<Self> {
        match literal.sort() {
            Some(kind) if kind != S::KIND => Err(PersistError::MalformedNode(format!(
                "{kind} literal used as a {} expression",
                S::KIND
            ))),
            _ => Ok(Self::wrap(Node::Literal(literal))),
        }
    }

    fn compare(self, op: BinaryOperator, right: Self) -> BooleanExpr {
        Expr::wrap(Node::binary(op, self.node, right.node))
    }

    /// Creates an equality expression.
    #[must_use]
    pub fn eq(self, right: Self) -> BooleanExpr {
        self.compare(BinaryOperator::Equal, right)
    }

    /// Creates an inequality expression.
    #[must_use]
    pub fn unequal(self, right: Self) -> BooleanExpr {
        self.compare(BinaryOperator::Unequal, right)
    }

    /// Creates a less-than expression.
    #[must_use]
    pub fn lt(self, right: Self) -> BooleanExpr {
        self.compare(BinaryOperator::Less, right)
    }

    /// Creates a less-than-or-equal expression.
    #[must_use]
    pub fn lt_eq(self, right: Self) -> BooleanExpr {
        self.compare(BinaryOperator::LessEqual, right)
    }

    /// Creates a greater-than expression.
    #[must_use]
    pub fn gt(self, right: Self) -> BooleanExpr {
        self.compare(BinaryOperator::Greater, right)
    }

    /// Creates a greater-than-or-equal expression.
    #[must_use]
    pub fn gt_eq(self, right: Self) -> BooleanExpr {
        self.compare(BinaryOperator::GreaterEqual, right)
    }

    /// Creates an IS NULL expression.
    #[must_use]
    pub fn is_null(self) -> BooleanExpr {
        Expr::wrap(Node::unary(UnaryOperator::IsNull, self.node))
    }

    /// Creates an IS NOT NULL expression.
    #[must_use]
    pub fn is_not_null(self) -> BooleanExpr {
        Expr::wrap(Node::unary(UnaryOperator::IsNotNull, self.node))
    }

    /// Returns the first non-NULL operand.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `operands` is empty.
    pub fn coalesce(operands: Vec<Self>) -> Result<Self> {
        Node::variadic(
            VariadicOperator::Coalesce,
            operands.into_iter().map(Self::into_node).collect(),
        )
        .map(Self::wrap)
    }

    /// Returns the largest operand.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `operands` is empty.
    pub fn greatest(operands: Vec<Self>) -> Result<Self> {
        Node::variadic(
            VariadicOperator::Greatest,
            operands.into_iter().map(Self::into_node).collect(),
        )
        .map(Self::wrap)
    }
}

impl<S: Sort> From<Expr<S>> for Node {
    fn from(expr: Expr<S>) -> Self {
        expr.node
    }
}

impl BooleanExpr {
    /// Creates a boolean literal.
    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::wrap(Node::Literal(Literal::Boolean(value)))
    }

    /// Creates `column = ?` for a column of any type, binary types included.
    #[must_use]
    pub fn key_match(column: impl Into<QualifiedColumnName>, sql_type: SqlType) -> Self {
        Self::wrap(Node::binary(
            BinaryOperator::Equal,
            Node::Column(column.into()),
            Node::parameter(sql_type),
        ))
    }

    /// Creates an AND expression.
    #[must_use]
    pub fn and(self, right: Self) -> Self {
        Self::wrap(Node::binary(BinaryOperator::And, self.node, right.node))
    }

    /// Creates an OR expression.
    #[must_use]
    pub fn or(self, right: Self) -> Self {
        Self::wrap(Node::binary(BinaryOperator::Or, self.node, right.node))
    }

    /// Creates an XOR expression.
    #[must_use]
    pub fn xor(self, right: Self) -> Self {
        Self::wrap(Node::binary(BinaryOperator::Xor, self.node, right.node))
    }

    /// Creates a NOT expression.
    #[must_use]
    pub fn not(self) -> Self {
        Self::wrap(Node::unary(UnaryOperator::Not, self.node))
    }

    /// Folds predicates together with AND, or returns `None` when empty.
    #[must_use]
    pub fn all(predicates: impl IntoIterator<Item = Self>) -> Option<Self> {
        predicates.into_iter().reduce(Self::and)
    }
}

impl NumberExpr {
    /// Creates an integer literal.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::wrap(Node::Literal(Literal::Integer(value)))
    }

    /// Creates a float literal.
    #[must_use]
    pub const fn float(value: f64) -> Self {
        Self::wrap(Node::Literal(Literal::Float(value)))
    }

    fn arithmetic(self, op: BinaryOperator, right: Self) -> Self {
        Self::wrap(Node::binary(op, self.node, right.node))
    }

    /// Creates an addition.
    #[must_use]
    pub fn add(self, right: Self) -> Self {
        self.arithmetic(BinaryOperator::Add, right)
    }

    /// Creates a subtraction.
    #[must_use]
    pub fn sub(self, right: Self) -> Self {
        self.arithmetic(BinaryOperator::Subtract, right)
    }

    /// Creates a multiplication.
    #[must_use]
    pub fn mul(self, right: Self) -> Self {
        self.arithmetic(BinaryOperator::Multiply, right)
    }

    /// Creates a division.
    #[must_use]
    pub fn div(self, right: Self) -> Self {
        self.arithmetic(BinaryOperator::Divide, right)
    }

    /// Creates an integer division.
    #[must_use]
    pub fn int_div(self, right: Self) -> Self {
        self.arithmetic(BinaryOperator::Div, right)
    }

    /// Creates a remainder.
    #[must_use]
    pub fn modulo(self, right: Self) -> Self {
        self.arithmetic(BinaryOperator::Modulo, right)
    }

    /// Rounds to the nearest integer.
    #[must_use]
    pub fn round(self) -> Self {
        Self::wrap(Node::unary(UnaryOperator::Round, self.node))
    }

    /// Negates the value.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::wrap(Node::unary(UnaryOperator::Negate, self.node))
    }

    /// Takes the absolute value.
    #[must_use]
    pub fn abs(self) -> Self {
        Self::wrap(Node::unary(UnaryOperator::Abs, self.node))
    }

    /// Creates an aggregate over `column`, or over all rows for `None`.
    #[must_use]
    pub const fn aggregate(op: AggregateOperator, column: Option<QualifiedColumnName>) -> Self {
        Self::wrap(Node::Aggregate { op, column })
    }

    /// Creates `COUNT(*)`.
    #[must_use]
    pub const fn count_all() -> Self {
        Self::aggregate(AggregateOperator::Count, None)
    }
}

impl StringExpr {
    /// Creates a string literal.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::wrap(Node::Literal(Literal::String(value.into())))
    }

    /// Concatenates the operands.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `operands` is empty.
    pub fn concat(operands: Vec<Self>) -> Result<Self> {
        Node::variadic(
            VariadicOperator::Concat,
            operands.into_iter().map(Self::into_node).collect(),
        )
        .map(Self::wrap)
    }

    /// Creates a LIKE expression.
    #[must_use]
    pub fn like(self, pattern: Self) -> BooleanExpr {
        self.compare(BinaryOperator::Like, pattern)
    }

    /// Upper-cases the value.
    #[must_use]
    pub fn upper(self) -> Self {
        Self::wrap(Node::unary(UnaryOperator::Upper, self.node))
    }

    /// Lower-cases the value.
    #[must_use]
    pub fn lower(self) -> Self {
        Self::wrap(Node::unary(UnaryOperator::Lower, self.node))
    }

    /// Returns the character length.
    #[must_use]
    pub fn length(self) -> NumberExpr {
        Expr::wrap(Node::unary(UnaryOperator::Length, self.node))
    }
}
