//! Abstract Syntax Tree (AST) types for SQL expressions and statements.
//!
//! Nodes know their operators and children but not how to render; see
//! [`crate::dialect`] for rendering.

mod constraint;
mod expression;
mod operator;
mod statement;
mod types;

pub use constraint::{
    CheckConstraint, ForeignKeyAction, ForeignKeyConstraint, PrimaryKeyConstraint,
    TableConstraint, UniqueConstraint,
};
pub use expression::{
    BooleanExpr, BooleanSort, Expr, Literal, Node, NumberExpr, NumberSort, Sort, StringExpr,
    StringSort,
};
pub use operator::{
    AggregateOperator, BinaryOperator, UnaryNotation, UnaryOperator, VariadicOperator,
};
pub use statement::{
    Assignment, CreateTable, Delete, DropTable, Insert, InsertSource, OrderBy, OrderDirection,
    Projection, Select, Statement, Update,
};
pub use types::{ColumnDef, SortKind, SqlType};
