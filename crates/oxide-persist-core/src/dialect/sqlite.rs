//! SQLite dialect.
//!
//! SQLite stores every value in one of four storage classes, has no boolean
//! type, no `XOR`, no integer `DIV` and no `CONCAT`/`GREATEST` functions.
//! Identifiers are upper-cased.

use super::{BinaryForm, Dialect, VariadicForm};
use crate::ast::{BinaryOperator, SqlType, VariadicOperator};

/// Default bound-variable limit of SQLite 3.32 and later.
pub const SQLITE_MAX_VARIABLE_NUMBER: usize = 32_766;

/// The SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn type_name(&self, sql_type: SqlType) -> Option<&'static str> {
        Some(match sql_type {
            SqlType::Empty => return None,
            SqlType::Boolean
            | SqlType::Integer08
            | SqlType::Integer16
            | SqlType::Integer32
            | SqlType::Integer64 => "INTEGER",
            // Wide integers are stored as decimal text to keep all 128 bits.
            SqlType::Integer | SqlType::String01 | SqlType::String64 | SqlType::String => "TEXT",
            SqlType::Decimal32 | SqlType::Decimal64 => "REAL",
            SqlType::Binary128 | SqlType::Binary256 | SqlType::Binary => "BLOB",
        })
    }

    fn identifier(&self, name: &str) -> String {
        name.to_ascii_uppercase()
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn binary_form(&self, op: BinaryOperator) -> Option<BinaryForm> {
        Some(match op {
            BinaryOperator::Xor => BinaryForm::Infix("<>"),
            BinaryOperator::Div => BinaryForm::Cast {
                symbol: "/",
                target: "INTEGER",
            },
            other => BinaryForm::Infix(other.symbol()),
        })
    }

    fn variadic_form(&self, op: VariadicOperator, arity: usize) -> Option<VariadicForm> {
        Some(match op {
            VariadicOperator::Concat => VariadicForm::Infix("||"),
            // One-argument MAX is the aggregate and COALESCE needs two.
            _ if arity == 1 => VariadicForm::Operand,
            VariadicOperator::Greatest => VariadicForm::Function("MAX"),
            VariadicOperator::Coalesce => VariadicForm::Function("COALESCE"),
        })
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(SQLITE_MAX_VARIABLE_NUMBER)
    }

    fn supports_drop_cascade(&self) -> bool {
        false
    }
}
