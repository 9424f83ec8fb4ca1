//! Generic SQL dialect.

use super::Dialect;
use crate::ast::SqlType;

/// A generic SQL dialect using ANSI SQL standards.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    /// Creates a new generic dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn type_name(&self, sql_type: SqlType) -> Option<&'static str> {
        Some(match sql_type {
            SqlType::Empty => return None,
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer08 => "TINYINT",
            SqlType::Integer16 => "SMALLINT",
            SqlType::Integer32 => "INTEGER",
            SqlType::Integer64 => "BIGINT",
            SqlType::Integer => "DECIMAL(38, 0)",
            SqlType::Decimal32 => "REAL",
            SqlType::Decimal64 => "DOUBLE",
            SqlType::String01 => "CHAR(1)",
            SqlType::String64 => "VARCHAR(64)",
            SqlType::String => "TEXT",
            SqlType::Binary128 => "BINARY(16)",
            SqlType::Binary256 => "BINARY(32)",
            SqlType::Binary => "BLOB",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOperator;
    use crate::dialect::BinaryForm;

    #[test]
    fn test_generic_dialect() {
        let dialect = GenericDialect::new();
        assert_eq!(dialect.name(), "generic");
        assert_eq!(dialect.identifier("Points"), "Points");
        assert_eq!(dialect.boolean_literal(true), "TRUE");
        assert!(dialect.supports_drop_cascade());
        assert_eq!(
            dialect.binary_form(BinaryOperator::Xor),
            Some(BinaryForm::Infix("XOR"))
        );
    }

    #[test]
    fn test_every_column_type_has_a_name() {
        let dialect = GenericDialect::new();
        for ty in SqlType::ALL {
            assert_eq!(dialect.type_name(ty).is_some(), ty != SqlType::Empty);
        }
    }
}
