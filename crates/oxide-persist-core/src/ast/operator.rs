//! Operators grouped by arity.
//!
//! Every operator carries its default rendering symbol; dialects may
//! override how an operator is spelled but never which operands it takes.

use super::types::SortKind;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Boolean connectives
    And,
    Or,
    Xor,

    // Comparison
    Equal,
    Unequal,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // String
    Like,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Div,
    Modulo,
}

impl BinaryOperator {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Equal => "=",
            Self::Unequal => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Like => "LIKE",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Div => "DIV",
            Self::Modulo => "%",
        }
    }

    /// Returns the sort of the result.
    #[must_use]
    pub const fn result_sort(self) -> SortKind {
        match self {
            Self::Add
            | Self::Subtract
            | Self::Multiply
            | Self::Divide
            | Self::Div
            | Self::Modulo => SortKind::Number,
            _ => SortKind::Boolean,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Logical NOT.
    Not,
    /// IS NULL test.
    IsNull,
    /// IS NOT NULL test.
    IsNotNull,
    /// Round to the nearest integer.
    Round,
    /// Arithmetic negation.
    Negate,
    /// Absolute value.
    Abs,
    /// Upper-case a string.
    Upper,
    /// Lower-case a string.
    Lower,
    /// Character length of a string.
    Length,
}

/// How a unary operator is written around its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryNotation {
    /// `SYM (operand)`
    Prefix,
    /// `(operand) SYM`
    Postfix,
    /// `SYM(operand)`
    Function,
}

impl UnaryOperator {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Not => "NOT",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Round => "ROUND",
            Self::Negate => "-",
            Self::Abs => "ABS",
            Self::Upper => "UPPER",
            Self::Lower => "LOWER",
            Self::Length => "LENGTH",
        }
    }

    /// Returns how the operator is placed around its operand.
    #[must_use]
    pub const fn notation(self) -> UnaryNotation {
        match self {
            Self::Not | Self::Negate => UnaryNotation::Prefix,
            Self::IsNull | Self::IsNotNull => UnaryNotation::Postfix,
            Self::Round | Self::Abs | Self::Upper | Self::Lower | Self::Length => {
                UnaryNotation::Function
            }
        }
    }
}

/// Aggregate operators over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOperator {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl AggregateOperator {
    /// Returns the SQL function name.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Avg => "AVG",
            Self::Count => "COUNT",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Sum => "SUM",
        }
    }
}

/// Operators taking one or more operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariadicOperator {
    /// String concatenation.
    Concat,
    /// Largest operand.
    Greatest,
    /// First non-NULL operand.
    Coalesce,
}

impl VariadicOperator {
    /// Returns the SQL function name.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Concat => "CONCAT",
            Self::Greatest => "GREATEST",
            Self::Coalesce => "COALESCE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_symbols() {
        assert_eq!(BinaryOperator::Unequal.symbol(), "<>");
        assert_eq!(BinaryOperator::Div.symbol(), "DIV");
        assert_eq!(BinaryOperator::Modulo.symbol(), "%");
    }

    #[test]
    fn test_result_sorts() {
        assert_eq!(BinaryOperator::Add.result_sort(), SortKind::Number);
        assert_eq!(BinaryOperator::Equal.result_sort(), SortKind::Boolean);
        assert_eq!(BinaryOperator::Like.result_sort(), SortKind::Boolean);
    }

    #[test]
    fn test_unary_notation() {
        assert_eq!(UnaryOperator::Not.notation(), UnaryNotation::Prefix);
        assert_eq!(UnaryOperator::IsNull.notation(), UnaryNotation::Postfix);
        assert_eq!(UnaryOperator::Abs.notation(), UnaryNotation::Function);
    }
}
