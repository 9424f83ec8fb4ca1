//! Error types for schema derivation, rendering, encoding and execution.

use std::error::Error as StdError;

use crate::ast::SqlType;

/// Boxed backend error carried as the cause of transactional failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised by the AST, dialects, conversion engine and backends.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    // Schema errors
    /// A member has no SQL representation.
    #[error("unsupported type for '{member}': {detail}")]
    UnsupportedType {
        /// The member (or lookup key) without a representation.
        member: String,
        /// What was found instead.
        detail: String,
    },

    /// A member is declared both embedded and referenced (or otherwise
    /// decomposes in more than one way).
    #[error("ambiguous decomposition of member '{member}': {detail}")]
    AmbiguousDecomposition {
        /// The offending member.
        member: String,
        /// The conflicting declarations.
        detail: String,
    },

    /// An identifier exceeds the portable length limit.
    #[error("identifier '{name}' is {length} characters long (maximum is 63)")]
    NameTooLong {
        /// The rejected identifier.
        name: String,
        /// Its length in characters.
        length: usize,
    },

    /// An identifier is empty or contains characters that cannot be rendered.
    #[error("invalid identifier '{0}'")]
    InvalidName(String),

    /// No table is registered under this qualified name.
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// A different table definition is already registered under this name.
    #[error("table '{0}' is already registered with a different definition")]
    DuplicateTable(String),

    /// A referenced type lacks the column a reference names.
    #[error("type '{target}' has no column '{column}' usable as a reference target")]
    MissingReferencedField {
        /// The referenced type or table.
        target: String,
        /// The missing column.
        column: String,
    },

    /// A type reaches itself through embedded, dependent or referenced members.
    #[error("cyclic schema: type '{type_name}' contains itself ({path})")]
    CyclicSchema {
        /// The type that was reached twice.
        type_name: String,
        /// The derivation path that closed the cycle.
        path: String,
    },

    // Construction and rendering errors
    /// An AST node violates a construction invariant.
    #[error("malformed node: {0}")]
    MalformedNode(String),

    /// A dialect cannot render this node.
    #[error("dialect '{dialect}' does not support {node}")]
    UnsupportedNode {
        /// The refusing dialect.
        dialect: &'static str,
        /// Description of the node.
        node: String,
    },

    // Encoding errors
    /// The backend rejected a bound value.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    /// The backend does not support the requested operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    // Decoding errors
    /// The row stream ended before every expected column was read.
    #[error("missing value at column {column}")]
    MissingValue {
        /// Zero-based column position that was requested.
        column: usize,
    },

    /// A value is present but cannot be coerced to the expected type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The expected SQL type.
        expected: SqlType,
        /// Description of the value found.
        found: String,
    },

    /// A non-nullable field decoded as NULL.
    #[error("unexpected NULL for non-nullable field '{0}'")]
    UnexpectedNull(String),

    /// A result set has no rows.
    #[error("result set is empty")]
    EmptyResult,

    // Transactional and operation errors
    /// Opening the backend connection failed.
    #[error("connection failed")]
    ConnectionFailed(#[source] BoxError),

    /// Preparing a statement failed.
    #[error("statement creation failed")]
    StatementCreationFailed(#[source] BoxError),

    /// Committing (or beginning) a transaction failed.
    #[error("commit failed")]
    CommitFailed(#[source] BoxError),

    /// Executing a statement failed.
    #[error("query execution failed")]
    QueryExecutionFailed(#[source] BoxError),

    /// Releasing a backend resource failed, possibly after a prior error.
    #[error("resource close failed{}", .prior.as_ref().map(|p| format!(" after: {p}")).unwrap_or_default())]
    ResourceCloseFailed {
        /// The close failure.
        #[source]
        source: BoxError,
        /// The error that was already being reported, if any.
        prior: Option<Box<PersistError>>,
    },

    // Configuration errors
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistError {
    /// Chains a resource-close failure onto this error.
    #[must_use]
    pub fn chain_close(self, close: impl Into<BoxError>) -> Self {
        Self::ResourceCloseFailed {
            source: close.into(),
            prior: Some(Box::new(self)),
        }
    }

    /// Builds a `TypeMismatch` for `expected` from anything printable.
    pub(crate) fn mismatch(expected: SqlType, found: impl core::fmt::Display) -> Self {
        Self::TypeMismatch {
            expected,
            found: found.to_string(),
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_close_keeps_prior_error() {
        let prior = PersistError::QueryExecutionFailed("disk full".into());
        let chained = prior.chain_close("handle already closed");

        let PersistError::ResourceCloseFailed { source, prior } = &chained else {
            panic!("expected ResourceCloseFailed, got {chained:?}");
        };
        assert_eq!(source.to_string(), "handle already closed");
        assert!(matches!(
            prior.as_deref(),
            Some(PersistError::QueryExecutionFailed(_))
        ));
        assert_eq!(
            chained.to_string(),
            "resource close failed after: query execution failed"
        );
    }

    #[test]
    fn test_name_too_long_message() {
        let err = PersistError::NameTooLong {
            name: "x".repeat(64),
            length: 64,
        };
        assert!(err.to_string().contains("64 characters"));
    }
}
