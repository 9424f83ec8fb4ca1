//! The sqlx-backed [`Connection`].

use std::str::FromStr;

use oxide_persist_core::ast::SqlType;
use oxide_persist_core::catalog::SchemaRegistry;
use oxide_persist_core::codec::{Encoder, ValueBuffer};
use oxide_persist_core::dialect::{RenderedSql, SqliteDialect};
use oxide_persist_core::error::{PersistError, Result};
use oxide_persist_core::session::{Connection, Session};
use oxide_persist_core::value::SqlValue;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions};
use sqlx::{Connection as _, Executor};
use tracing::{debug, info};

use crate::rows::SqliteRows;

/// A single SQLite connection.
pub struct SqliteConnection {
    inner: sqlx::SqliteConnection,
}

impl SqliteConnection {
    /// Opens a connection from a URL such as `sqlite::memory:` or
    /// `sqlite://data.db`. Missing database files are created.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` for an invalid URL or an unreachable
    /// database.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| PersistError::ConnectionFailed(Box::new(e)))?
            .create_if_missing(true);
        Self::connect_with(&options).await
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if SQLite cannot be opened.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Opens a connection with explicit options. Foreign keys are always
    /// enforced.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the database cannot be opened.
    pub async fn connect_with(options: &SqliteConnectOptions) -> Result<Self> {
        let options = options.clone().foreign_keys(true);
        let inner = sqlx::SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| PersistError::ConnectionFailed(Box::new(e)))?;
        info!(
            filename = %options.get_filename().display(),
            "Opened SQLite connection"
        );
        Ok(Self { inner })
    }

    /// Wraps the connection in a session using [`SqliteDialect`].
    #[must_use]
    pub fn into_session(self, registry: &SchemaRegistry) -> Session<'_, Self> {
        Session::new(self, registry, Box::new(SqliteDialect))
    }

    async fn run(&mut self, sql: &'static str) -> Result<()> {
        sqlx::query(sql)
            .execute(&mut self.inner)
            .await
            .map_err(|e| PersistError::CommitFailed(Box::new(e)))?;
        Ok(())
    }
}

/// A statement prepared on a [`SqliteConnection`].
///
/// Bound values are buffered; every batch row runs the statement once.
#[derive(Debug, Clone)]
pub struct SqliteStatement {
    sql: String,
    parameters: Vec<SqlType>,
    values: ValueBuffer,
}

impl SqliteStatement {
    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the values bound so far, in bind order.
    #[must_use]
    pub fn values(&self) -> Vec<SqlValue> {
        self.values.values()
    }

    fn into_runs(self) -> Result<(String, Vec<Vec<SqlValue>>)> {
        let expected = self.parameters.len();
        let mut runs = self.values.into_rows();
        if runs.is_empty() {
            runs.push(Vec::new());
        }
        if let Some(run) = runs.iter().find(|run| run.len() != expected) {
            return Err(PersistError::EncodingFailed(format!(
                "statement expects {expected} values, {} were bound",
                run.len()
            )));
        }
        Ok((self.sql, runs))
    }
}

impl Encoder for SqliteStatement {
    fn bind(&mut self, sql_type: SqlType, value: SqlValue) -> Result<()> {
        self.values.bind(sql_type, value)
    }

    fn add_batch(&mut self) -> Result<()> {
        self.values.add_batch()
    }
}

impl Connection for SqliteConnection {
    type Statement = SqliteStatement;
    type Rows = SqliteRows;

    async fn prepare(&mut self, sql: &RenderedSql) -> Result<SqliteStatement> {
        (&mut self.inner)
            .prepare(sql.sql.as_str())
            .await
            .map_err(|e| PersistError::StatementCreationFailed(Box::new(e)))?;
        Ok(SqliteStatement {
            sql: sql.sql.clone(),
            parameters: sql.parameters.clone(),
            values: ValueBuffer::new(),
        })
    }

    async fn execute(&mut self, statement: SqliteStatement) -> Result<u64> {
        let (sql, runs) = statement.into_runs()?;
        let mut affected = 0;
        for run in runs {
            let result = bind_all(sqlx::query(&sql), run)
                .execute(&mut self.inner)
                .await
                .map_err(|e| PersistError::QueryExecutionFailed(Box::new(e)))?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    async fn query(&mut self, statement: SqliteStatement) -> Result<SqliteRows> {
        let (sql, runs) = statement.into_runs()?;
        if runs.len() > 1 {
            return Err(PersistError::UnsupportedOperation(String::from(
                "a query cannot run batched",
            )));
        }
        let mut rows = Vec::new();
        for run in runs {
            rows.extend(
                bind_all(sqlx::query(&sql), run)
                    .fetch_all(&mut self.inner)
                    .await
                    .map_err(|e| PersistError::QueryExecutionFailed(Box::new(e)))?,
            );
        }
        debug!(rows = rows.len(), "Fetched SQLite rows");
        SqliteRows::from_rows(&rows)
    }

    async fn begin(&mut self) -> Result<()> {
        self.run("BEGIN").await
    }

    async fn commit(&mut self) -> Result<()> {
        self.run("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.run("ROLLBACK").await
    }

    async fn close(self) -> Result<()> {
        self.inner
            .close()
            .await
            .map_err(|e| PersistError::ResourceCloseFailed {
                source: Box::new(e),
                prior: None,
            })
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: Vec<SqlValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = bind_value(query, value);
    }
    query
}

/// Binds a value in its SQLite storage class. Wide integers and characters
/// are stored as text.
fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int8(v) => query.bind(i64::from(v)),
        SqlValue::Int16(v) => query.bind(i64::from(v)),
        SqlValue::Int32(v) => query.bind(i64::from(v)),
        SqlValue::Int64(v) => query.bind(v),
        SqlValue::Integer(v) => query.bind(v.to_string()),
        SqlValue::Float32(v) => query.bind(f64::from(v)),
        SqlValue::Float64(v) => query.bind(v),
        SqlValue::Char(c) => query.bind(c.to_string()),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
    }
}
