//! Running converter statements against a backend.
//!
//! A backend implements [`Connection`]: its prepared statements are
//! [`Encoder`]s and its result sets are [`Decoder`]s. A [`Session`] renders
//! the statements the [`Converter`] builds, binds their values and reads
//! their rows back into storable values.

use tracing::{debug, info, warn};

use crate::ast::BooleanExpr;
use crate::catalog::{SchemaRegistry, Site};
use crate::codec::{Decoder, Encoder};
use crate::config::{PersistConfig, DEFAULT_BATCH_SIZE};
use crate::convert::{Bound, Converter};
use crate::dialect::{Dialect, RenderedSql, Unparse};
use crate::error::{PersistError, Result};
use crate::schema::{Datum, Record, Storable, TypeDescriptor};
use crate::value::SqlValue;

/// A backend connection.
///
/// Statements are prepared from rendered SQL, bound through their
/// [`Encoder`] implementation and consumed by [`Connection::execute`] or
/// [`Connection::query`]. Every [`Encoder::add_batch`] call closes one
/// execution of a batched statement.
#[allow(async_fn_in_trait)]
pub trait Connection {
    /// A prepared statement.
    type Statement: Encoder;
    /// A fully fetched result set.
    type Rows: Decoder;

    /// Prepares a statement.
    ///
    /// # Errors
    ///
    /// Returns `StatementCreationFailed` if the backend rejects the SQL.
    async fn prepare(&mut self, sql: &RenderedSql) -> Result<Self::Statement>;

    /// Executes a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns `QueryExecutionFailed` if execution fails.
    async fn execute(&mut self, statement: Self::Statement) -> Result<u64>;

    /// Executes a query and returns its rows, positioned before the first.
    ///
    /// # Errors
    ///
    /// Returns `QueryExecutionFailed` if execution fails.
    async fn query(&mut self, statement: Self::Statement) -> Result<Self::Rows>;

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the transaction cannot start.
    async fn begin(&mut self) -> Result<()>;

    /// Commits the current transaction.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the commit fails.
    async fn commit(&mut self) -> Result<()>;

    /// Rolls the current transaction back.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the rollback fails.
    async fn rollback(&mut self) -> Result<()>;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns `ResourceCloseFailed` if the backend reports an error.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// A connection together with a converter, a dialect and a site.
pub struct Session<'r, C: Connection> {
    connection: C,
    converter: Converter<'r>,
    dialect: Box<dyn Dialect>,
    site: Site,
    batch_size: usize,
}

#[allow(clippy::future_not_send)]
impl<'r, C: Connection> Session<'r, C> {
    /// Creates a session on the default site.
    pub fn new(connection: C, registry: &'r SchemaRegistry, dialect: Box<dyn Dialect>) -> Self {
        Self {
            connection,
            converter: Converter::new(registry),
            dialect,
            site: Site::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Creates a session with the configured dialect, site and batch size.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an invalid configuration.
    pub fn from_config(
        connection: C,
        registry: &'r SchemaRegistry,
        config: &PersistConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            connection,
            converter: Converter::new(registry),
            dialect: config.dialect()?,
            site: config.site()?,
            batch_size: config.batch_size,
        })
    }

    /// Sets the site.
    #[must_use]
    pub fn with_site(mut self, site: Site) -> Self {
        self.site = site;
        self
    }

    /// Sets the number of rows per batched insert.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `batch_size` is zero.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PersistError::Config(String::from(
                "batch_size must be at least 1",
            )));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Returns the site.
    #[must_use]
    pub const fn site(&self) -> &Site {
        &self.site
    }

    /// Returns the converter.
    #[must_use]
    pub const fn converter(&self) -> &Converter<'r> {
        &self.converter
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    /// Returns the connection.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Ends the session and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns `ResourceCloseFailed` if the connection fails to close.
    pub async fn close(self) -> Result<()> {
        self.close_after(Ok(())).await
    }

    /// Ends the session after an operation and closes the connection.
    ///
    /// The outcome of the operation is returned when closing succeeds. A
    /// close failure after a failed operation keeps the operation's error
    /// as the prior error of `ResourceCloseFailed`.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or `ResourceCloseFailed`.
    pub async fn close_after<T>(self, outcome: Result<T>) -> Result<T> {
        match (outcome, self.connection.close().await) {
            (outcome, Ok(())) => outcome,
            (Ok(_), Err(close)) => Err(close),
            (Err(prior), Err(close)) => {
                warn!(error = %prior, "Connection failed to close after an error");
                Err(match close {
                    PersistError::ResourceCloseFailed { source, prior: None } => {
                        prior.chain_close(source)
                    }
                    other => prior.chain_close(other),
                })
            }
        }
    }

    /// Ends the session and returns the connection.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Renders a node with this session's dialect and site.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedNode` if the dialect cannot render the node.
    pub fn render(&self, node: &impl Unparse) -> Result<RenderedSql> {
        node.to_sql(&*self.dialect, &self.site)
    }

    async fn prepare(&mut self, rendered: &RenderedSql) -> Result<C::Statement> {
        debug!(
            sql = %rendered.sql,
            parameters = rendered.parameter_count(),
            dialect = self.dialect.name(),
            "Executing SQL"
        );
        self.connection.prepare(rendered).await
    }

    async fn execute_bound<S: Unparse>(&mut self, bound: &Bound<S>) -> Result<u64> {
        let rendered = self.render(&bound.statement)?;
        let mut statement = self.prepare(&rendered).await?;
        bound.encode(&rendered.parameters, &mut statement)?;
        self.connection.execute(statement).await
    }

    async fn query_bound<S: Unparse>(&mut self, bound: &Bound<S>) -> Result<C::Rows> {
        let rendered = self.render(&bound.statement)?;
        let mut statement = self.prepare(&rendered).await?;
        bound.encode(&rendered.parameters, &mut statement)?;
        self.connection.query(statement).await
    }

    /// Executes a rendered statement without parameters.
    ///
    /// # Errors
    ///
    /// Returns `StatementCreationFailed` or `QueryExecutionFailed`.
    pub async fn execute_sql(&mut self, rendered: &RenderedSql) -> Result<u64> {
        let statement = self.prepare(rendered).await?;
        self.connection.execute(statement).await
    }

    /// Creates every table `T` needs, referenced tables first, and returns
    /// how many CREATE TABLE statements ran.
    ///
    /// # Errors
    ///
    /// Returns a derivation error, `DuplicateTable`, or a backend error.
    pub async fn create_tables<T: Storable>(&mut self) -> Result<usize> {
        let tables = self.converter.create_required_tables::<T>(&self.site)?;
        for create in &tables {
            let rendered = self.render(create)?;
            self.execute_sql(&rendered).await?;
        }
        info!(
            type_name = T::descriptor().type_name,
            tables = tables.len(),
            "Created tables"
        );
        Ok(tables.len())
    }

    /// Inserts one instance and its dependent rows.
    ///
    /// # Errors
    ///
    /// See [`Session::insert_all`].
    pub async fn insert<T: Storable>(&mut self, instance: &T) -> Result<u64> {
        self.insert_all(core::slice::from_ref(instance)).await
    }

    /// Inserts instances in multi-row batches of at most `batch_size`
    /// rows, then their dependent rows. Returns the number of owner rows
    /// inserted.
    ///
    /// # Errors
    ///
    /// Returns `EncodingFailed` if a value does not fit its column, or a
    /// backend error.
    pub async fn insert_all<T: Storable>(&mut self, instances: &[T]) -> Result<u64> {
        if instances.is_empty() {
            return Ok(0);
        }
        let width = self
            .converter
            .insert_statement::<T>(&self.site, 1)?
            .parameter_count();
        let rows = self.rows_per_insert(width);
        let mut inserted = 0;
        for chunk in instances.chunks(rows) {
            let insert = self.converter.insert_statement::<T>(&self.site, chunk.len())?;
            let rendered = self.render(&insert)?;
            let mut statement = self.prepare(&rendered).await?;
            for instance in chunk {
                self.converter
                    .encode_insert_row(&self.site, instance, &mut statement)?;
            }
            inserted += self.connection.execute(statement).await?;
        }
        for instance in instances {
            self.insert_dependents(instance).await?;
        }
        Ok(inserted)
    }

    /// Caps `batch_size` so one insert stays within the dialect's
    /// placeholder limit.
    fn rows_per_insert(&self, width: usize) -> usize {
        match self.dialect.max_parameters() {
            Some(limit) if width > 0 => self.batch_size.min(limit / width).max(1),
            _ => self.batch_size,
        }
    }

    async fn insert_dependents<T: Storable>(&mut self, instance: &T) -> Result<()> {
        for rows in self
            .converter
            .insert_into_dependent_table(&self.site, instance)?
        {
            let rendered = self.render(&rows.insert)?;
            let mut statement = self.prepare(&rendered).await?;
            rows.batch.encode_into(&mut statement)?;
            self.connection.execute(statement).await?;
        }
        Ok(())
    }

    /// Reads every instance of `T` on this session's site.
    ///
    /// # Errors
    ///
    /// Returns a decoding error or a backend error.
    pub async fn select_all<T: Storable>(&mut self) -> Result<Vec<T>> {
        let bound = self.converter.select::<T>(&self.site, None, Vec::new())?;
        self.fetch(&bound).await
    }

    /// Reads the instances of `T` matching `filter`, binding `values` to
    /// the placeholders of `filter` in render order.
    ///
    /// # Errors
    ///
    /// Returns `MalformedNode` if `values` does not match the placeholders
    /// of `filter`, a decoding error, or a backend error.
    pub async fn select_where<T: Storable>(
        &mut self,
        filter: BooleanExpr,
        values: Vec<SqlValue>,
    ) -> Result<Vec<T>> {
        let bound = self.converter.select::<T>(&self.site, Some(filter), values)?;
        self.fetch(&bound).await
    }

    async fn fetch<T: Storable, S: Unparse>(&mut self, bound: &Bound<S>) -> Result<Vec<T>> {
        let descriptor = T::descriptor();
        let mut rows = self.query_bound(bound).await?;
        let mut records = Vec::new();
        while rows.move_to_next_row()? {
            records.push(self.converter.recover_record(&descriptor, &mut rows)?);
        }
        debug!(type_name = descriptor.type_name, rows = records.len(), "Fetched rows");

        let mut instances = Vec::with_capacity(records.len());
        for mut record in records {
            self.load_dependents(&descriptor, &mut record).await?;
            instances.push(T::from_record(record)?);
        }
        Ok(instances)
    }

    async fn load_dependents(
        &mut self,
        descriptor: &TypeDescriptor,
        record: &mut Record,
    ) -> Result<()> {
        let queries = self
            .converter
            .select_dependents(descriptor, &self.site, record)?;
        for (index, fields, bound) in queries {
            let mut rows = self.query_bound(&bound).await?;
            let mut elements = Vec::new();
            while rows.move_to_next_row()? {
                elements.push(Converter::recover_fields(&fields, &mut rows)?);
            }
            record.set(index, Datum::Records(elements))?;
        }
        Ok(())
    }

    /// Updates the non-key columns of `instance` and replaces its
    /// dependent rows.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if `T` has no primary key, or a
    /// backend error.
    pub async fn update<T: Storable>(&mut self, instance: &T) -> Result<u64> {
        let bound = self.converter.update(&self.site, instance)?;
        let updated = self.execute_bound(&bound).await?;
        for delete in self.converter.delete_dependents(&self.site, instance)? {
            self.execute_bound(&delete).await?;
        }
        self.insert_dependents(instance).await?;
        Ok(updated)
    }

    /// Deletes `instance` and its dependent rows.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedOperation` if `T` has no primary key, or a
    /// backend error.
    pub async fn delete<T: Storable>(&mut self, instance: &T) -> Result<u64> {
        for delete in self.converter.delete_dependents(&self.site, instance)? {
            self.execute_bound(&delete).await?;
        }
        let bound = self.converter.delete(&self.site, instance)?;
        self.execute_bound(&bound).await
    }

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the backend refuses.
    pub async fn begin(&mut self) -> Result<()> {
        debug!("Beginning transaction");
        self.connection.begin().await
    }

    /// Commits the current transaction.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the commit fails.
    pub async fn commit(&mut self) -> Result<()> {
        debug!("Committing transaction");
        self.connection.commit().await
    }

    /// Rolls the current transaction back.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the rollback fails.
    pub async fn rollback(&mut self) -> Result<()> {
        warn!("Rolling back transaction");
        self.connection.rollback().await
    }
}
