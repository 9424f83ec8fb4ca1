//! # oxide-persist-sqlite
//!
//! SQLite backend for `oxide-persist-core`, built on sqlx.
//!
//! # How the SQLite backend stores values
//!
//! - **[Type affinity]**: every value is bound in one of SQLite's storage
//!   classes. Narrow integers and booleans are stored as `INTEGER`, floats
//!   as `REAL`, and the decoder narrows them back on read.
//! - **Wide integers** (`INTEGER` in the portable type system) do not fit
//!   a 64-bit SQLite integer, so they are stored as decimal `TEXT` and
//!   parsed on read.
//! - **Characters** are stored as one-character `TEXT`.
//! - **[Foreign keys]** are enforced on every connection.
//! - **Transactions** are plain `BEGIN`, `COMMIT` and `ROLLBACK` statements
//!   on the connection.
//!
//! [Type affinity]: https://www.sqlite.org/datatype3.html
//! [Foreign keys]: https://www.sqlite.org/foreignkeys.html
//!
//! ## Example
//!
//! ```rust
//! use oxide_persist_core::catalog::SchemaRegistry;
//! use oxide_persist_derive::Storable;
//! use oxide_persist_sqlite::SqliteConnection;
//!
//! #[derive(Debug, PartialEq, Storable)]
//! struct Person {
//!     #[column(primary_key)]
//!     id: i64,
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = SchemaRegistry::new();
//! let mut session = SqliteConnection::in_memory()
//!     .await
//!     .unwrap()
//!     .into_session(&registry);
//!
//! session.create_tables::<Person>().await.unwrap();
//! let ada = Person { id: 1, name: "Ada".into(), age: None };
//! session.insert(&ada).await.unwrap();
//!
//! let people: Vec<Person> = session.select_all().await.unwrap();
//! assert_eq!(people, vec![ada]);
//! # });
//! ```

mod connection;
mod rows;

pub use connection::{SqliteConnection, SqliteStatement};
pub use oxide_persist_core::dialect::SqliteDialect;
pub use rows::SqliteRows;
pub use sqlx::sqlite::SqliteConnectOptions;
