//! # oxide-persist-core
//!
//! A portable SQL abstraction and object-relational conversion engine.
//!
//! This crate provides:
//! - A typed expression and statement AST that rejects malformed trees at
//!   construction
//! - Pluggable dialects that render the AST into parameterized SQL, where
//!   the order of the `?` placeholders is the order values are bound
//! - A conversion engine deriving tables, parameter values and row readers
//!   from `#[derive(Storable)]` types
//! - A backend-neutral encoder/decoder protocol and an async session driving
//!   it against a connection
//!
//! ## Rendering
//!
//! ```rust
//! use oxide_persist_core::ast::{NumberExpr, Select};
//! use oxide_persist_core::catalog::Site;
//! use oxide_persist_core::dialect::{GenericDialect, Unparse};
//! use oxide_persist_core::identifier::{ColumnName, TableName};
//! use oxide_persist_core::SqlType;
//!
//! let age = ColumnName::new("age").unwrap();
//! let select = Select::new(TableName::new("people").unwrap())
//!     .column(ColumnName::new("name").unwrap())
//!     .where_clause(NumberExpr::column(age).gt(NumberExpr::parameter(SqlType::Integer32).unwrap()));
//!
//! let rendered = select.to_sql(&GenericDialect, &Site::default()).unwrap();
//! assert_eq!(rendered.sql, "SELECT name FROM people WHERE (age) > (?)");
//! assert_eq!(rendered.parameters, vec![SqlType::Integer32]);
//! ```
//!
//! ## Converting
//!
//! ```rust
//! use oxide_persist_core::catalog::{SchemaRegistry, Site};
//! use oxide_persist_core::convert::Converter;
//! use oxide_persist_core::dialect::{GenericDialect, Unparse};
//! use oxide_persist_derive::Storable;
//!
//! #[derive(Debug, Storable)]
//! #[table(name = "points")]
//! struct Point {
//!     #[column(primary_key)]
//!     x: i32,
//!     #[column(primary_key)]
//!     y: i32,
//! }
//!
//! let registry = SchemaRegistry::new();
//! let converter = Converter::new(&registry);
//! let tables = converter.create_required_tables::<Point>(&Site::default()).unwrap();
//! let rendered = tables[0].to_sql(&GenericDialect, &Site::default()).unwrap();
//! assert_eq!(
//!     rendered.sql,
//!     "CREATE TABLE IF NOT EXISTS points (x INTEGER NOT NULL, y INTEGER NOT NULL, PRIMARY KEY (x, y))"
//! );
//! ```

pub mod ast;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod convert;
pub mod dialect;
pub mod error;
pub mod identifier;
pub mod schema;
pub mod session;
pub mod value;

pub use ast::{BooleanExpr, Expr, Node, NumberExpr, SqlType, Statement, StringExpr};
pub use catalog::{SchemaRegistry, Site, Table};
pub use codec::{Decoder, Encoder};
pub use config::PersistConfig;
pub use convert::Converter;
pub use dialect::{Dialect, GenericDialect, RenderedSql, SqliteDialect, Unparse};
pub use error::{PersistError, Result};
pub use schema::{Dependents, Persist, Ref, Storable};
pub use session::{Connection, Session};
pub use value::{SqlValue, ToSqlValue};
