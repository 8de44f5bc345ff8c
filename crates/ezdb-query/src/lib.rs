//! # ezdb-query
//!
//! Parameterized SQL templates and query execution for embedded analytical
//! databases.
//!
//! A [`Query`] is an immutable template with named `$placeholders` bound to
//! values: scalars, strings, paths, nested queries, and in-memory Arrow
//! [`Table`]s. Rendering turns it into plain SQL text; collecting its tables
//! yields every dataset that has to be registered with the engine before the
//! text can run.
//!
//! ## Architecture
//!
//! - **Query**: template + bindings, `render()` and `collect_tables()`
//! - **Binding**: closed set of value kinds that can be substituted
//! - **Engine / Connection**: traits a database backend implements
//! - **Session**: opens configured connections and runs queries on them
//!
//! ## Example
//!
//! ```rust
//! use ezdb_query::sql;
//!
//! # fn example() -> ezdb_query::Result<()> {
//! let active = sql!("SELECT * FROM users WHERE active = $active", active = true)?;
//! let query = sql!(
//!     "SELECT name FROM ($active) AS u WHERE name = $name",
//!     active = active,
//!     name = "O'Brien",
//! )?;
//!
//! assert_eq!(
//!     query.render()?,
//!     "SELECT name FROM (SELECT * FROM users WHERE active = true) AS u WHERE name = 'O''Brien'"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Backend Implementation
//!
//! 1. Create a connection type that implements [`Connection`]
//! 2. Create a factory that implements [`Engine`]
//! 3. Wrap it in a [`Session`] with a [`SessionConfig`]
//!
//! Backend crates:
//! - `ezdb-query-duckdb` - DuckDB implementation

pub mod binding;
pub mod config;
pub mod error;
pub mod escape;
pub mod path;
pub mod query;
pub mod result;
pub mod session;
pub mod table;
pub mod traits;

pub use binding::Binding;
pub use config::{DbLocation, RemoteStorageConfig, SessionConfig};
pub use error::{QueryError, Result};
pub use path::StoragePath;
pub use query::{Query, QueryBuilder};
pub use result::{DataRow, FieldDef, FieldType, QueryResult, QueryStats};
pub use session::{ConnectionGuard, Session};
pub use table::Table;
pub use traits::{Connection, Engine};

/// Arrow types used by [`Table`] and [`QueryResult`]
pub use arrow;
