use crate::config::DbLocation;
use crate::error::Result;
use crate::result::QueryResult;
use crate::table::Table;

/// Factory for physical connections to an embedded database engine
pub trait Engine {
    type Connection: Connection;

    /// Get the type name of this engine
    fn engine_type(&self) -> &'static str;

    /// Open a new connection at `location`
    fn open(&self, location: &DbLocation) -> Result<Self::Connection>;
}

/// An open connection to the engine.
///
/// Implementations map engine failures onto the matching
/// [`QueryError`](crate::QueryError) variant: `ConnectionFailed` for setup
/// statements, `RegistrationFailed` for `register`, `ExecutionFailed` for
/// `execute`, `CloseFailed` for `close`.
pub trait Connection {
    /// Run one or more statements, discarding any rows they produce
    fn execute_batch(&mut self, sql: &str) -> Result<()>;

    /// Run a statement.
    ///
    /// Returns `None` when the statement has no result set (DDL, `SET`,
    /// `INSERT` without `RETURNING`, ...), and a possibly empty result otherwise.
    fn execute(&mut self, sql: &str) -> Result<Option<QueryResult>>;

    /// Make `table` visible to later statements under `alias`
    fn register(&mut self, alias: &str, table: &Table) -> Result<()>;

    /// Close the connection gracefully
    fn close(self) -> Result<()>;
}
