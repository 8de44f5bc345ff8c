//! DuckDB driver for ezdb-query
//!
//! Implements the `Engine` and `Connection` traits on top of an embedded
//! DuckDB database.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ezdb_query::{sql, SessionConfig};
//! use ezdb_query_duckdb::DuckDbEngine;
//!
//! # fn example() -> ezdb_query::Result<()> {
//! let session = DuckDbEngine::session(SessionConfig::new());
//! let query = sql!("SELECT $a + $b AS total", a = 1, b = 2)?;
//!
//! if let Some(result) = session.query(&query)? {
//!     println!("{}", result.pretty()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod statement;

use duckdb::vtab::arrow::ArrowVTab;
use duckdb::vtab::arrow_recordbatch_to_query_params;
use duckdb::{AccessMode, Config};
use ezdb_query::arrow::record_batch::RecordBatch;
use ezdb_query::escape::quote_identifier;
use ezdb_query::{
    Connection, DbLocation, Engine, QueryError, QueryResult, Result, Session, SessionConfig, Table,
};
use std::time::Instant;
use tracing::{debug, error};

pub use statement::{returns_rows, split_statements};

/// Name under which the Arrow scan table function is registered
const ARROW_SCAN_FUNCTION: &str = "ezdb_arrow_scan";

/// A session backed by DuckDB
pub type DuckDbSession = Session<DuckDbEngine>;

/// Opens DuckDB connections
#[derive(Debug, Clone, Default)]
pub struct DuckDbEngine {
    read_only: bool,
}

impl DuckDbEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open file databases in read-only mode
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Create a session using a default engine
    pub fn session(config: SessionConfig) -> DuckDbSession {
        Session::new(Self::default(), config)
    }
}

impl Engine for DuckDbEngine {
    type Connection = DuckDbConnection;

    fn engine_type(&self) -> &'static str {
        "duckdb"
    }

    fn open(&self, location: &DbLocation) -> Result<DuckDbConnection> {
        debug!("Opening DuckDB database: {}", location);

        let conn = match location {
            DbLocation::InMemory => {
                if self.read_only {
                    return Err(QueryError::invalid_configuration(
                        "an in-memory database cannot be opened read-only",
                    ));
                }
                duckdb::Connection::open_in_memory()
            }
            DbLocation::File(path) => {
                let mut config = Config::default();
                if self.read_only {
                    config = config
                        .access_mode(AccessMode::ReadOnly)
                        .map_err(|e| QueryError::invalid_configuration(e.to_string()))?;
                }
                duckdb::Connection::open_with_flags(path, config)
            }
        }
        .map_err(|e| {
            error!("Failed to open DuckDB database {}: {}", location, e);
            QueryError::connection_failed(format!("DuckDB open failed: {}", e))
        })?;

        Ok(DuckDbConnection {
            conn,
            arrow_scan_registered: false,
        })
    }
}

/// An open DuckDB connection
pub struct DuckDbConnection {
    conn: duckdb::Connection,
    arrow_scan_registered: bool,
}

impl DuckDbConnection {
    /// The underlying DuckDB connection
    pub fn inner(&self) -> &duckdb::Connection {
        &self.conn
    }

    fn ensure_arrow_scan(&mut self) -> duckdb::Result<()> {
        if !self.arrow_scan_registered {
            self.conn
                .register_table_function::<ArrowVTab>(ARROW_SCAN_FUNCTION)?;
            self.arrow_scan_registered = true;
        }
        Ok(())
    }

    fn insert_batch(&self, alias: &str, batch: RecordBatch) -> duckdb::Result<usize> {
        let sql = format!(
            "INSERT INTO {} SELECT * FROM {}(?, ?)",
            quote_identifier(alias),
            ARROW_SCAN_FUNCTION
        );
        let params = arrow_recordbatch_to_query_params(batch);
        self.conn.execute(&sql, params)
    }
}

impl Connection for DuckDbConnection {
    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(|e| {
            error!("DuckDB batch failed: {}", e);
            QueryError::execution_failed(e.to_string())
        })
    }

    /// Run every statement of `sql`; the result is that of the last one
    fn execute(&mut self, sql: &str) -> Result<Option<QueryResult>> {
        let start = Instant::now();

        let statements = split_statements(sql);
        let Some((last, leading)) = statements.split_last() else {
            debug!("Nothing to execute");
            return Ok(None);
        };

        if !leading.is_empty() {
            debug!("Running {} leading statements", leading.len());
            self.execute_batch(&leading.join(";\n"))?;
        }

        if !returns_rows(last) {
            self.execute_batch(last)?;
            debug!("Statement completed without a result set");
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(last).map_err(|e| {
            error!("Failed to prepare query: {}", e);
            QueryError::execution_failed(e.to_string())
        })?;
        let arrow = stmt.query_arrow([]).map_err(|e| {
            error!("Query execution failed: {}", e);
            QueryError::execution_failed(e.to_string())
        })?;

        let schema = arrow.get_schema();
        let batches: Vec<RecordBatch> = arrow.collect();
        let result = QueryResult::new(schema, batches, start.elapsed().as_millis() as u64);

        debug!(
            "Query returned {} rows in {}ms",
            result.row_count(),
            result.stats().execution_ms
        );
        Ok(Some(result))
    }

    fn register(&mut self, alias: &str, table: &Table) -> Result<()> {
        let ddl = schema::create_table_sql(alias, &table.schema())
            .map_err(|msg| QueryError::registration_failed(alias, msg))?;

        let registration_error = |e: duckdb::Error| {
            error!("Failed to register table {}: {}", alias, e);
            QueryError::registration_failed(alias, e.to_string())
        };

        self.ensure_arrow_scan().map_err(registration_error)?;
        self.conn.execute_batch(&ddl).map_err(registration_error)?;

        let mut inserted = 0;
        for batch in table.batches() {
            if batch.num_rows() == 0 {
                continue;
            }
            inserted += self
                .insert_batch(alias, batch.clone())
                .map_err(registration_error)?;
        }

        debug!("Registered table {} with {} rows", alias, inserted);
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| {
            error!("Failed to close DuckDB connection: {}", e);
            QueryError::CloseFailed(e.to_string())
        })
    }
}
