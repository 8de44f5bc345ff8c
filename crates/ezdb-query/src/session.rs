//! Connection setup and query execution on top of an [`Engine`]

use crate::config::SessionConfig;
use crate::error::{QueryError, Result};
use crate::query::Query;
use crate::result::QueryResult;
use crate::traits::{Connection, Engine};
use std::ops::{Deref, DerefMut};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Opens configured connections and runs queries on them.
///
/// A session holds no connection itself: every [`Session::query`] call and
/// every [`Session::connect`] guard gets a fresh one, which is closed when the
/// call returns or the guard goes away.
#[derive(Debug, Clone)]
pub struct Session<E: Engine> {
    engine: E,
    config: SessionConfig,
}

impl<E: Engine> Session<E> {
    pub fn new(engine: E, config: SessionConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a connection and apply remote storage setup and init SQL.
    ///
    /// Setup runs in a fixed order: extensions, credentials, then the
    /// configured `options`, so user SQL can override the defaults. Any failure
    /// closes the connection and is reported as
    /// [`QueryError::ConnectionFailed`].
    pub fn connect(&self) -> Result<ConnectionGuard<E::Connection>> {
        debug!(
            engine = self.engine.engine_type(),
            location = %self.config.location,
            "Opening connection"
        );

        let conn = self.engine.open(&self.config.location).map_err(|e| {
            error!("Failed to open {}: {}", self.config.location, e);
            match e {
                QueryError::ConnectionFailed(_) => e,
                other => QueryError::connection_failed(other.to_string()),
            }
        })?;

        let mut guard = ConnectionGuard::new(conn);
        self.prepare(&mut *guard)?;
        Ok(guard)
    }

    fn prepare(&self, conn: &mut E::Connection) -> Result<()> {
        let remote = &self.config.remote_storage;

        if remote.enabled {
            for statement in remote.extension_statements()? {
                debug!("Loading extension: {}", statement);
                conn.execute_batch(&statement)
                    .map_err(|e| setup_failed("extension setup", e))?;
            }

            debug!("Loading credentials for profile '{}'", remote.profile);
            conn.execute_batch(&remote.credentials_statement())
                .map_err(|e| setup_failed("credential loading", e))?;
        }

        if !self.config.options.trim().is_empty() {
            debug!("Applying connection options");
            conn.execute_batch(&self.config.options)
                .map_err(|e| setup_failed("connection options", e))?;
        }

        Ok(())
    }

    /// Run `query` on a fresh connection.
    ///
    /// Every table the query references is registered under its alias before
    /// the rendered SQL is executed. Returns `None` when the statement has no
    /// result set. The connection is closed on every path.
    pub fn query(&self, query: &Query) -> Result<Option<QueryResult>> {
        let mut conn = self.connect()?;

        let tables = query.collect_tables();
        for (alias, table) in &tables {
            debug!(rows = table.num_rows(), "Registering table {}", alias);
            conn.register(alias, table)?;
        }

        let sql = query.render()?;
        debug!(tables = tables.len(), "Executing query: {}", sql);

        let start = Instant::now();
        let result = conn.execute(&sql)?;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            rows = ?result.as_ref().map(|r| r.row_count()),
            "Query finished"
        );

        conn.close()?;
        Ok(result)
    }

    /// Run a literal SQL string with no bindings
    pub fn execute(&self, sql: &str) -> Result<Option<QueryResult>> {
        self.query(&Query::new(sql))
    }

    /// Run `f` with a raw connection that is closed afterwards, whether `f`
    /// succeeds, fails, or panics.
    ///
    /// No tables are registered and nothing is rendered; this is direct
    /// engine access.
    pub fn with_connection<T, Err, F>(&self, f: F) -> std::result::Result<T, Err>
    where
        F: FnOnce(&mut E::Connection) -> std::result::Result<T, Err>,
        Err: From<QueryError>,
    {
        let mut guard = self.connect()?;
        let value = f(&mut *guard)?;
        guard.close()?;
        Ok(value)
    }
}

fn setup_failed(step: &str, err: QueryError) -> QueryError {
    error!("Connection {} failed: {}", step, err);
    match err {
        QueryError::ConnectionFailed(_) | QueryError::InvalidConfiguration(_) => err,
        other => QueryError::connection_failed(format!("{} failed: {}", step, other)),
    }
}

/// An open connection that is closed when dropped.
///
/// Use [`ConnectionGuard::close`] to observe close errors; on drop they are
/// only logged.
pub struct ConnectionGuard<C: Connection> {
    conn: Option<C>,
}

impl<C: Connection> ConnectionGuard<C> {
    pub fn new(conn: C) -> Self {
        Self { conn: Some(conn) }
    }

    /// Close the connection and report any failure
    pub fn close(mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => {
                debug!("Closing connection");
                conn.close()
            }
            None => Ok(()),
        }
    }
}

impl<C: Connection> Deref for ConnectionGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn
            .as_ref()
            .expect("connection is present until the guard is consumed")
    }
}

impl<C: Connection> DerefMut for ConnectionGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn
            .as_mut()
            .expect("connection is present until the guard is consumed")
    }
}

impl<C: Connection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("Closing connection on drop");
            if let Err(e) = conn.close() {
                warn!("Failed to close connection: {}", e);
            }
        }
    }
}
