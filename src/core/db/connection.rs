/// Connection Management Module
///
/// This module provides the `Database` handle: one optional SQLite
/// connection, its open/close lifecycle, scoped acquisition and explicit
/// transaction control.
///
/// A handle is `Send` but not `Sync`. Share it between threads by moving it,
/// or by putting it behind a `Mutex` you own.

use crate::config::DatabaseConfig;
use crate::core::{LiteError, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
}

/// Handle to a single-file SQLite database.
///
/// Every operation except [`Database::open`] requires the handle to be open
/// and fails with [`LiteError::NotConnected`] otherwise. Dropping an open
/// handle closes it.
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    conn: Option<Connection>,
}

impl Database {
    /// Creates a closed handle for the database file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(DatabaseConfig::new(path.as_ref()))
    }

    /// Creates a closed handle using the given settings.
    pub fn with_config(config: DatabaseConfig) -> Self {
        Database { config, conn: None }
    }

    /// Opens a handle, runs `f` with it and closes it again on every exit
    /// path, including when `f` fails or panics.
    ///
    /// A failure to close is only reported when `f` itself succeeded.
    ///
    /// # Examples
    ///
    /// ```
    /// use litecrud::Database;
    ///
    /// let tables = Database::scoped(":memory:", |db| {
    ///     db.custom_query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", false)?;
    ///     db.tables()
    /// })?;
    /// assert_eq!(tables, vec!["users"]);
    /// # Ok::<(), litecrud::LiteError>(())
    /// ```
    pub fn scoped<T, F>(config: impl Into<DatabaseConfig>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        let mut db = Database::with_config(config.into());
        db.open()?;

        let outcome = f(&mut db);
        let closed = db.close();

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                error!("Failed to close database after error: {}", close_err);
                Err(err)
            }
        }
    }

    /// The settings this handle opens with.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// The database file this handle points at.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Checks if there's an active database connection
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens the connection, closing any connection already held first.
    ///
    /// Applies the configured `foreign_keys`, `busy_timeout` and
    /// `journal_mode` settings before returning.
    ///
    /// # Errors
    ///
    /// Returns `LiteError::Connection` if the file cannot be opened or a
    /// setting cannot be applied.
    pub fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            debug!("Reopening {:?}, closing the current connection first", self.config.path);
            self.close()?;
        }

        let path = &self.config.path;
        let conn = Connection::open(path)
            .map_err(|e| LiteError::connection(format!("Failed to open database {:?}", path), e))?;

        configure(&conn, &self.config)?;

        info!("Opened database {:?}", path);
        self.conn = Some(conn);
        Ok(())
    }

    /// Closes the connection if one is open. Calling this on a closed handle
    /// does nothing.
    ///
    /// A transaction left open is rolled back first.
    pub fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        if !conn.is_autocommit() {
            warn!("Closing {:?} with an open transaction, rolling back", self.config.path);
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                error!("Rollback before close failed: {}", e);
            }
        }

        conn.close().map_err(|(_, e)| {
            LiteError::connection(format!("Failed to close database {:?}", self.config.path), e)
        })?;

        info!("Closed database {:?}", self.config.path);
        Ok(())
    }

    /// Returns the live connection, or `NotConnected`.
    pub(crate) fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(LiteError::NotConnected)
    }

    /// Gets the current transaction state. A closed handle reports
    /// `Autocommit`.
    pub fn transaction_state(&self) -> TransactionState {
        match &self.conn {
            Some(conn) if !conn.is_autocommit() => TransactionState::Transaction,
            _ => TransactionState::Autocommit,
        }
    }

    /// Issues `BEGIN`. Transactions do not nest.
    ///
    /// # Errors
    ///
    /// `NotConnected` without a connection, `LiteError::Transaction` if a
    /// transaction is already in progress.
    pub fn start_transaction(&self) -> Result<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            return Err(LiteError::Transaction("Transaction already in progress".to_string()));
        }

        debug!("BEGIN");
        conn.execute_batch("BEGIN")
            .map_err(|e| LiteError::query("Failed to begin transaction", e))
    }

    /// Issues `COMMIT` for the transaction in progress.
    pub fn commit_transaction(&self) -> Result<()> {
        let conn = self.connection()?;
        if conn.is_autocommit() {
            return Err(LiteError::Transaction("No transaction in progress".to_string()));
        }

        debug!("COMMIT");
        conn.execute_batch("COMMIT")
            .map_err(|e| LiteError::query("Failed to commit transaction", e))
    }

    /// Issues `ROLLBACK` for the transaction in progress.
    pub fn rollback_transaction(&self) -> Result<()> {
        let conn = self.connection()?;
        if conn.is_autocommit() {
            return Err(LiteError::Transaction("No transaction in progress".to_string()));
        }

        debug!("ROLLBACK");
        conn.execute_batch("ROLLBACK")
            .map_err(|e| LiteError::query("Failed to roll back transaction", e))
    }

    /// Runs `f` inside a transaction: commits when it returns `Ok`, rolls
    /// back when it returns `Err` or panics.
    ///
    /// If `f` ends the transaction itself (commit or rollback), nothing else
    /// is issued.
    ///
    /// # Examples
    ///
    /// ```
    /// use litecrud::Database;
    ///
    /// Database::scoped(":memory:", |db| {
    ///     db.custom_query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", false)?;
    ///     db.transaction(|tx| {
    ///         tx.insert("users", [("name", "alice")])?;
    ///         tx.insert("users", [("name", "bob")])
    ///     })?;
    ///     assert_eq!(db.select("users").fetch()?.len(), 2);
    ///     Ok(())
    /// })?;
    /// # Ok::<(), litecrud::LiteError>(())
    /// ```
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        self.start_transaction()?;
        let mut guard = RollbackGuard::new(self.connection()?);

        let value = f(self)?;

        if self.transaction_state() == TransactionState::Transaction {
            self.commit_transaction()?;
        }
        guard.disarm();
        Ok(value)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close database on drop: {}", e);
        }
    }
}

/// Rolls back an open transaction when dropped, unless disarmed.
struct RollbackGuard<'a> {
    conn: &'a Connection,
    armed: bool,
}

impl<'a> RollbackGuard<'a> {
    fn new(conn: &'a Connection) -> Self {
        RollbackGuard { conn, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if self.armed && !self.conn.is_autocommit() {
            warn!("Transaction failed, rolling back");
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                error!("Automatic rollback failed: {}", e);
            }
        }
    }
}

fn configure(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)
        .map_err(|e| LiteError::connection("Failed to set foreign_keys", e))?;

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| LiteError::connection("Failed to set busy_timeout", e))?;

    if let Some(mode) = &config.journal_mode {
        let applied: String = conn
            .pragma_update_and_check(None, "journal_mode", mode.as_str(), |row| row.get(0))
            .map_err(|e| LiteError::connection("Failed to set journal_mode", e))?;
        debug!("journal_mode = {}", applied);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TempDatabase;

    #[test]
    fn test_open_and_close() {
        let mut db = Database::new(":memory:");
        assert!(!db.is_open());

        db.open().unwrap();
        assert!(db.is_open());
        assert_eq!(db.transaction_state(), TransactionState::Autocommit);

        db.close().unwrap();
        assert!(!db.is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut db = Database::new(":memory:");
        db.close().unwrap();

        db.open().unwrap();
        db.close().unwrap();
        db.close().unwrap();
    }

    #[test]
    fn test_reopen_replaces_connection() {
        let fixture = TempDatabase::with_users().unwrap();
        let mut db = fixture.open().unwrap();
        db.insert("users", [("name", "alice")]).unwrap();

        db.open().unwrap();
        assert!(db.is_open());
        assert_eq!(db.select("users").fetch().unwrap().len(), 1);
    }

    #[test]
    fn test_open_failure_is_connection_error() {
        let mut db = Database::new("/nonexistent/path/database.db");
        let err = db.open().unwrap_err();
        assert!(err.is_connection_error());
        assert!(matches!(err, LiteError::Connection { .. }));
        assert!(!db.is_open());
    }

    #[test]
    fn test_transaction_control_requires_connection() {
        let db = Database::new(":memory:");
        assert!(matches!(db.start_transaction(), Err(LiteError::NotConnected)));
        assert!(matches!(db.commit_transaction(), Err(LiteError::NotConnected)));
        assert!(matches!(db.rollback_transaction(), Err(LiteError::NotConnected)));
    }

    #[test]
    fn test_transaction_state_management() {
        let mut db = Database::new(":memory:");
        db.open().unwrap();

        db.start_transaction().unwrap();
        assert_eq!(db.transaction_state(), TransactionState::Transaction);

        // Transactions do not nest
        let nested = db.start_transaction().unwrap_err();
        assert!(matches!(nested, LiteError::Transaction(_)));
        assert!(nested.is_query_error());

        db.commit_transaction().unwrap();
        assert_eq!(db.transaction_state(), TransactionState::Autocommit);

        assert!(db.commit_transaction().unwrap_err().is_query_error());
        assert!(db.rollback_transaction().unwrap_err().is_query_error());
    }

    #[test]
    fn test_scoped_closes_on_error() {
        let result: Result<()> = Database::scoped(":memory:", |db| {
            assert!(db.is_open());
            Err(LiteError::invalid("boom"))
        });
        assert!(result.unwrap_err().is_query_error());
    }

    #[test]
    fn test_scoped_transaction_rolls_back_on_error() {
        let fixture = TempDatabase::with_users().unwrap();
        let db = fixture.open().unwrap();

        let result = db.transaction(|tx| {
            tx.insert("users", [("name", "alice")])?;
            tx.insert("no_such_table", [("name", "bob")])
        });

        assert!(result.unwrap_err().is_query_error());
        assert_eq!(db.transaction_state(), TransactionState::Autocommit);
        assert!(db.select("users").fetch().unwrap().is_empty());
    }

    #[test]
    fn test_scoped_transaction_tolerates_inner_commit() {
        let fixture = TempDatabase::with_users().unwrap();
        let db = fixture.open().unwrap();

        db.transaction(|tx| {
            tx.insert("users", [("name", "alice")])?;
            tx.commit_transaction()
        })
        .unwrap();

        assert_eq!(db.select("users").fetch().unwrap().len(), 1);
    }

    #[test]
    fn test_close_rolls_back_open_transaction() {
        let fixture = TempDatabase::with_users().unwrap();
        let mut db = fixture.open().unwrap();

        db.start_transaction().unwrap();
        db.insert("users", [("name", "alice")]).unwrap();
        db.close().unwrap();

        db.open().unwrap();
        assert!(db.select("users").fetch().unwrap().is_empty());
    }

    #[test]
    fn test_configured_pragmas_are_applied() {
        let fixture = TempDatabase::new().unwrap();
        let mut config = DatabaseConfig::new(fixture.path());
        config.journal_mode = Some("wal".to_string());
        config.foreign_keys = true;

        let mut db = Database::with_config(config);
        db.open().unwrap();

        let conn = db.connection().unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
        assert_eq!(mode, "wal");
        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
        assert_eq!(fk, 1);
    }
}
