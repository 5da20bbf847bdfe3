/// # Test Utilities Module
///
/// Fixtures for unit tests: each `TempDatabase` is a fresh database file in
/// its own temporary directory, removed when the fixture is dropped.

use crate::core::db::Database;
use crate::core::{LiteError, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Standard schema used across the unit tests
pub const USERS_SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT,
        age INTEGER
    );
";

/// Isolated on-disk database test fixture
pub struct TempDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl TempDatabase {
    /// Create an empty database file
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test.db");
        Connection::open(&path).map_err(|e| LiteError::connection("Failed to create test database", e))?;

        Ok(TempDatabase { _dir: dir, path })
    }

    /// Create a database holding the standard `users` table
    pub fn with_users() -> Result<Self> {
        let fixture = Self::new()?;
        fixture.execute_batch(USERS_SCHEMA)?;
        Ok(fixture)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run setup SQL through a separate raw connection
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = Connection::open(&self.path)
            .map_err(|e| LiteError::connection("Failed to open test database", e))?;
        conn.execute_batch(sql)
            .map_err(|e| LiteError::query("Failed to run fixture SQL", e))
    }

    /// An open `Database` handle on this fixture
    pub fn open(&self) -> Result<Database> {
        let mut db = Database::new(&self.path);
        db.open()?;
        Ok(db)
    }
}
