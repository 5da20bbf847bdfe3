/// Schema Introspection Module
///
/// Reads declared table structure from the engine. Reads that omit a field
/// list use this to expand to every column, in declaration order.

use crate::core::{LiteError, Result};
use rusqlite::{Connection, Row};

/// A declared table column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type name (e.g. "INTEGER", "TEXT"); empty when untyped
    pub type_name: String,
    /// Whether the column is declared NOT NULL
    pub notnull: bool,
    /// Whether this column is part of the primary key
    pub pk: bool,
    /// Default value expression (if any)
    pub dflt_value: Option<String>,
}

impl Column {
    /// Creates a Column from a `table_info` pragma row
    fn from_pragma_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Column {
            name: row.get(1)?,
            type_name: row.get(2)?,
            notnull: row.get(3)?,
            dflt_value: row.get(4)?,
            pk: row.get(5)?,
        })
    }
}

/// Returns the declared columns of `table` in declaration order.
///
/// An unknown table has no columns and is reported as a query error.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<Column>> {
    let mut stmt = conn
        .prepare(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk
             FROM pragma_table_info(?1) ORDER BY cid",
        )
        .map_err(|e| LiteError::query("Failed to prepare schema lookup", e))?;

    let columns = stmt
        .query_map([table], |row| Column::from_pragma_row(row))
        .map_err(|e| LiteError::query("Schema lookup failed", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| LiteError::query("Schema lookup failed", e))?;

    if columns.is_empty() {
        return Err(LiteError::invalid(format!("no such table: {}", table)));
    }

    Ok(columns)
}

/// Returns the names of all user-defined tables, sorted by name.
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .map_err(|e| LiteError::query("Failed to prepare table listing", e))?;

    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| LiteError::query("Table listing failed", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| LiteError::query("Table listing failed", e))?;

    Ok(names)
}
