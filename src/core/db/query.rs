/// Query Execution Module
///
/// The CRUD surface of [`Database`]: reads return ordered [`Record`]s, writes
/// bind every value as a parameter and report the row id or the number of
/// rows affected.
///
/// No write forces a commit. Outside an explicit transaction SQLite commits
/// each statement on its own; inside one, the statement joins it.

use super::builder::{self, ColumnValues, RowScope, Statement};
use super::connection::Database;
use super::schema::{self, Column};
use crate::core::{LiteError, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, Params};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, error};

/// A single column value as stored by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// One result row: column names mapped to values, in select-list order.
/// Column names are unique; a repeated name keeps its first value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    /// Pairs `columns` with `values` positionally.
    pub fn new(columns: &[String], values: Vec<Value>) -> Self {
        columns.iter().cloned().zip(values).collect()
    }

    fn push(&mut self, column: String, value: Value) {
        if self.get(&column).is_none() {
            self.entries.push((column, value));
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::default();
        for (column, value) in iter {
            record.push(column.into(), value.into());
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in &self.entries {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// A SELECT under construction. Created by [`Database::select`], run with
/// [`SelectQuery::fetch`].
#[must_use = "a select does nothing until fetch() is called"]
pub struct SelectQuery<'db> {
    db: &'db Database,
    table: String,
    fields: Option<Vec<String>>,
    filters: ColumnValues,
    order_by: Option<String>,
    group_by: Option<String>,
}

impl<'db> SelectQuery<'db> {
    /// Restricts the result to these columns, in this order. Without it,
    /// every declared column of the table is returned. Repeats are dropped.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for field in fields.into_iter().map(Into::into) {
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        self.fields = Some(unique);
        self
    }

    /// Adds an equality condition; conditions are joined with AND.
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.set(column, value);
        self
    }

    /// Adds several equality conditions at once.
    pub fn filters(mut self, filters: impl Into<ColumnValues>) -> Self {
        let filters: ColumnValues = filters.into();
        for (column, value) in filters.iter() {
            self.filters.set(column, value);
        }
        self
    }

    /// Appends `ORDER BY <expr>`. The expression is used verbatim and must
    /// not come from untrusted input.
    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order_by = Some(expr.into());
        self
    }

    /// Appends `GROUP BY <expr>`. The expression is used verbatim and must
    /// not come from untrusted input.
    pub fn group_by(mut self, expr: impl Into<String>) -> Self {
        self.group_by = Some(expr.into());
        self
    }

    /// Executes the query and returns every matching row.
    ///
    /// # Errors
    ///
    /// `NotConnected` without a connection; `LiteError::Query` for an
    /// unknown table or any failure reported by the engine. A failure never
    /// yields a partial result.
    pub fn fetch(self) -> Result<Vec<Record>> {
        let conn = self.db.connection()?;

        let fields = match self.fields {
            Some(fields) => fields,
            None => schema::table_columns(conn, &self.table)?
                .into_iter()
                .map(|c| c.name)
                .collect(),
        };

        let stmt = builder::select(
            &self.table,
            &fields,
            &self.filters,
            self.group_by.as_deref(),
            self.order_by.as_deref(),
        )?;

        fetch_records(conn, &stmt, &fields)
    }
}

impl Database {
    /// Starts a SELECT against `table`.
    ///
    /// # Examples
    ///
    /// ```
    /// use litecrud::Database;
    ///
    /// Database::scoped(":memory:", |db| {
    ///     db.custom_query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", false)?;
    ///     db.insert("users", [("name", "alice")])?;
    ///
    ///     let rows = db.select("users").fields(["id", "name"]).filter("name", "alice").fetch()?;
    ///     assert_eq!(rows[0].get("id").and_then(|v| v.as_i64()), Some(1));
    ///     Ok(())
    /// })?;
    /// # Ok::<(), litecrud::LiteError>(())
    /// ```
    pub fn select(&self, table: impl Into<String>) -> SelectQuery<'_> {
        SelectQuery {
            db: self,
            table: table.into(),
            fields: None,
            filters: ColumnValues::new(),
            order_by: None,
            group_by: None,
        }
    }

    /// Inserts one row and returns the row id the engine assigned to it.
    pub fn insert(&self, table: &str, values: impl Into<ColumnValues>) -> Result<i64> {
        let conn = self.connection()?;
        let stmt = builder::insert(table, &values.into())?;

        execute(conn, &stmt)?;
        let id = conn.last_insert_rowid();
        debug!("Inserted row {} into {}", id, table);
        Ok(id)
    }

    /// Updates the rows selected by `scope` and returns how many changed.
    pub fn update(&self, table: &str, values: impl Into<ColumnValues>, scope: RowScope) -> Result<usize> {
        let conn = self.connection()?;
        let stmt = builder::update(table, &values.into(), &scope)?;
        execute(conn, &stmt)
    }

    /// Deletes the rows selected by `scope` and returns how many went.
    pub fn delete(&self, table: &str, scope: RowScope) -> Result<usize> {
        let conn = self.connection()?;
        let stmt = builder::delete(table, &scope)?;
        execute(conn, &stmt)
    }

    /// Runs caller-supplied SQL verbatim. The text may hold several
    /// statements; any rows they produce are discarded.
    ///
    /// With `commit` set, a transaction left open by the text (or opened
    /// earlier with [`Database::start_transaction`]) is committed afterwards.
    pub fn custom_query(&self, sql: &str, commit: bool) -> Result<()> {
        let conn = self.connection()?;

        debug!(sql, "Executing custom query");
        conn.execute_batch(sql).map_err(|e| {
            error!("Custom query failed: {}", e);
            LiteError::query("Query execution failed", e)
        })?;

        if commit && !conn.is_autocommit() {
            conn.execute_batch("COMMIT")
                .map_err(|e| LiteError::query("Failed to commit transaction", e))?;
        }
        Ok(())
    }

    /// Runs a caller-supplied read with bound parameters and returns its
    /// rows keyed by the statement's result column names.
    pub fn custom_select<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Record>> {
        let conn = self.connection()?;

        debug!(sql, "Executing custom select");
        let mut prepared = conn
            .prepare(sql)
            .map_err(|e| LiteError::query("Failed to prepare statement", e))?;
        let columns: Vec<String> = prepared.column_names().into_iter().map(String::from).collect();

        collect_records(&mut prepared, params, &columns)
    }

    /// Names of all user tables, sorted.
    pub fn tables(&self) -> Result<Vec<String>> {
        schema::table_names(self.connection()?)
    }

    /// Declared columns of `table`, in declaration order.
    pub fn columns(&self, table: &str) -> Result<Vec<Column>> {
        schema::table_columns(self.connection()?, table)
    }
}

fn execute(conn: &Connection, stmt: &Statement) -> Result<usize> {
    debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing statement");
    conn.execute(&stmt.sql, params_from_iter(stmt.params.iter()))
        .map_err(|e| {
            error!("Statement failed: {}", e);
            LiteError::query("Query execution failed", e)
        })
}

fn fetch_records(conn: &Connection, stmt: &Statement, fields: &[String]) -> Result<Vec<Record>> {
    debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing select");
    let mut prepared = conn
        .prepare(&stmt.sql)
        .map_err(|e| LiteError::query("Failed to prepare statement", e))?;

    collect_records(&mut prepared, params_from_iter(stmt.params.iter()), fields)
}

fn collect_records<P: Params>(
    prepared: &mut rusqlite::Statement<'_>,
    params: P,
    columns: &[String],
) -> Result<Vec<Record>> {
    let column_count = prepared.column_count();

    prepared
        .query_map(params, |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(Value::from(row.get_ref(i)?));
            }
            Ok(Record::new(columns, values))
        })
        .map_err(|e| LiteError::query("Query execution failed", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| LiteError::query("Result processing failed", e))
}
