/// Statement Builders
///
/// Pure functions that turn a table name, field lists and column/value pairs
/// into SQL text plus the parameters to bind against it. Identifiers are
/// double-quoted with embedded quotes doubled; values never appear in the
/// text, only as numbered `?N` placeholders.
///
/// Only equality conjunctions are expressible here. Anything needing OR,
/// ranges, LIKE or IN goes through `Database::custom_query` or
/// `Database::custom_select`.

use crate::core::{LiteError, Result};
use std::collections::{BTreeMap, HashMap};

/// SQL text together with the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

/// Ordered column/value pairs, used both as filters and as assignments.
///
/// Setting a column twice keeps its first position and the last value,
/// matching how a map literal behaves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnValues {
    pairs: Vec<(String, String)>,
}

impl ColumnValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `column`, returning the updated set.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Adds or replaces `column` in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(c, _)| *c == column) {
            Some(existing) => existing.1 = value,
            None => self.pairs.push((column, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ColumnValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = ColumnValues::new();
        for (column, value) in iter {
            values.set(column, value);
        }
        values
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for ColumnValues {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for ColumnValues {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<HashMap<String, String>> for ColumnValues {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for ColumnValues {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Which rows an UPDATE or DELETE touches.
///
/// Affecting a whole table has to be asked for by name; an empty
/// `Matching` filter is rejected rather than read as "everything".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowScope {
    /// Rows where every listed column equals its value
    Matching(ColumnValues),
    /// Every row in the table
    AllRows,
}

impl RowScope {
    pub fn matching(filters: impl Into<ColumnValues>) -> Self {
        RowScope::Matching(filters.into())
    }
}

/// Quotes an identifier for SQLite, doubling embedded double quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Builds `SELECT "f1", "f2" FROM "table"`.
pub fn select_clause(table: &str, fields: &[String]) -> Result<String> {
    if fields.is_empty() {
        return Err(LiteError::invalid(format!(
            "Cannot select from {} without any fields",
            quote_identifier(table)
        )));
    }

    let columns: Vec<String> = fields.iter().map(|f| quote_identifier(f)).collect();
    Ok(format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        quote_identifier(table)
    ))
}

/// Builds `WHERE "k1" = ?N AND "k2" = ?N+1`, numbering placeholders from
/// `first_placeholder`. Returns `None` for an empty filter set.
pub fn where_clause(filters: &ColumnValues, first_placeholder: usize) -> Option<(String, Vec<String>)> {
    if filters.is_empty() {
        return None;
    }

    let mut conditions = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());
    for (idx, (column, value)) in filters.iter().enumerate() {
        conditions.push(format!(
            "{} = ?{}",
            quote_identifier(column),
            first_placeholder + idx
        ));
        params.push(value.to_string());
    }

    Some((format!("WHERE {}", conditions.join(" AND ")), params))
}

/// Builds a full SELECT. GROUP BY and ORDER BY are appended verbatim, in
/// that order; they are caller-controlled expressions and are not escaped.
pub fn select(
    table: &str,
    fields: &[String],
    filters: &ColumnValues,
    group_by: Option<&str>,
    order_by: Option<&str>,
) -> Result<Statement> {
    let mut sql = select_clause(table, fields)?;
    let mut params = Vec::new();

    if let Some((clause, values)) = where_clause(filters, 1) {
        sql.push(' ');
        sql.push_str(&clause);
        params = values;
    }
    if let Some(group_by) = group_by {
        sql.push_str(" GROUP BY ");
        sql.push_str(group_by);
    }
    if let Some(order_by) = order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }

    Ok(Statement { sql, params })
}

/// Builds `INSERT INTO "t" ("a", "b") VALUES (?1, ?2)`.
pub fn insert(table: &str, values: &ColumnValues) -> Result<Statement> {
    if values.is_empty() {
        return Err(LiteError::invalid(format!(
            "Cannot insert into {} without any values",
            quote_identifier(table)
        )));
    }

    let mut columns = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    let mut params = Vec::with_capacity(values.len());
    for (idx, (column, value)) in values.iter().enumerate() {
        columns.push(quote_identifier(column));
        placeholders.push(format!("?{}", idx + 1));
        params.push(value.to_string());
    }

    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns.join(", "),
            placeholders.join(", ")
        ),
        params,
    })
}

/// Builds `UPDATE "t" SET "a" = ?1, "b" = ?2 [WHERE ...]`.
pub fn update(table: &str, values: &ColumnValues, scope: &RowScope) -> Result<Statement> {
    if values.is_empty() {
        return Err(LiteError::invalid(format!(
            "Cannot update {} without any values",
            quote_identifier(table)
        )));
    }

    let mut assignments = Vec::with_capacity(values.len());
    let mut params = Vec::with_capacity(values.len());
    for (idx, (column, value)) in values.iter().enumerate() {
        assignments.push(format!("{} = ?{}", quote_identifier(column), idx + 1));
        params.push(value.to_string());
    }

    let mut sql = format!(
        "UPDATE {} SET {}",
        quote_identifier(table),
        assignments.join(", ")
    );
    if let Some((clause, filter_params)) = scope_clause(table, scope, params.len() + 1)? {
        sql.push(' ');
        sql.push_str(&clause);
        params.extend(filter_params);
    }

    Ok(Statement { sql, params })
}

/// Builds `DELETE FROM "t" [WHERE ...]`.
pub fn delete(table: &str, scope: &RowScope) -> Result<Statement> {
    let mut sql = format!("DELETE FROM {}", quote_identifier(table));
    let mut params = Vec::new();

    if let Some((clause, filter_params)) = scope_clause(table, scope, 1)? {
        sql.push(' ');
        sql.push_str(&clause);
        params = filter_params;
    }

    Ok(Statement { sql, params })
}

fn scope_clause(
    table: &str,
    scope: &RowScope,
    first_placeholder: usize,
) -> Result<Option<(String, Vec<String>)>> {
    match scope {
        RowScope::AllRows => Ok(None),
        RowScope::Matching(filters) => match where_clause(filters, first_placeholder) {
            Some(clause) => Ok(Some(clause)),
            None => Err(LiteError::invalid(format!(
                "Refusing to modify every row of {} from an empty filter; use RowScope::AllRows",
                quote_identifier(table)
            ))),
        },
    }
}
