//! litecrud: a small statement-builder facade over a single-file SQLite
//! database.
//!
//! A [`Database`] handle owns at most one connection. Reads go through
//! [`Database::select`], writes through [`Database::insert`],
//! [`Database::update`] and [`Database::delete`], and anything the builders
//! cannot express through [`Database::custom_query`] or
//! [`Database::custom_select`]. Values are always bound as parameters.

// Core infrastructure modules
pub mod config;
pub mod core;

#[cfg(test)]
mod test_utils;

pub use crate::config::{Config, DatabaseConfig};
pub use crate::core::db::{
    Column, ColumnValues, Database, Record, RowScope, SelectQuery, Statement, TransactionState,
    Value,
};
pub use crate::core::{LiteError, Result};
