/// Database Module
///
/// This module provides the statement-construction and execution layer,
/// organized into focused submodules.
///
/// ## Architecture
///
/// - **Connection Management** (`connection.rs`): the `Database` handle, its lifecycle and transactions
/// - **Statement Builders** (`builder.rs`): pure functions turning tables, fields and filters into SQL plus bound parameters
/// - **Query Execution** (`query.rs`): the CRUD operations and the `Record`/`Value` result types
/// - **Schema Introspection** (`schema.rs`): declared column lists used when a read omits its fields
///
/// ## Error Handling
///
/// All database operations use `LiteError`. A missing connection is always a
/// connection error; anything the engine rejects is a query error.
pub mod builder;
pub mod connection;
pub mod query;
pub mod schema;

pub use builder::{ColumnValues, RowScope, Statement};
pub use connection::*;
pub use query::*;
pub use schema::*;
