/// Core Module for litecrud
///
/// This module contains the database facade and the error type every
/// operation reports through.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{LiteError, Result};
