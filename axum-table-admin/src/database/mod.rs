//! Database abstraction layer
//!
//! This module provides a database-agnostic interface for statement
//! execution, transactions and catalog introspection.

pub mod dialect;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mysql")]
pub mod mysql;

// Re-export the main trait
pub use dialect::Dialect;
pub use traits::{DatabaseError, DatabaseProvider, ExecuteOutcome};
