//! Ergonomic async facade over an embedded SQLite database.
//!
//! # Intention
//!
//! - Provide a unified API for table management, row CRUD, and schema
//!   introspection over a single SQLite connection.
//! - Keep row values parameter-bound at all times; table names, column
//!   definitions, and raw conditions are caller-trusted SQL text.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - No business logic or unrelated utilities.

pub mod error;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use sqlite::{
    AlterOperation, ColumnInfo, Row, SqliteStore, StoreConfig, TableInfo, Value, DEFAULT_DB_PATH,
};
