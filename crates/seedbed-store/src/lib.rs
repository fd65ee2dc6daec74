//! Storage backends for seedbed.
//!
//! A [`Connector`] opens one exclusive [`Store`] connection per run. The
//! PostgreSQL backend binds every value as a parameter; the in-memory backend
//! backs dry runs and tests.

pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod statement;
pub mod store;

pub use config::{ConnectionConfig, RedactedConnection};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryConnector, MemoryStore, RejectPredicate, StoredRow};
pub use postgres::{PgConnector, PgStore};
pub use statement::{InsertStatement, MAX_BIND_PARAMS, StatementColumn, rows_per_statement};
pub use store::{Connector, Store};
