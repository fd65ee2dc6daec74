use async_trait::async_trait;

use seedbed_core::{ColumnKind, Value};

use crate::error::StoreResult;
use crate::statement::InsertStatement;

/// One live database connection, exclusively owned by a run.
///
/// Statements run in autocommit mode unless a transaction was opened with
/// [`Store::begin`].
#[async_trait]
pub trait Store: Send {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    async fn begin(&mut self) -> StoreResult<()>;

    async fn commit(&mut self) -> StoreResult<()>;

    async fn rollback(&mut self) -> StoreResult<()>;

    /// Execute a parameterized insert and return the number of affected rows.
    async fn execute(&mut self, statement: &InsertStatement) -> StoreResult<u64>;

    /// Load the existing values of `column` from `table`, ordered by value.
    async fn fetch_ids(
        &mut self,
        table: &str,
        column: &str,
        kind: &ColumnKind,
    ) -> StoreResult<Vec<Value>>;

    /// Release the connection. Further calls fail with a connection error.
    async fn close(&mut self) -> StoreResult<()>;
}

/// Factory for [`Store`] connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable target with secrets redacted.
    fn describe(&self) -> String;

    async fn connect(&self) -> StoreResult<Box<dyn Store>>;
}
