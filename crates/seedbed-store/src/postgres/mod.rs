use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use tracing::debug;

use seedbed_core::{ColumnKind, Value};

use crate::config::ConnectionConfig;
use crate::error::{StoreError, StoreResult};
use crate::statement::{InsertStatement, quote_ident};
use crate::store::{Connector, Store};

mod bind;

/// Opens PostgreSQL connections from resolved settings.
#[derive(Debug, Clone)]
pub struct PgConnector {
    config: ConnectionConfig,
    acquire_timeout: Duration,
}

impl PgConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            acquire_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector for PgConnector {
    fn describe(&self) -> String {
        self.config.redacted().to_string()
    }

    async fn connect(&self) -> StoreResult<Box<dyn Store>> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.acquire_timeout)
            .connect_with(self.config.connect_options())
            .await
            .map_err(classify)?;
        let conn = pool.acquire().await.map_err(classify)?;
        debug!(target = %self.describe(), "postgres connection opened");

        Ok(Box::new(PgStore {
            pool,
            conn: Some(conn),
        }))
    }
}

/// A single PostgreSQL connection.
pub struct PgStore {
    pool: PgPool,
    conn: Option<PoolConnection<Postgres>>,
}

impl PgStore {
    fn conn(&mut self) -> StoreResult<&mut PgConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| StoreError::Connection("connection already closed".to_string()))
    }

    async fn simple(&mut self, sql: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        sqlx::query(sql).execute(conn).await.map_err(classify)?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&mut self) -> StoreResult<()> {
        self.simple("BEGIN").await
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.simple("COMMIT").await
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.simple("ROLLBACK").await
    }

    async fn execute(&mut self, statement: &InsertStatement) -> StoreResult<u64> {
        if statement.is_empty() {
            return Ok(0);
        }
        let sql = statement.to_sql();
        let mut query = sqlx::query(&sql);
        for row in &statement.rows {
            for (column, value) in statement.columns.iter().zip(row) {
                query = bind::bind_value(query, &column.kind, value);
            }
        }

        let conn = self.conn()?;
        let result = query.execute(conn).await.map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn fetch_ids(
        &mut self,
        table: &str,
        column: &str,
        kind: &ColumnKind,
    ) -> StoreResult<Vec<Value>> {
        let table = quote_ident(table);
        let column = quote_ident(column);
        let conn = self.conn()?;

        let values = match kind {
            ColumnKind::Uuid => {
                sqlx::query_scalar::<_, uuid::Uuid>(&format!(
                    "SELECT {column} FROM {table} WHERE {column} IS NOT NULL ORDER BY {column}"
                ))
                .fetch_all(conn)
                .await
                .map_err(classify)?
                .into_iter()
                .map(Value::Uuid)
                .collect()
            }
            ColumnKind::Int => sqlx::query_scalar::<_, i64>(&format!(
                "SELECT {column}::int8 FROM {table} WHERE {column} IS NOT NULL ORDER BY {column}"
            ))
            .fetch_all(conn)
            .await
            .map_err(classify)?
            .into_iter()
            .map(Value::Int)
            .collect(),
            _ => sqlx::query_scalar::<_, String>(&format!(
                "SELECT {column}::text FROM {table} WHERE {column} IS NOT NULL ORDER BY {column}"
            ))
            .fetch_all(conn)
            .await
            .map_err(classify)?
            .into_iter()
            .map(Value::Text)
            .collect(),
        };
        Ok(values)
    }

    async fn close(&mut self) -> StoreResult<()> {
        if let Some(conn) = self.conn.take() {
            drop(conn);
            self.pool.close().await;
            debug!("postgres connection closed");
        }
        Ok(())
    }
}

/// SQLSTATE classes that indicate the connection itself is unusable:
/// connection exception, insufficient resources, operator intervention.
const CONNECTION_CLASSES: &[&str] = &["08", "53", "57"];

/// Map a driver error onto the rejected/connection split.
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|code| code.into_owned());
            let message = db.message().to_string();
            match code.as_deref() {
                Some(code) if CONNECTION_CLASSES.iter().any(|class| code.starts_with(class)) => {
                    StoreError::Connection(format!("[{code}] {message}"))
                }
                _ => StoreError::Rejected { code, message },
            }
        }
        sqlx::Error::Encode(err) => StoreError::rejected(err.to_string()),
        sqlx::Error::Configuration(err) => StoreError::Config(err.to_string()),
        other => StoreError::Connection(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_connection_errors() {
        let err = classify(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        )));
        assert!(matches!(err, StoreError::Connection(_)));
        assert!(matches!(
            classify(sqlx::Error::PoolTimedOut),
            StoreError::Connection(_)
        ));
    }

    #[test]
    fn encode_errors_are_rejections() {
        let err = classify(sqlx::Error::Encode("bad value".into()));
        assert!(err.is_rejection());
    }
}
