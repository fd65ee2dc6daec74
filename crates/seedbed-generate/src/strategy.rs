use async_trait::async_trait;
use tracing::{debug, warn};

use seedbed_core::{EntityDescriptor, Error, InsertStrategy, Row, Value};
use seedbed_store::{InsertStatement, Store, StoreError};

use crate::model::MAX_REJECTION_SAMPLES;

/// What an insertion strategy achieved for one entity.
#[derive(Debug, Clone, Default)]
pub struct InsertionOutcome {
    pub requested: u64,
    pub inserted: u64,
    pub rejected: u64,
    /// Primary keys of the rows that were committed, in generation order.
    pub inserted_ids: Vec<Value>,
    pub rejection_samples: Vec<String>,
}

/// A strategy that stopped part way. `outcome` holds what was already
/// committed before `error`.
#[derive(Debug)]
pub struct InsertionFailure {
    pub outcome: InsertionOutcome,
    pub error: Error,
}

impl InsertionFailure {
    fn new(outcome: InsertionOutcome, error: impl Into<Error>) -> Self {
        Self {
            outcome,
            error: error.into(),
        }
    }

    /// Nothing was committed.
    fn nothing(requested: u64, error: impl Into<Error>) -> Self {
        Self::new(
            InsertionOutcome {
                requested,
                ..InsertionOutcome::default()
            },
            error,
        )
    }
}

/// Writes one entity's rows through a store connection.
#[async_trait]
pub trait InsertionStrategy: Send + Sync {
    fn kind(&self) -> InsertStrategy;

    async fn insert(
        &self,
        store: &mut dyn Store,
        entity: &EntityDescriptor,
        rows: Vec<Row>,
    ) -> std::result::Result<InsertionOutcome, InsertionFailure>;
}

pub fn strategy_for(kind: InsertStrategy) -> &'static dyn InsertionStrategy {
    match kind {
        InsertStrategy::Atomic => &AtomicBatch,
        InsertStrategy::Tolerant => &TolerantRows,
    }
}

/// All rows in one transaction. Any rejection rolls back the whole entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicBatch;

#[async_trait]
impl InsertionStrategy for AtomicBatch {
    fn kind(&self) -> InsertStrategy {
        InsertStrategy::Atomic
    }

    async fn insert(
        &self,
        store: &mut dyn Store,
        entity: &EntityDescriptor,
        rows: Vec<Row>,
    ) -> std::result::Result<InsertionOutcome, InsertionFailure> {
        let requested = rows.len() as u64;
        if rows.is_empty() {
            return Ok(InsertionOutcome::default());
        }
        let statement = InsertStatement::from_rows(entity, &rows)
            .map_err(|err| InsertionFailure::nothing(requested, err))?;

        store
            .begin()
            .await
            .map_err(|err| InsertionFailure::nothing(requested, err))?;
        for chunk in statement.chunks() {
            if let Err(err) = store.execute(&chunk).await {
                return Err(InsertionFailure::nothing(requested, abort(store, entity, err).await));
            }
            debug!(entity = %entity.name, rows = chunk.rows.len(), "batch chunk executed");
        }
        if let Err(err) = store.commit().await {
            return Err(InsertionFailure::nothing(requested, abort(store, entity, err).await));
        }

        Ok(InsertionOutcome {
            requested,
            inserted: requested,
            rejected: 0,
            inserted_ids: primary_keys(entity, &rows),
            rejection_samples: Vec::new(),
        })
    }
}

async fn abort(store: &mut dyn Store, entity: &EntityDescriptor, err: StoreError) -> Error {
    let rollback = store.rollback().await;
    match err {
        StoreError::Rejected { .. } => match rollback {
            Ok(()) => Error::BatchRejected {
                entity: entity.name.clone(),
                message: err.to_string(),
            },
            Err(rollback_err) => {
                warn!(entity = %entity.name, error = %rollback_err, "rollback failed");
                rollback_err.into()
            }
        },
        other => other.into(),
    }
}

/// One autocommitted insert per row. Rejected rows are counted and skipped;
/// only connection errors stop the step, and the rows committed before the
/// loss are still reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct TolerantRows;

#[async_trait]
impl InsertionStrategy for TolerantRows {
    fn kind(&self) -> InsertStrategy {
        InsertStrategy::Tolerant
    }

    async fn insert(
        &self,
        store: &mut dyn Store,
        entity: &EntityDescriptor,
        rows: Vec<Row>,
    ) -> std::result::Result<InsertionOutcome, InsertionFailure> {
        let mut outcome = InsertionOutcome {
            requested: rows.len() as u64,
            ..InsertionOutcome::default()
        };

        for row in &rows {
            let statement = match InsertStatement::from_rows(entity, [row]) {
                Ok(statement) => statement,
                Err(err) => return Err(InsertionFailure::new(outcome, err)),
            };
            match store.execute(&statement).await {
                Ok(_) => {
                    outcome.inserted += 1;
                    outcome
                        .inserted_ids
                        .push(row.value(&entity.primary_key).clone());
                }
                Err(StoreError::Rejected { message, .. }) => {
                    let rejection = Error::RowRejected {
                        entity: entity.name.clone(),
                        message,
                    };
                    outcome.rejected += 1;
                    warn!(entity = %entity.name, error = %rejection, "row rejected");
                    if outcome.rejection_samples.len() < MAX_REJECTION_SAMPLES {
                        outcome.rejection_samples.push(rejection.to_string());
                    }
                }
                Err(err) => {
                    warn!(
                        entity = %entity.name,
                        inserted = outcome.inserted,
                        rejected = outcome.rejected,
                        error = %err,
                        "connection lost during tolerant insertion"
                    );
                    return Err(InsertionFailure::new(outcome, err));
                }
            }
        }

        Ok(outcome)
    }
}

fn primary_keys(entity: &EntityDescriptor, rows: &[Row]) -> Vec<Value> {
    rows.iter()
        .map(|row| row.value(&entity.primary_key).clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use seedbed_core::{ColumnDef, ColumnKind};
    use seedbed_store::{Connector, MemoryConnector};

    use super::*;

    fn entity() -> EntityDescriptor {
        EntityDescriptor::new("deployments")
            .column(ColumnDef::required("id", ColumnKind::Int))
            .column(ColumnDef::required("status", ColumnKind::Text))
    }

    fn rows(n: i64) -> Vec<Row> {
        (0..n)
            .map(|id| {
                let status = if id % 4 == 0 { "active" } else { "allocated" };
                Row::new().with("id", id).with("status", status)
            })
            .collect()
    }

    fn reject_active() -> MemoryConnector {
        MemoryConnector::new().reject_when(|_, row| {
            (row.get("status").and_then(Value::as_str) == Some("active"))
                .then(|| "deployment trigger refused active status".to_string())
        })
    }

    #[tokio::test]
    async fn tolerant_counts_every_row() {
        let connector = reject_active();
        let mut store = connector.connect().await.expect("connect");
        let outcome = TolerantRows
            .insert(store.as_mut(), &entity(), rows(100))
            .await
            .expect("tolerant");

        assert_eq!(outcome.requested, 100);
        assert_eq!(outcome.rejected, 25);
        assert_eq!(outcome.inserted + outcome.rejected, outcome.requested);
        assert_eq!(outcome.inserted_ids.len(), 75);
        assert_eq!(outcome.rejection_samples.len(), MAX_REJECTION_SAMPLES);
        assert_eq!(connector.row_count("deployments"), 75);
    }

    #[tokio::test]
    async fn atomic_rolls_back_on_any_rejection() {
        let connector = reject_active();
        let mut store = connector.connect().await.expect("connect");
        let failure = AtomicBatch
            .insert(store.as_mut(), &entity(), rows(10))
            .await
            .expect_err("atomic");

        assert!(matches!(failure.error, Error::BatchRejected { .. }));
        assert_eq!(failure.outcome.requested, 10);
        assert_eq!(failure.outcome.inserted, 0);
        assert_eq!(connector.row_count("deployments"), 0);
    }

    #[tokio::test]
    async fn atomic_commits_clean_batches() {
        let connector = MemoryConnector::new();
        let mut store = connector.connect().await.expect("connect");
        let outcome = AtomicBatch
            .insert(store.as_mut(), &entity(), rows(10))
            .await
            .expect("atomic");
        assert_eq!(outcome.inserted, 10);
        assert_eq!(outcome.inserted_ids.first(), Some(&Value::Int(0)));
        assert_eq!(connector.row_count("deployments"), 10);
    }

    #[tokio::test]
    async fn connection_loss_is_not_a_rejection() {
        let connector = MemoryConnector::new().fail_after_statements(3);
        let mut store = connector.connect().await.expect("connect");
        let failure = TolerantRows
            .insert(store.as_mut(), &entity(), rows(10))
            .await
            .expect_err("connection lost");

        assert!(matches!(failure.error, Error::Connection(_)));
        assert_eq!(connector.row_count("deployments"), 3);
        assert_eq!(failure.outcome.requested, 10);
        assert_eq!(failure.outcome.inserted, 3);
        assert_eq!(failure.outcome.rejected, 0);
        assert_eq!(failure.outcome.inserted_ids, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn strategy_lookup_matches_kind() {
        assert_eq!(strategy_for(InsertStrategy::Atomic).kind(), InsertStrategy::Atomic);
        assert_eq!(
            strategy_for(InsertStrategy::Tolerant).kind(),
            InsertStrategy::Tolerant
        );
    }
}
