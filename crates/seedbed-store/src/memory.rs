//! In-memory backend for dry runs and tests.
//!
//! Rows are kept per table with transactional staging, so rollback and
//! rejection semantics match a real database closely enough to exercise the
//! insertion strategies.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use seedbed_core::{ColumnKind, EntityDescriptor, Value};

use crate::error::{StoreError, StoreResult};
use crate::statement::InsertStatement;
use crate::store::{Connector, Store};

pub type StoredRow = BTreeMap<String, Value>;

/// Decides whether a row is refused; returns the rejection message.
pub type RejectPredicate = Arc<dyn Fn(&str, &StoredRow) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone)]
struct ReferenceCheck {
    table: String,
    column: String,
    target: String,
    target_key: String,
    unique: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, Vec<StoredRow>>,
    statements: usize,
    connects: usize,
    closes: usize,
}

/// Shared in-memory database. Clones observe the same state.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
    reject: Option<RejectPredicate>,
    references: Vec<ReferenceCheck>,
    fail_after: Option<usize>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every row for which `predicate` returns a message.
    pub fn reject_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &StoredRow) -> Option<String> + Send + Sync + 'static,
    {
        self.reject = Some(Arc::new(predicate));
        self
    }

    /// Enforce the foreign keys (and one-to-one uniqueness) declared by
    /// `entities` against committed and staged rows.
    pub fn enforce_references(mut self, entities: &[EntityDescriptor]) -> Self {
        let keys: BTreeMap<&str, &str> = entities
            .iter()
            .map(|entity| (entity.name.as_str(), entity.primary_key.as_str()))
            .collect();
        self.references = entities
            .iter()
            .flat_map(|entity| {
                let keys = &keys;
                entity.references.iter().map(move |reference| ReferenceCheck {
                    table: entity.name.clone(),
                    column: reference.column.clone(),
                    target: reference.target.clone(),
                    target_key: keys
                        .get(reference.target.as_str())
                        .copied()
                        .unwrap_or("id")
                        .to_string(),
                    unique: reference.cardinality == seedbed_core::Cardinality::OneToOne,
                })
            })
            .collect();
        self
    }

    /// Every connection opened from this connector breaks once it has
    /// executed `statements` statements.
    pub fn fail_after_statements(mut self, statements: usize) -> Self {
        self.fail_after = Some(statements);
        self
    }

    /// Insert pre-existing rows, as if written by an earlier run.
    pub fn seed_rows(&self, table: &str, rows: impl IntoIterator<Item = StoredRow>) {
        lock(&self.state)
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<StoredRow> {
        lock(&self.state)
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        lock(&self.state).tables.get(table).map_or(0, Vec::len)
    }

    pub fn total_rows(&self) -> usize {
        lock(&self.state).tables.values().map(Vec::len).sum()
    }

    pub fn tables(&self) -> Vec<String> {
        lock(&self.state)
            .tables
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn connects(&self) -> usize {
        lock(&self.state).connects
    }

    pub fn closes(&self) -> usize {
        lock(&self.state).closes
    }

    pub fn statements(&self) -> usize {
        lock(&self.state).statements
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn describe(&self) -> String {
        "memory://".to_string()
    }

    async fn connect(&self) -> StoreResult<Box<dyn Store>> {
        lock(&self.state).connects += 1;
        Ok(Box::new(MemoryStore {
            state: Arc::clone(&self.state),
            reject: self.reject.clone(),
            references: self.references.clone(),
            fail_after: self.fail_after,
            staged: None,
            executed: 0,
            broken: false,
            closed: false,
        }))
    }
}

/// Connection handle over a [`MemoryConnector`].
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    reject: Option<RejectPredicate>,
    references: Vec<ReferenceCheck>,
    fail_after: Option<usize>,
    staged: Option<Vec<(String, StoredRow)>>,
    executed: usize,
    broken: bool,
    closed: bool,
}

impl MemoryStore {
    fn ensure_usable(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Connection("connection already closed".to_string()));
        }
        if self.broken {
            return Err(StoreError::Connection(
                "server closed the connection unexpectedly".to_string(),
            ));
        }
        Ok(())
    }

    fn check_row(
        &self,
        state: &MemoryState,
        pending: &[(String, StoredRow)],
        table: &str,
        row: &StoredRow,
    ) -> StoreResult<()> {
        if let Some(message) = self.reject.as_ref().and_then(|reject| reject(table, row)) {
            return Err(StoreError::Rejected {
                code: Some("23514".to_string()),
                message,
            });
        }

        let staged = self.staged.as_deref().unwrap_or(&[]);

        for check in self.references.iter().filter(|check| check.table == table) {
            let Some(value) = row.get(&check.column).filter(|value| !value.is_null()) else {
                continue;
            };
            if !any_row(state, staged, pending, &check.target, &check.target_key, value) {
                return Err(StoreError::Rejected {
                    code: Some("23503".to_string()),
                    message: format!(
                        "insert on table \"{table}\" violates foreign key on \"{}\": {value} not present in \"{}\"",
                        check.column, check.target
                    ),
                });
            }
            if check.unique && any_row(state, staged, pending, table, &check.column, value) {
                return Err(StoreError::Rejected {
                    code: Some("23505".to_string()),
                    message: format!(
                        "duplicate key value violates unique constraint on \"{table}\".\"{}\"",
                        check.column
                    ),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn begin(&mut self) -> StoreResult<()> {
        self.ensure_usable()?;
        if self.staged.is_some() {
            return Err(StoreError::rejected("a transaction is already in progress"));
        }
        self.staged = Some(Vec::new());
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.ensure_usable()?;
        let staged = self
            .staged
            .take()
            .ok_or_else(|| StoreError::rejected("there is no transaction in progress"))?;
        let mut state = lock(&self.state);
        for (table, row) in staged {
            state.tables.entry(table).or_default().push(row);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.ensure_usable()?;
        self.staged = None;
        Ok(())
    }

    async fn execute(&mut self, statement: &InsertStatement) -> StoreResult<u64> {
        self.ensure_usable()?;
        if self.fail_after.is_some_and(|limit| self.executed >= limit) {
            self.broken = true;
            self.staged = None;
            return Err(StoreError::Connection(
                "server closed the connection unexpectedly".to_string(),
            ));
        }
        self.executed += 1;

        let mut state = lock(&self.state);
        state.statements += 1;

        let mut pending = Vec::with_capacity(statement.rows.len());
        for idx in 0..statement.rows.len() {
            let row = statement.row_map(idx);
            self.check_row(&state, &pending, &statement.table, &row)?;
            pending.push((statement.table.clone(), row));
        }

        let inserted = pending.len() as u64;
        match self.staged.as_mut() {
            Some(staged) => staged.extend(pending),
            None => {
                for (table, row) in pending {
                    state.tables.entry(table).or_default().push(row);
                }
            }
        }
        Ok(inserted)
    }

    async fn fetch_ids(
        &mut self,
        table: &str,
        column: &str,
        _kind: &ColumnKind,
    ) -> StoreResult<Vec<Value>> {
        self.ensure_usable()?;
        let state = lock(&self.state);
        let mut seen = BTreeSet::new();
        let mut ids: Vec<Value> = state
            .tables
            .get(table)
            .into_iter()
            .flatten()
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_null())
            .filter(|value| seen.insert(value.to_string()))
            .cloned()
            .collect();
        ids.sort_by_key(|value| value.to_string());
        Ok(ids)
    }

    async fn close(&mut self) -> StoreResult<()> {
        if !self.closed {
            self.closed = true;
            self.staged = None;
            lock(&self.state).closes += 1;
        }
        Ok(())
    }
}

fn any_row(
    state: &MemoryState,
    staged: &[(String, StoredRow)],
    pending: &[(String, StoredRow)],
    table: &str,
    column: &str,
    value: &Value,
) -> bool {
    let committed = state.tables.get(table).into_iter().flatten();
    let uncommitted = staged
        .iter()
        .chain(pending)
        .filter(|(name, _)| name == table)
        .map(|(_, row)| row);
    committed
        .chain(uncommitted)
        .any(|row| row.get(column) == Some(value))
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use seedbed_core::{ColumnDef, ForeignRef, Row};

    use super::*;

    fn entities() -> Vec<EntityDescriptor> {
        vec![
            EntityDescriptor::new("profiles").column(ColumnDef::required("id", ColumnKind::Uuid)),
            EntityDescriptor::new("employment_details")
                .column(ColumnDef::required("id", ColumnKind::Uuid))
                .reference(ForeignRef::required("profile_id", "profiles").one_to_one()),
        ]
    }

    fn statement(entity: &EntityDescriptor, rows: &[Row]) -> InsertStatement {
        InsertStatement::from_rows(entity, rows).expect("statement")
    }

    #[tokio::test]
    async fn rollback_discards_staged_rows() {
        let connector = MemoryConnector::new();
        let entities = entities();
        let mut store = connector.connect().await.expect("connect");

        store.begin().await.expect("begin");
        store
            .execute(&statement(&entities[0], &[Row::new().with("id", "p1")]))
            .await
            .expect("insert");
        assert_eq!(connector.row_count("profiles"), 0);
        store.rollback().await.expect("rollback");
        assert_eq!(connector.row_count("profiles"), 0);

        store.begin().await.expect("begin");
        store
            .execute(&statement(&entities[0], &[Row::new().with("id", "p2")]))
            .await
            .expect("insert");
        store.commit().await.expect("commit");
        assert_eq!(connector.row_count("profiles"), 1);
    }

    #[tokio::test]
    async fn rejected_statement_applies_nothing() {
        let connector = MemoryConnector::new().reject_when(|_, row| {
            (row.get("id") == Some(&Value::from("bad"))).then(|| "check violated".to_string())
        });
        let entities = entities();
        let mut store = connector.connect().await.expect("connect");
        let rows = [Row::new().with("id", "ok"), Row::new().with("id", "bad")];

        let err = store
            .execute(&statement(&entities[0], &rows))
            .await
            .expect_err("rejected");
        assert!(err.is_rejection());
        assert_eq!(connector.row_count("profiles"), 0);
    }

    #[tokio::test]
    async fn foreign_keys_and_one_to_one_are_enforced() {
        let entities = entities();
        let connector = MemoryConnector::new().enforce_references(&entities);
        let mut store = connector.connect().await.expect("connect");
        store
            .execute(&statement(&entities[0], &[Row::new().with("id", "p1")]))
            .await
            .expect("parent");

        let dangling = Row::new().with("id", "e1").with("profile_id", "missing");
        let err = store
            .execute(&statement(&entities[1], &[dangling]))
            .await
            .expect_err("dangling");
        assert!(err.is_rejection());

        let first = Row::new().with("id", "e1").with("profile_id", "p1");
        let second = Row::new().with("id", "e2").with("profile_id", "p1");
        store
            .execute(&statement(&entities[1], &[first]))
            .await
            .expect("first child");
        let err = store
            .execute(&statement(&entities[1], &[second]))
            .await
            .expect_err("duplicate");
        assert!(err.to_string().contains("23505"));
    }

    #[tokio::test]
    async fn simulated_connection_loss_is_sticky() {
        let connector = MemoryConnector::new().fail_after_statements(1);
        let entities = entities();
        let mut store = connector.connect().await.expect("connect");
        let rows = [Row::new().with("id", "p1")];

        store.execute(&statement(&entities[0], &rows)).await.expect("first");
        let err = store
            .execute(&statement(&entities[0], &rows))
            .await
            .expect_err("lost");
        assert!(matches!(err, StoreError::Connection(_)));
        assert!(matches!(store.begin().await, Err(StoreError::Connection(_))));

        store.close().await.expect("close");
        assert_eq!((connector.connects(), connector.closes()), (1, 1));
    }

    #[tokio::test]
    async fn fetch_ids_returns_distinct_sorted_values() {
        let connector = MemoryConnector::new();
        connector.seed_rows(
            "profiles",
            ["b", "a", "b"].into_iter().map(|id| {
                let mut row = StoredRow::new();
                row.insert("id".to_string(), Value::from(id));
                row
            }),
        );
        let mut store = connector.connect().await.expect("connect");
        let ids = store
            .fetch_ids("profiles", "id", &ColumnKind::Text)
            .await
            .expect("ids");
        assert_eq!(ids, vec![Value::from("a"), Value::from("b")]);
    }
}
