use std::env;

use anyhow::{Context, Result};
use seedbed_core::{ColumnDef, ColumnKind, EntityDescriptor, ForeignRef, Row, Value};
use seedbed_store::{ConnectionConfig, Connector, InsertStatement, PgConnector, StoreError};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

const SETUP: &[&str] = &[
    "DROP TABLE IF EXISTS seedbed_it_children",
    "DROP TABLE IF EXISTS seedbed_it_parents",
    "DROP TYPE IF EXISTS seedbed_it_status",
    "CREATE TYPE seedbed_it_status AS ENUM ('active', 'inactive')",
    "CREATE TABLE seedbed_it_parents (
        id uuid PRIMARY KEY,
        name text NOT NULL,
        status seedbed_it_status NOT NULL,
        score numeric(5,2),
        tags text[],
        created_at timestamptz NOT NULL
    )",
    "CREATE TABLE seedbed_it_children (
        id uuid PRIMARY KEY,
        parent_id uuid NOT NULL REFERENCES seedbed_it_parents(id),
        quantity integer NOT NULL CHECK (quantity > 0)
    )",
];

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

fn parents() -> EntityDescriptor {
    EntityDescriptor::new("seedbed_it_parents")
        .column(ColumnDef::required("id", ColumnKind::Uuid))
        .column(ColumnDef::required("name", ColumnKind::Text))
        .column(ColumnDef::required(
            "status",
            ColumnKind::Enum("seedbed_it_status".to_string()),
        ))
        .column(ColumnDef::nullable("score", ColumnKind::Float))
        .column(ColumnDef::nullable("tags", ColumnKind::TextArray))
        .column(ColumnDef::required("created_at", ColumnKind::Timestamp))
}

fn children() -> EntityDescriptor {
    EntityDescriptor::new("seedbed_it_children")
        .column(ColumnDef::required("id", ColumnKind::Uuid))
        .reference(ForeignRef::required("parent_id", "seedbed_it_parents"))
        .column(ColumnDef::required("quantity", ColumnKind::Int))
}

async fn reset(url: &str) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(url)
        .await
        .context("connecting to Postgres")?;
    for sql in SETUP {
        sqlx::query(sql)
            .execute(&pool)
            .await
            .with_context(|| format!("executing setup: {sql}"))?;
    }
    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn inserts_rolls_back_and_classifies_rejections() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL");
        return Ok(());
    };
    reset(&url).await?;

    let connector = PgConnector::new(ConnectionConfig::from_url(&url)?);
    let mut store = connector.connect().await?;
    let now = chrono::Utc::now().naive_utc();

    let parent_id = Uuid::new_v4();
    let parent = Row::new()
        .with("id", parent_id)
        .with("name", "Asha")
        .with("status", "active")
        .with("score", 81.5)
        .with("tags", vec!["rust".to_string()])
        .with("created_at", now);
    let nulls = Row::new()
        .with("id", Uuid::new_v4())
        .with("name", "Ravi")
        .with("status", "inactive")
        .with("created_at", now);
    let inserted = store
        .execute(&InsertStatement::from_rows(&parents(), [&parent, &nulls])?)
        .await?;
    assert_eq!(inserted, 2);

    store.begin().await?;
    let child = Row::new()
        .with("id", Uuid::new_v4())
        .with("parent_id", parent_id)
        .with("quantity", 3_i64);
    store
        .execute(&InsertStatement::from_rows(&children(), [&child])?)
        .await?;
    store.rollback().await?;

    let ids = store
        .fetch_ids("seedbed_it_children", "id", &ColumnKind::Uuid)
        .await?;
    assert!(ids.is_empty(), "rolled back rows must not persist");

    let invalid = Row::new()
        .with("id", Uuid::new_v4())
        .with("parent_id", parent_id)
        .with("quantity", 0_i64);
    let err = store
        .execute(&InsertStatement::from_rows(&children(), [&invalid])?)
        .await
        .expect_err("check constraint");
    match err {
        StoreError::Rejected { code, .. } => assert_eq!(code.as_deref(), Some("23514")),
        other => panic!("expected rejection, got {other}"),
    }

    let ids = store
        .fetch_ids("seedbed_it_parents", "id", &ColumnKind::Uuid)
        .await?;
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&Value::Uuid(parent_id)));

    store.close().await?;
    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() -> Result<()> {
    if database_url().is_none() {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL");
        return Ok(());
    }
    let config = ConnectionConfig::new("127.0.0.1", 1, "nowhere", "nobody", "x");
    let connector =
        PgConnector::new(config).with_acquire_timeout(std::time::Duration::from_secs(2));
    match connector.connect().await {
        Err(StoreError::Connection(_)) => Ok(()),
        Err(other) => panic!("expected connection error, got {other}"),
        Ok(_) => panic!("connected to a closed port"),
    }
}
