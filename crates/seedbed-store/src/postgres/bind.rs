use chrono::{NaiveDate, NaiveDateTime};
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;

use seedbed_core::{ColumnKind, Value};

pub(super) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Bind one value, typing NULLs after the declared column kind.
pub(super) fn bind_value<'q>(query: PgQuery<'q>, kind: &ColumnKind, value: &Value) -> PgQuery<'q> {
    match value {
        Value::Null => bind_null(query, kind),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Uuid(v) => query.bind(*v),
        Value::Date(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
        Value::TextArray(v) => query.bind(v.clone()),
        Value::Json(v) => query.bind(v.clone()),
    }
}

fn bind_null<'q>(query: PgQuery<'q>, kind: &ColumnKind) -> PgQuery<'q> {
    match kind {
        ColumnKind::Uuid => query.bind(None::<uuid::Uuid>),
        ColumnKind::Int => query.bind(None::<i64>),
        ColumnKind::Float => query.bind(None::<f64>),
        ColumnKind::Bool => query.bind(None::<bool>),
        ColumnKind::Date => query.bind(None::<NaiveDate>),
        ColumnKind::Timestamp => query.bind(None::<NaiveDateTime>),
        ColumnKind::TextArray => query.bind(None::<Vec<String>>),
        ColumnKind::Json => query.bind(None::<serde_json::Value>),
        ColumnKind::Text | ColumnKind::Enum(_) => query.bind(None::<String>),
    }
}
