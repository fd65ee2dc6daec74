use std::collections::BTreeMap;

use seedbed_core::{ColumnKind, EntityDescriptor, Error, Result, Row, Value};

/// Upper bound on bind parameters in a single PostgreSQL statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Column of an insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// Parameterized multi-row `INSERT`.
///
/// Values are never interpolated into SQL; every value becomes a `$n`
/// placeholder and is bound by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<StatementColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl InsertStatement {
    /// Empty statement covering all declared columns of `entity`.
    pub fn new(entity: &EntityDescriptor) -> Self {
        Self {
            table: entity.name.clone(),
            columns: entity
                .columns
                .iter()
                .map(|col| StatementColumn {
                    name: col.name.clone(),
                    kind: col.kind.clone(),
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows<'a>(
        entity: &EntityDescriptor,
        rows: impl IntoIterator<Item = &'a Row>,
    ) -> Result<Self> {
        let mut statement = Self::new(entity);
        for row in rows {
            statement.push_row(row)?;
        }
        Ok(statement)
    }

    /// Append a row, mapping it onto the declared column order.
    ///
    /// Columns missing from the row are bound as NULL; columns the entity does
    /// not declare are a configuration error.
    pub fn push_row(&mut self, row: &Row) -> Result<()> {
        for column in row.columns() {
            if !self.columns.iter().any(|col| col.name == column) {
                return Err(Error::configuration(format!(
                    "row for '{}' sets undeclared column '{column}'",
                    self.table
                )));
            }
        }

        self.rows.push(
            self.columns
                .iter()
                .map(|col| row.value(&col.name).clone())
                .collect(),
        );
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn param_count(&self) -> usize {
        self.rows.len() * self.columns.len()
    }

    /// Row `idx` as a column map, for backends that inspect values.
    pub fn row_map(&self, idx: usize) -> BTreeMap<String, Value> {
        self.columns
            .iter()
            .zip(self.rows.get(idx).into_iter().flatten())
            .map(|(col, value)| (col.name.clone(), value.clone()))
            .collect()
    }

    /// Render the SQL text with `$n` placeholders.
    pub fn to_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|col| quote_ident(&col.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut param_idx = 1;
        let mut tuples = Vec::with_capacity(self.rows.len());
        for _ in &self.rows {
            let placeholders: Vec<String> = self
                .columns
                .iter()
                .map(|col| {
                    let placeholder = placeholder(param_idx, &col.kind);
                    param_idx += 1;
                    placeholder
                })
                .collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_ident(&self.table),
            columns,
            tuples.join(", ")
        )
    }

    /// Split into statements that each stay under [`MAX_BIND_PARAMS`].
    pub fn chunks(&self) -> Vec<InsertStatement> {
        let per_statement = rows_per_statement(self.columns.len());
        self.rows
            .chunks(per_statement)
            .map(|rows| InsertStatement {
                table: self.table.clone(),
                columns: self.columns.clone(),
                rows: rows.to_vec(),
            })
            .collect()
    }
}

/// Maximum rows per statement for a given column count.
pub fn rows_per_statement(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns.max(1)).max(1)
}

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn placeholder(idx: usize, kind: &ColumnKind) -> String {
    match kind {
        ColumnKind::Enum(type_name) => format!("CAST(${idx} AS {})", quote_ident(type_name)),
        _ => format!("${idx}"),
    }
}
