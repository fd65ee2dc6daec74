use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Storage type of a column, used to bind typed parameters and NULLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum ColumnKind {
    Uuid,
    Text,
    Int,
    Float,
    Bool,
    Date,
    Timestamp,
    TextArray,
    Json,
    /// Database enum type; values are bound as text and cast to the type.
    Enum(String),
}

/// Column declared on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn required(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
        }
    }

    pub fn nullable(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: true,
        }
    }
}

/// How many parents a batch of children may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Many children may reference the same parent (sample with replacement).
    ManyToOne,
    /// Each parent is referenced at most once per batch (sample without replacement).
    OneToOne,
}

/// Foreign key from one of the entity's columns to another entity's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignRef {
    pub column: String,
    pub target: String,
    pub nullable: bool,
    pub cardinality: Cardinality,
}

impl ForeignRef {
    pub fn required(column: &str, target: &str) -> Self {
        Self {
            column: column.to_string(),
            target: target.to_string(),
            nullable: false,
            cardinality: Cardinality::ManyToOne,
        }
    }

    pub fn optional(column: &str, target: &str) -> Self {
        Self {
            nullable: true,
            ..Self::required(column, target)
        }
    }

    pub fn one_to_one(mut self) -> Self {
        self.cardinality = Cardinality::OneToOne;
        self
    }
}

/// Insertion strategy declared per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertStrategy {
    /// One transaction for the whole entity; any rejection rolls back everything.
    Atomic,
    /// One unit of work per row; rejected rows are counted and skipped.
    Tolerant,
}

impl fmt::Display for InsertStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertStrategy::Atomic => f.write_str("atomic"),
            InsertStrategy::Tolerant => f.write_str("tolerant"),
        }
    }
}

impl FromStr for InsertStrategy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(InsertStrategy::Atomic),
            "tolerant" => Ok(InsertStrategy::Tolerant),
            other => Err(Error::configuration(format!(
                "unknown insert strategy '{other}' (expected atomic or tolerant)"
            ))),
        }
    }
}

/// Discrete distribution over the number of children generated per parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOut {
    /// `(count, weight)` pairs.
    pub choices: Vec<(u32, u32)>,
}

impl FanOut {
    /// Exactly `count` children per parent.
    pub fn exactly(count: u32) -> Self {
        Self {
            choices: vec![(count, 1)],
        }
    }

    /// Uniform over `min..=max`.
    pub fn uniform(min: u32, max: u32) -> Self {
        Self {
            choices: (min..=max).map(|count| (count, 1)).collect(),
        }
    }

    pub fn weighted(choices: &[(u32, u32)]) -> Self {
        Self {
            choices: choices.to_vec(),
        }
    }

    pub fn min(&self) -> u32 {
        self.choices.iter().map(|(count, _)| *count).min().unwrap_or(0)
    }

    pub fn max(&self) -> u32 {
        self.choices.iter().map(|(count, _)| *count).max().unwrap_or(0)
    }

    pub fn total_weight(&self) -> u64 {
        self.choices.iter().map(|(_, weight)| *weight as u64).sum()
    }

    fn validate(&self, entity: &str) -> Result<()> {
        if self.choices.is_empty() {
            return Err(Error::configuration(format!(
                "entity '{entity}' has an empty fan-out distribution"
            )));
        }
        if self.choices.iter().any(|(_, weight)| *weight == 0) {
            return Err(Error::configuration(format!(
                "entity '{entity}' has a zero fan-out weight"
            )));
        }
        Ok(())
    }
}

/// How many rows an entity step should produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RowTarget {
    /// A fixed number of rows.
    Fixed { rows: u64 },
    /// A fraction of the parent's rows, each receiving `fan_out` children.
    PerParent {
        parent: String,
        coverage: f64,
        fan_out: FanOut,
    },
}

impl RowTarget {
    pub fn fixed(rows: u64) -> Self {
        RowTarget::Fixed { rows }
    }

    pub fn per_parent(parent: &str, coverage: f64, fan_out: FanOut) -> Self {
        RowTarget::PerParent {
            parent: parent.to_string(),
            coverage,
            fan_out,
        }
    }
}

/// Declarative description of one entity (table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnDef>,
    pub references: Vec<ForeignRef>,
    pub strategy: InsertStrategy,
    pub target: RowTarget,
}

impl EntityDescriptor {
    /// New atomic entity with an `id` primary key and a fixed target of zero rows.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primary_key: "id".to_string(),
            columns: Vec::new(),
            references: Vec::new(),
            strategy: InsertStrategy::Atomic,
            target: RowTarget::fixed(0),
        }
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare a foreign key; the FK column is added as a UUID column if missing.
    pub fn reference(mut self, reference: ForeignRef) -> Self {
        if !self.columns.iter().any(|col| col.name == reference.column) {
            self.columns.push(ColumnDef {
                name: reference.column.clone(),
                kind: ColumnKind::Uuid,
                nullable: reference.nullable,
            });
        }
        self.references.push(reference);
        self
    }

    pub fn strategy(mut self, strategy: InsertStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn target(mut self, target: RowTarget) -> Self {
        self.target = target;
        self
    }

    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn foreign_ref(&self, column: &str) -> Option<&ForeignRef> {
        self.references.iter().find(|fk| fk.column == column)
    }

    /// Distinct entities this entity references, in declaration order.
    pub fn targets(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.references
            .iter()
            .filter(|fk| seen.insert(fk.target.as_str()))
            .map(|fk| fk.target.as_str())
            .collect()
    }

    /// Check internal consistency of the declaration.
    pub fn validate(&self) -> Result<()> {
        let mut names = BTreeSet::new();
        for column in &self.columns {
            if !names.insert(column.name.as_str()) {
                return Err(Error::configuration(format!(
                    "entity '{}' declares column '{}' twice",
                    self.name, column.name
                )));
            }
        }

        if !names.contains(self.primary_key.as_str()) {
            return Err(Error::configuration(format!(
                "entity '{}' primary key '{}' is not a declared column",
                self.name, self.primary_key
            )));
        }

        for fk in &self.references {
            if !names.contains(fk.column.as_str()) {
                return Err(Error::configuration(format!(
                    "entity '{}' foreign key column '{}' is not declared",
                    self.name, fk.column
                )));
            }
        }

        if let RowTarget::PerParent {
            parent,
            coverage,
            fan_out,
        } = &self.target
        {
            if !(0.0..=1.0).contains(coverage) {
                return Err(Error::configuration(format!(
                    "entity '{}' coverage {coverage} is outside [0, 1]",
                    self.name
                )));
            }
            if !self.references.iter().any(|fk| &fk.target == parent) {
                return Err(Error::configuration(format!(
                    "entity '{}' is generated per '{parent}' but has no foreign key to it",
                    self.name
                )));
            }
            fan_out.validate(&self.name)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_adds_uuid_column() {
        let entity = EntityDescriptor::new("addresses")
            .column(ColumnDef::required("id", ColumnKind::Uuid))
            .reference(ForeignRef::required("profile_id", "profiles"));
        let column = entity.column_def("profile_id").expect("fk column");
        assert_eq!(column.kind, ColumnKind::Uuid);
        assert!(!column.nullable);
        assert!(entity.validate().is_ok());
    }

    #[test]
    fn per_parent_requires_fk_to_parent() {
        let entity = EntityDescriptor::new("addresses")
            .column(ColumnDef::required("id", ColumnKind::Uuid))
            .target(RowTarget::per_parent("profiles", 1.0, FanOut::exactly(1)));
        assert!(matches!(entity.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn coverage_must_be_a_fraction() {
        let entity = EntityDescriptor::new("addresses")
            .column(ColumnDef::required("id", ColumnKind::Uuid))
            .reference(ForeignRef::required("profile_id", "profiles"))
            .target(RowTarget::per_parent("profiles", 1.5, FanOut::exactly(1)));
        assert!(matches!(entity.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!(
            "Tolerant".parse::<InsertStrategy>().ok(),
            Some(InsertStrategy::Tolerant)
        );
        assert!("sometimes".parse::<InsertStrategy>().is_err());
    }

    #[test]
    fn uniform_fan_out_bounds() {
        let fan_out = FanOut::uniform(2, 5);
        assert_eq!(fan_out.min(), 2);
        assert_eq!(fan_out.max(), 5);
        assert_eq!(fan_out.total_weight(), 4);
    }
}
