//! Core contracts for seedbed.
//!
//! This crate defines entity descriptors, the dependency graph, row values
//! and the error taxonomy shared by the storage backends, the generation
//! engine and the CLI.

pub mod entity;
pub mod error;
pub mod graph;
pub mod value;

pub use entity::{
    Cardinality, ColumnDef, ColumnKind, EntityDescriptor, FanOut, ForeignRef, InsertStrategy,
    RowTarget,
};
pub use error::{Error, ErrorKind, Result};
pub use graph::{DependencyGraph, GraphReport, GraphSummary, build_graph_report};
pub use value::{Row, Value};
