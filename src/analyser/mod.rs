//! Schema analyser
//!
//! Introspects a database catalog into a [`SchemaSnapshot`] and keeps it up to
//! date cheaply through server-side content hashes.
//!
//! Layers, bottom up:
//! - [`dialect`]: capability flags and query templates per database flavour
//! - [`executor`]: renders templates and runs them through a [`CatalogSource`]
//! - [`rows`], [`columns`], [`ddl`]: typed row decoding and normalization
//! - [`assembler`]: joins row sets into the object model
//! - [`changes`]: hash snapshots and added / removed / modified classification
//! - [`orchestrator`]: full analysis, fast snapshot and refresh

pub mod assembler;
pub mod changes;
pub mod columns;
pub mod ddl;
pub mod dialect;
pub mod executor;
pub mod model;
pub mod orchestrator;
pub mod rows;
pub mod sql;

#[cfg(test)]
pub mod testing;

pub use assembler::{AssemblyReport, ObjectAssembler, RawCatalog};
pub use changes::{classify, ChangeKind, ChangeSet};
pub use dialect::{DialectDescriptor, QueryName};
pub use executor::{CatalogRow, CatalogSource, QueryExecutor};
pub use model::{
    ColumnInfo, ColumnReference, ConstraintInfo, ForeignKeyColumn, ForeignKeyInfo, IndexInfo,
    MaterializedViewInfo, ObjectHash, ObjectIdentity, PartialSchemaSnapshot, RoutineInfo, SchemaObject,
    SchemaObjectKind, SchemaSnapshot, TableInfo, ViewInfo,
};
pub use orchestrator::{Analyser, RefreshOutcome};
