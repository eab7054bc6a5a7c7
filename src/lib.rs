//! SchemaFlow Analyser
//!
//! Database schema introspection and change detection. The [`analyser`]
//! module is the engine; the remaining modules expose it over HTTP for
//! PostgreSQL, CockroachDB and Redshift connections.

pub mod analyser;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod snapshot;
pub mod state;

pub use analyser::{Analyser, DialectDescriptor, ObjectIdentity, SchemaSnapshot};
pub use error::{AppError, ApiResult};
