//! In-memory catalog for tests
//!
//! Serves canned rows per logical query and records what was issued.

use crate::analyser::dialect::QueryName;
use crate::analyser::executor::{CatalogRow, CatalogSource};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeCatalog {
    rows: Mutex<HashMap<QueryName, Vec<CatalogRow>>>,
    failing: Mutex<HashSet<QueryName>>,
    issued: Mutex<Vec<(QueryName, String)>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rows(&self, name: QueryName, rows: Vec<CatalogRow>) {
        self.rows.lock().unwrap().insert(name, rows);
    }

    pub fn fail_on(&self, name: QueryName) {
        self.failing.lock().unwrap().insert(name);
    }

    pub fn issued(&self) -> Vec<QueryName> {
        self.issued.lock().unwrap().iter().map(|(name, _)| *name).collect()
    }

    pub fn issued_sql(&self) -> Vec<String> {
        self.issued.lock().unwrap().iter().map(|(_, sql)| sql.clone()).collect()
    }

    pub fn clear_issued(&self) {
        self.issued.lock().unwrap().clear();
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn query(&self, name: QueryName, sql: &str) -> Result<Vec<CatalogRow>, AppError> {
        self.issued.lock().unwrap().push((name, sql.to_string()));
        if self.failing.lock().unwrap().contains(&name) {
            return Err(AppError::Connection(format!("{} failed", name)));
        }
        Ok(self.rows.lock().unwrap().get(&name).cloned().unwrap_or_default())
    }
}

pub fn row(pairs: &[(&str, Value)]) -> CatalogRow {
    CatalogRow::from_pairs(pairs.iter().map(|(k, v)| (*k, v.clone())))
}

pub fn table_row(schema: &str, name: &str, columns_hash: &str, constraints_hash: &str) -> CatalogRow {
    row(&[
        ("schema_name", json!(schema)),
        ("pure_name", json!(name)),
        ("hash_code_columns", json!(columns_hash)),
        ("hash_code_constraints", json!(constraints_hash)),
    ])
}

pub fn column_row(schema: &str, table: &str, column: &str, data_type: &str, nullable: &str) -> CatalogRow {
    row(&[
        ("schema_name", json!(schema)),
        ("pure_name", json!(table)),
        ("column_name", json!(column)),
        ("data_type", json!(data_type)),
        ("is_nullable", json!(nullable)),
    ])
}

pub fn hash_row(schema: &str, name: &str, hash: &str) -> CatalogRow {
    row(&[
        ("schema_name", json!(schema)),
        ("pure_name", json!(name)),
        ("hash_code", json!(hash)),
    ])
}

pub fn view_row(schema: &str, name: &str, body: &str, hash: &str) -> CatalogRow {
    row(&[
        ("schema_name", json!(schema)),
        ("pure_name", json!(name)),
        ("create_sql", json!(body)),
        ("hash_code", json!(hash)),
    ])
}

pub fn routine_row(schema: &str, name: &str, object_type: &str, hash: &str) -> CatalogRow {
    row(&[
        ("schema_name", json!(schema)),
        ("pure_name", json!(name)),
        ("object_type", json!(object_type)),
        ("definition", json!("BEGIN NULL; END")),
        ("language", json!("plpgsql")),
        ("data_type", json!("integer")),
        ("hash_code", json!(hash)),
    ])
}
