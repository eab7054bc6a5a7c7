//! Typed row decoding
//!
//! One decoder per logical query. Identity fields must be present and
//! non-empty; rows that fail to decode are dropped with a warning so a single
//! odd catalog row never aborts an analysis.

use crate::analyser::dialect::QueryName;
use crate::analyser::executor::CatalogRow;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("empty identity field '{0}'")]
    EmptyIdentity(&'static str),

    #[error("unexpected value '{1}' in field '{0}'")]
    InvalidValue(&'static str, String),
}

pub trait DecodeRow: Sized {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError>;
}

fn required(row: &CatalogRow, field: &'static str) -> Result<String, DecodeError> {
    row.text(field).ok_or(DecodeError::MissingField(field))
}

fn identity_field(row: &CatalogRow, field: &'static str) -> Result<String, DecodeError> {
    let value = required(row, field)?;
    if value.trim().is_empty() {
        return Err(DecodeError::EmptyIdentity(field));
    }
    Ok(value)
}

/// Decode every row of a query result, dropping (and counting) failures
pub fn decode_rows<T: DecodeRow>(query: QueryName, rows: &[CatalogRow], dropped: &mut usize) -> Vec<T> {
    rows.iter()
        .filter_map(|row| match T::decode(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(query = %query, error = %e, "Dropping undecodable catalog row");
                *dropped += 1;
                None
            }
        })
        .collect()
}

/// `(schema_name, pure_name)` of the object a row belongs to
pub type OwnerKey = (String, String);

pub trait Owned {
    fn owner(&self) -> OwnerKey;
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub schema_name: String,
    pub pure_name: String,
    pub hash_code_columns: Option<String>,
    pub hash_code_constraints: Option<String>,
}

impl TableRow {
    /// Composite `columns-constraints` hash; absent when the columns hash is
    pub fn content_hash(&self) -> Option<String> {
        self.hash_code_columns.as_ref().map(|columns| {
            format!(
                "{}-{}",
                columns,
                self.hash_code_constraints.as_deref().unwrap_or_default()
            )
        })
    }
}

impl DecodeRow for TableRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        Ok(Self {
            schema_name: identity_field(row, "schema_name")?,
            pure_name: identity_field(row, "pure_name")?,
            hash_code_columns: row.text("hash_code_columns"),
            hash_code_constraints: row.text("hash_code_constraints"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ColumnRow {
    pub schema_name: String,
    pub pure_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: Option<bool>,
    pub char_max_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
    pub default_value: Option<String>,
}

impl DecodeRow for ColumnRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        Ok(Self {
            schema_name: identity_field(row, "schema_name")?,
            pure_name: identity_field(row, "pure_name")?,
            column_name: identity_field(row, "column_name")?,
            data_type: required(row, "data_type")?,
            is_nullable: row.flag("is_nullable"),
            char_max_length: row.integer("char_max_length"),
            numeric_precision: row.integer("numeric_precision"),
            numeric_scale: row.integer("numeric_scale"),
            default_value: row.text("default_value"),
        })
    }
}

impl Owned for ColumnRow {
    fn owner(&self) -> OwnerKey {
        (self.schema_name.clone(), self.pure_name.clone())
    }
}

#[derive(Debug, Clone)]
pub struct PrimaryKeyRow {
    pub schema_name: String,
    pub pure_name: String,
    pub constraint_name: String,
    pub column_name: String,
}

impl DecodeRow for PrimaryKeyRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        Ok(Self {
            schema_name: identity_field(row, "schema_name")?,
            pure_name: identity_field(row, "pure_name")?,
            constraint_name: identity_field(row, "constraint_name")?,
            column_name: required(row, "column_name")?,
        })
    }
}

impl Owned for PrimaryKeyRow {
    fn owner(&self) -> OwnerKey {
        (self.schema_name.clone(), self.pure_name.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub schema_name: String,
    pub pure_name: String,
    pub constraint_name: String,
    pub column_name: String,
    pub ref_column_name: String,
    pub ref_table_name: String,
    pub ref_schema_name: String,
    pub update_action: String,
    pub delete_action: String,
}

impl DecodeRow for ForeignKeyRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        Ok(Self {
            schema_name: identity_field(row, "schema_name")?,
            pure_name: identity_field(row, "pure_name")?,
            constraint_name: identity_field(row, "constraint_name")?,
            column_name: required(row, "column_name")?,
            ref_column_name: required(row, "ref_column_name")?,
            ref_table_name: identity_field(row, "ref_table_name")?,
            ref_schema_name: identity_field(row, "ref_schema_name")?,
            update_action: row.text("update_action").unwrap_or_else(|| "NO ACTION".to_string()),
            delete_action: row.text("delete_action").unwrap_or_else(|| "NO ACTION".to_string()),
        })
    }
}

impl Owned for ForeignKeyRow {
    fn owner(&self) -> OwnerKey {
        (self.schema_name.clone(), self.pure_name.clone())
    }
}

/// Row of `views`, `matviews` and their `*Modifications` counterparts
#[derive(Debug, Clone)]
pub struct ViewRow {
    pub schema_name: String,
    pub pure_name: String,
    pub definition: Option<String>,
    pub hash_code: Option<String>,
}

impl DecodeRow for ViewRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        Ok(Self {
            schema_name: identity_field(row, "schema_name")?,
            pure_name: identity_field(row, "pure_name")?,
            definition: row.text("create_sql").or_else(|| row.text("definition")),
            hash_code: row.text("hash_code"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineType {
    Procedure,
    Function,
}

#[derive(Debug, Clone)]
pub struct RoutineRow {
    pub schema_name: String,
    pub pure_name: String,
    pub object_type: RoutineType,
    pub definition: Option<String>,
    pub language: Option<String>,
    pub data_type: Option<String>,
    pub hash_code: Option<String>,
}

impl DecodeRow for RoutineRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        let raw_type = required(row, "object_type")?;
        let object_type = match raw_type.to_ascii_uppercase().as_str() {
            "PROCEDURE" => RoutineType::Procedure,
            "FUNCTION" => RoutineType::Function,
            _ => return Err(DecodeError::InvalidValue("object_type", raw_type)),
        };

        Ok(Self {
            schema_name: identity_field(row, "schema_name")?,
            pure_name: identity_field(row, "pure_name")?,
            object_type,
            definition: row.text("definition"),
            language: row.text("language"),
            data_type: row.text("data_type"),
            hash_code: row.text("hash_code"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct IndexRow {
    pub oid: i64,
    pub schema_name: String,
    pub table_name: String,
    pub index_name: String,
    pub is_unique: bool,
    /// Column numbers in key order
    pub column_numbers: Vec<String>,
}

impl DecodeRow for IndexRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        Ok(Self {
            oid: row.integer("oid").ok_or(DecodeError::MissingField("oid"))?,
            schema_name: identity_field(row, "schema_name")?,
            table_name: identity_field(row, "table_name")?,
            index_name: identity_field(row, "index_name")?,
            is_unique: row.flag("is_unique").unwrap_or(false),
            column_numbers: row
                .text("indkey")
                .unwrap_or_default()
                .split_whitespace()
                .map(String::from)
                .collect(),
        })
    }
}

impl Owned for IndexRow {
    fn owner(&self) -> OwnerKey {
        (self.schema_name.clone(), self.table_name.clone())
    }
}

#[derive(Debug, Clone)]
pub struct IndexColumnRow {
    pub oid: i64,
    pub attnum: i64,
    pub column_name: String,
}

impl DecodeRow for IndexColumnRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        Ok(Self {
            oid: row.integer("oid").ok_or(DecodeError::MissingField("oid"))?,
            attnum: row.integer("attnum").ok_or(DecodeError::MissingField("attnum"))?,
            column_name: identity_field(row, "column_name")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UniqueNameRow {
    pub constraint_name: String,
    pub schema_name: Option<String>,
}

impl DecodeRow for UniqueNameRow {
    fn decode(row: &CatalogRow) -> Result<Self, DecodeError> {
        Ok(Self {
            constraint_name: identity_field(row, "constraint_name")?,
            schema_name: row.text("schema_name").filter(|s| !s.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::testing::row;
    use serde_json::json;

    #[test]
    fn test_empty_identity_is_rejected() {
        let r = row(&[("schema_name", json!("public")), ("pure_name", json!(""))]);
        assert_eq!(TableRow::decode(&r).unwrap_err(), DecodeError::EmptyIdentity("pure_name"));

        let r = row(&[("schema_name", json!(null)), ("pure_name", json!("t"))]);
        assert_eq!(TableRow::decode(&r).unwrap_err(), DecodeError::MissingField("schema_name"));
    }

    #[test]
    fn test_table_hash_composition() {
        let r = row(&[
            ("schema_name", json!("public")),
            ("pure_name", json!("orders")),
            ("hash_code_columns", json!("abc")),
            ("hash_code_constraints", json!("def")),
        ]);
        assert_eq!(TableRow::decode(&r).unwrap().content_hash().as_deref(), Some("abc-def"));

        let r = row(&[("schema_name", json!("public")), ("pure_name", json!("orders"))]);
        assert_eq!(TableRow::decode(&r).unwrap().content_hash(), None);
    }

    #[test]
    fn test_routine_type_discriminator() {
        let r = row(&[
            ("schema_name", json!("public")),
            ("pure_name", json!("p")),
            ("object_type", json!("procedure")),
        ]);
        assert_eq!(RoutineRow::decode(&r).unwrap().object_type, RoutineType::Procedure);

        let r = row(&[
            ("schema_name", json!("public")),
            ("pure_name", json!("agg")),
            ("object_type", json!("AGGREGATE")),
        ]);
        assert!(matches!(RoutineRow::decode(&r), Err(DecodeError::InvalidValue("object_type", _))));
    }

    #[test]
    fn test_index_key_split() {
        let r = row(&[
            ("oid", json!(42)),
            ("schema_name", json!("public")),
            ("table_name", json!("users")),
            ("index_name", json!("ix_users_name")),
            ("is_unique", json!(false)),
            ("indkey", json!("3 1")),
        ]);
        assert_eq!(IndexRow::decode(&r).unwrap().column_numbers, vec!["3", "1"]);
    }

    #[test]
    fn test_decode_rows_counts_drops() {
        let rows = vec![
            row(&[("schema_name", json!("public")), ("pure_name", json!("a"))]),
            row(&[("pure_name", json!("b"))]),
        ];
        let mut dropped = 0;
        let decoded: Vec<TableRow> = decode_rows(QueryName::Tables, &rows, &mut dropped);
        assert_eq!(decoded.len(), 1);
        assert_eq!(dropped, 1);
    }
}
