//! Column normalization
//!
//! Turns a decoded catalog column into a [`ColumnInfo`]: type names go through
//! the dialect alias table and pick up their length or precision, nullability
//! flags collapse to `not_null`, and sequence-backed defaults become
//! `auto_increment`.

use crate::analyser::dialect::DialectDescriptor;
use crate::analyser::model::ColumnInfo;
use crate::analyser::rows::ColumnRow;

/// Character and binary types take a length parameter
pub fn is_type_string(data_type: &str) -> bool {
    let lower = data_type.to_ascii_lowercase();
    lower.contains("char") || lower.contains("binary")
}

/// Exact numeric types take `(precision,scale)`
pub fn is_type_numeric(data_type: &str) -> bool {
    let lower = data_type.to_ascii_lowercase();
    lower.contains("numeric") || lower.contains("decimal") || lower.contains("number")
}

pub fn full_data_type(dialect: &DialectDescriptor, row: &ColumnRow) -> String {
    let data_type = dialect.normalize_type_name(&row.data_type);

    match (row.char_max_length, row.numeric_precision, row.numeric_scale) {
        (Some(length), _, _) if length > 0 && is_type_string(data_type) => {
            format!("{}({})", data_type, length)
        }
        (_, Some(precision), Some(scale)) if precision > 0 && is_type_numeric(data_type) => {
            format!("{}({},{})", data_type, precision, scale)
        }
        _ => data_type.to_string(),
    }
}

pub fn column_info(dialect: &DialectDescriptor, row: &ColumnRow) -> ColumnInfo {
    let auto_increment = row
        .default_value
        .as_deref()
        .is_some_and(|default| dialect.is_auto_increment_default(default));

    ColumnInfo {
        column_name: row.column_name.clone(),
        data_type: full_data_type(dialect, row),
        // A missing nullability flag counts as NOT NULL
        not_null: !row.is_nullable.unwrap_or(false),
        default_value: if auto_increment { None } else { row.default_value.clone() },
        auto_increment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column(data_type: &str) -> ColumnRow {
        ColumnRow {
            schema_name: "public".to_string(),
            pure_name: "orders".to_string(),
            column_name: "c".to_string(),
            data_type: data_type.to_string(),
            is_nullable: Some(true),
            char_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            default_value: None,
        }
    }

    #[test]
    fn test_sequence_default_is_auto_increment() {
        let dialect = DialectDescriptor::postgres();
        let mut row = column("integer");
        row.is_nullable = Some(false);
        row.default_value = Some("nextval('orders_id_seq'::regclass)".to_string());

        assert_eq!(
            column_info(&dialect, &row),
            ColumnInfo {
                column_name: "c".to_string(),
                data_type: "integer".to_string(),
                not_null: true,
                default_value: None,
                auto_increment: true,
            }
        );
    }

    #[test]
    fn test_plain_default_is_kept() {
        let dialect = DialectDescriptor::postgres();
        let mut row = column("text");
        row.default_value = Some("'new'::text".to_string());

        let info = column_info(&dialect, &row);
        assert!(!info.auto_increment);
        assert_eq!(info.default_value.as_deref(), Some("'new'::text"));
    }

    #[test]
    fn test_varchar_gets_length() {
        let dialect = DialectDescriptor::postgres();
        let mut row = column("character varying");
        row.char_max_length = Some(255);
        assert_eq!(full_data_type(&dialect, &row), "varchar(255)");
    }

    #[test]
    fn test_numeric_gets_precision_and_scale() {
        let dialect = DialectDescriptor::postgres();
        let mut row = column("numeric");
        row.numeric_precision = Some(10);
        row.numeric_scale = Some(2);
        assert_eq!(full_data_type(&dialect, &row), "numeric(10,2)");

        row.numeric_scale = Some(0);
        assert_eq!(full_data_type(&dialect, &row), "numeric(10,0)");
    }

    #[test]
    fn test_integer_ignores_catalog_precision() {
        let dialect = DialectDescriptor::postgres();
        let mut row = column("integer");
        row.numeric_precision = Some(32);
        row.numeric_scale = Some(0);
        assert_eq!(full_data_type(&dialect, &row), "integer");
    }

    #[test]
    fn test_timestamp_alias() {
        let dialect = DialectDescriptor::postgres();
        assert_eq!(full_data_type(&dialect, &column("timestamp without time zone")), "timestamp");
    }

    #[test]
    fn test_nullability_flags() {
        let dialect = DialectDescriptor::postgres();
        let mut row = column("text");

        row.is_nullable = Some(true);
        assert!(!column_info(&dialect, &row).not_null);

        row.is_nullable = Some(false);
        assert!(column_info(&dialect, &row).not_null);

        row.is_nullable = None;
        assert!(column_info(&dialect, &row).not_null);
    }
}
