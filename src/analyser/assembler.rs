//! Object assembler
//!
//! Joins the row sets of the individual catalog queries into the nested
//! [`SchemaSnapshot`] model. Rows are matched to their owning object by
//! `(schema, name)`; anything that matches nothing is logged and dropped.

use crate::analyser::columns::column_info;
use crate::analyser::ddl;
use crate::analyser::dialect::{DialectDescriptor, QueryName};
use crate::analyser::executor::CatalogRow;
use crate::analyser::model::{
    ColumnInfo, ColumnReference, ConstraintInfo, ForeignKeyColumn, ForeignKeyInfo, IndexInfo,
    ObjectIdentity, RoutineInfo, SchemaObjectKind, SchemaSnapshot, TableInfo, ViewInfo,
};
use crate::analyser::rows::{
    decode_rows, ColumnRow, ForeignKeyRow, IndexColumnRow, IndexRow, Owned, OwnerKey, PrimaryKeyRow,
    RoutineRow, RoutineType, TableRow, UniqueNameRow, ViewRow,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Raw row sets of one analysis, keyed by logical query
#[derive(Debug, Default)]
pub struct RawCatalog {
    rows: HashMap<QueryName, Vec<CatalogRow>>,
    has_matviews: bool,
}

impl RawCatalog {
    /// `has_matviews` is false when the dialect cannot have materialized views
    pub fn new(rows: HashMap<QueryName, Vec<CatalogRow>>, has_matviews: bool) -> Self {
        Self { rows, has_matviews }
    }

    fn rows(&self, name: QueryName) -> &[CatalogRow] {
        self.rows.get(&name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// What one assembly produced and what it had to drop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyReport {
    pub tables: usize,
    pub views: usize,
    pub matviews: usize,
    pub procedures: usize,
    pub functions: usize,
    /// Rows that could not be decoded
    pub dropped_rows: usize,
    /// Decoded rows whose owner is not in the snapshot
    pub unmatched_rows: usize,
    /// Index column references with no matching table column
    pub unresolved_index_columns: usize,
    /// Objects reported more than once by the catalog; the first one wins
    pub duplicate_objects: usize,
}

fn bucket<T: Owned>(rows: Vec<T>) -> HashMap<OwnerKey, Vec<T>> {
    let mut buckets: HashMap<OwnerKey, Vec<T>> = HashMap::new();
    for row in rows {
        buckets.entry(row.owner()).or_default().push(row);
    }
    buckets
}

/// Group rows by constraint name keeping first-appearance order, and the
/// catalog's row order inside each group.
fn group_by_constraint<T>(rows: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<(String, Vec<T>)> {
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for row in rows {
        let key = name(&row).to_string();
        match groups.iter_mut().find(|(n, _)| *n == key) {
            Some((_, group)) => group.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    groups
}

fn report_unmatched<T>(query: QueryName, leftovers: HashMap<OwnerKey, Vec<T>>, report: &mut AssemblyReport) {
    for ((schema, name), rows) in leftovers {
        warn!(
            query = %query,
            object = %format!("{}.{}", schema, name),
            rows = rows.len(),
            "Catalog rows matched no known object"
        );
        report.unmatched_rows += rows.len();
    }
}

pub struct ObjectAssembler<'a> {
    dialect: &'a DialectDescriptor,
}

impl<'a> ObjectAssembler<'a> {
    pub fn new(dialect: &'a DialectDescriptor) -> Self {
        Self { dialect }
    }

    pub fn assemble(&self, raw: &RawCatalog) -> (SchemaSnapshot, AssemblyReport) {
        let mut report = AssemblyReport::default();
        let mut dropped = 0;

        let mut columns = bucket(decode_rows::<ColumnRow>(QueryName::Columns, raw.rows(QueryName::Columns), &mut dropped));
        let mut matview_columns = bucket(decode_rows::<ColumnRow>(
            QueryName::MatviewColumns,
            raw.rows(QueryName::MatviewColumns),
            &mut dropped,
        ));
        let mut primary_keys = bucket(decode_rows::<PrimaryKeyRow>(
            QueryName::PrimaryKeys,
            raw.rows(QueryName::PrimaryKeys),
            &mut dropped,
        ));
        let mut foreign_keys = bucket(decode_rows::<ForeignKeyRow>(
            QueryName::ForeignKeys,
            raw.rows(QueryName::ForeignKeys),
            &mut dropped,
        ));
        let mut indexes = bucket(decode_rows::<IndexRow>(QueryName::Indexes, raw.rows(QueryName::Indexes), &mut dropped));

        let mut index_columns: HashMap<(i64, i64), String> = HashMap::new();
        for col in decode_rows::<IndexColumnRow>(QueryName::Indexcols, raw.rows(QueryName::Indexcols), &mut dropped) {
            index_columns.entry((col.oid, col.attnum)).or_insert(col.column_name);
        }

        let unique_names = UniqueNames::new(decode_rows::<UniqueNameRow>(
            QueryName::UniqueNames,
            raw.rows(QueryName::UniqueNames),
            &mut dropped,
        ));

        let mut seen: HashSet<ObjectIdentity> = HashSet::new();

        let mut tables = Vec::new();
        for row in decode_rows::<TableRow>(QueryName::Tables, raw.rows(QueryName::Tables), &mut dropped) {
            let identity = ObjectIdentity::new(SchemaObjectKind::Table, &row.schema_name, &row.pure_name);
            if !seen.insert(identity.clone()) {
                warn!(object = %identity, "Duplicate object in catalog, keeping the first");
                report.duplicate_objects += 1;
                continue;
            }
            let key = (row.schema_name.clone(), row.pure_name.clone());
            let (plain, uniques) = self.indexes(
                &identity,
                indexes.remove(&key).unwrap_or_default(),
                &index_columns,
                &unique_names,
                &mut report,
            );

            tables.push(TableInfo {
                content_hash: self.dialect.gate_hash(row.content_hash()),
                columns: self.columns(columns.remove(&key)),
                primary_key: Self::primary_key(&identity, primary_keys.remove(&key).unwrap_or_default()),
                foreign_keys: Self::foreign_keys(foreign_keys.remove(&key).unwrap_or_default()),
                indexes: plain,
                uniques,
                identity,
            });
        }

        let views = self.views(
            SchemaObjectKind::View,
            QueryName::Views,
            raw,
            &mut columns,
            &mut seen,
            &mut dropped,
            &mut report,
        );

        let matviews = raw.has_matviews.then(|| {
            self.views(
                SchemaObjectKind::MaterializedView,
                QueryName::Matviews,
                raw,
                &mut matview_columns,
                &mut seen,
                &mut dropped,
                &mut report,
            )
        });

        let mut procedures = Vec::new();
        let mut functions = Vec::new();
        for row in decode_rows::<RoutineRow>(QueryName::Routines, raw.rows(QueryName::Routines), &mut dropped) {
            let kind = match row.object_type {
                RoutineType::Procedure => SchemaObjectKind::Procedure,
                RoutineType::Function => SchemaObjectKind::Function,
            };
            let identity = ObjectIdentity::new(kind, &row.schema_name, &row.pure_name);
            if !seen.insert(identity.clone()) {
                // Overloads share a name; only the first signature is kept
                debug!(object = %identity, "Duplicate routine in catalog, keeping the first");
                report.duplicate_objects += 1;
                continue;
            }
            let routine = self.routine(identity, row);
            match kind {
                SchemaObjectKind::Procedure => procedures.push(routine),
                _ => functions.push(routine),
            }
        }

        report_unmatched(QueryName::Columns, columns, &mut report);
        report_unmatched(QueryName::MatviewColumns, matview_columns, &mut report);
        report_unmatched(QueryName::PrimaryKeys, primary_keys, &mut report);
        report_unmatched(QueryName::ForeignKeys, foreign_keys, &mut report);
        report_unmatched(QueryName::Indexes, indexes, &mut report);

        report.tables = tables.len();
        report.views = views.len();
        report.matviews = matviews.as_ref().map_or(0, Vec::len);
        report.procedures = procedures.len();
        report.functions = functions.len();
        report.dropped_rows = dropped;

        let snapshot = SchemaSnapshot {
            tables,
            views,
            matviews,
            procedures,
            functions,
        };
        (snapshot, report)
    }

    fn columns(&self, rows: Option<Vec<ColumnRow>>) -> Vec<ColumnInfo> {
        rows.unwrap_or_default()
            .iter()
            .map(|row| column_info(self.dialect, row))
            .collect()
    }

    fn primary_key(identity: &ObjectIdentity, rows: Vec<PrimaryKeyRow>) -> Option<ConstraintInfo> {
        let mut groups = group_by_constraint(rows, |r| r.constraint_name.as_str()).into_iter();
        let primary_key = groups.next().map(|(constraint_name, rows)| ConstraintInfo {
            constraint_name,
            columns: rows
                .into_iter()
                .map(|r| ColumnReference { column_name: r.column_name })
                .collect(),
        });
        if groups.next().is_some() {
            warn!(object = %identity, "Several primary keys reported, keeping the first");
        }
        primary_key
    }

    fn foreign_keys(rows: Vec<ForeignKeyRow>) -> Vec<ForeignKeyInfo> {
        group_by_constraint(rows, |r| r.constraint_name.as_str())
            .into_iter()
            .map(|(constraint_name, rows)| {
                let first = &rows[0];
                ForeignKeyInfo {
                    constraint_name,
                    ref_table_name: first.ref_table_name.clone(),
                    ref_schema_name: first.ref_schema_name.clone(),
                    update_action: first.update_action.clone(),
                    delete_action: first.delete_action.clone(),
                    columns: rows
                        .iter()
                        .map(|r| ForeignKeyColumn {
                            column_name: r.column_name.clone(),
                            ref_column_name: r.ref_column_name.clone(),
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// Split index rows into plain indexes and unique constraints
    fn indexes(
        &self,
        table: &ObjectIdentity,
        rows: Vec<IndexRow>,
        index_columns: &HashMap<(i64, i64), String>,
        unique_names: &UniqueNames,
        report: &mut AssemblyReport,
    ) -> (Vec<IndexInfo>, Vec<ConstraintInfo>) {
        let mut plain = Vec::new();
        let mut uniques = Vec::new();
        let mut names = HashSet::new();

        for row in rows {
            if !names.insert(row.index_name.clone()) {
                continue;
            }

            let columns: Vec<ColumnReference> = row
                .column_numbers
                .iter()
                .filter_map(|number| {
                    let resolved = number
                        .parse::<i64>()
                        .ok()
                        .and_then(|attnum| index_columns.get(&(row.oid, attnum)));
                    match resolved {
                        Some(column_name) => Some(ColumnReference {
                            column_name: column_name.clone(),
                        }),
                        None => {
                            warn!(
                                object = %table,
                                index = %row.index_name,
                                column = %number,
                                "Index column reference did not resolve"
                            );
                            report.unresolved_index_columns += 1;
                            None
                        }
                    }
                })
                .collect();

            if unique_names.contains(&row.schema_name, &row.index_name) {
                uniques.push(ConstraintInfo {
                    constraint_name: row.index_name,
                    columns,
                });
            } else {
                plain.push(IndexInfo {
                    constraint_name: row.index_name,
                    is_unique: row.is_unique,
                    columns,
                });
            }
        }

        (plain, uniques)
    }

    #[allow(clippy::too_many_arguments)]
    fn views(
        &self,
        kind: SchemaObjectKind,
        query: QueryName,
        raw: &RawCatalog,
        columns: &mut HashMap<OwnerKey, Vec<ColumnRow>>,
        seen: &mut HashSet<ObjectIdentity>,
        dropped: &mut usize,
        report: &mut AssemblyReport,
    ) -> Vec<ViewInfo> {
        let mut views = Vec::new();
        for row in decode_rows::<ViewRow>(query, raw.rows(query), dropped) {
            let identity = ObjectIdentity::new(kind, &row.schema_name, &row.pure_name);
            if !seen.insert(identity.clone()) {
                warn!(object = %identity, "Duplicate object in catalog, keeping the first");
                report.duplicate_objects += 1;
                continue;
            }
            let key = (row.schema_name.clone(), row.pure_name.clone());
            let definition = row.definition.unwrap_or_default();
            let create_sql = match kind {
                SchemaObjectKind::MaterializedView => {
                    ddl::create_materialized_view(&row.schema_name, &row.pure_name, &definition)
                }
                _ => ddl::create_view(&row.schema_name, &row.pure_name, &definition),
            };

            views.push(ViewInfo {
                identity,
                content_hash: self.dialect.gate_hash(row.hash_code),
                create_sql,
                columns: self.columns(columns.remove(&key)),
            });
        }
        views
    }

    fn routine(&self, identity: ObjectIdentity, row: RoutineRow) -> RoutineInfo {
        let language = row.language.as_deref().unwrap_or("sql");
        let body = row.definition.as_deref().unwrap_or_default();

        let (create_sql, data_type) = match row.object_type {
            RoutineType::Procedure => (
                ddl::create_procedure(&row.schema_name, &row.pure_name, language, body),
                None,
            ),
            RoutineType::Function => {
                let return_type = row.data_type.clone().unwrap_or_else(|| "void".to_string());
                (
                    ddl::create_function(&row.schema_name, &row.pure_name, &return_type, language, body),
                    Some(return_type),
                )
            }
        };

        RoutineInfo {
            identity,
            content_hash: self.dialect.gate_hash(row.hash_code),
            create_sql,
            data_type,
        }
    }
}

/// Partition oracle: index names that back a unique constraint
struct UniqueNames {
    scoped: HashSet<(String, String)>,
    unscoped: HashSet<String>,
}

impl UniqueNames {
    fn new(rows: Vec<UniqueNameRow>) -> Self {
        let mut scoped = HashSet::new();
        let mut unscoped = HashSet::new();
        for row in rows {
            match row.schema_name {
                Some(schema) => {
                    scoped.insert((schema, row.constraint_name));
                }
                None => {
                    unscoped.insert(row.constraint_name);
                }
            }
        }
        Self { scoped, unscoped }
    }

    /// Index and constraint share a schema; rows without a schema match by name
    fn contains(&self, schema_name: &str, index_name: &str) -> bool {
        self.unscoped.contains(index_name)
            || self
                .scoped
                .contains(&(schema_name.to_string(), index_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::testing::{column_row, routine_row, row, table_row, view_row};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(rows: Vec<(QueryName, Vec<CatalogRow>)>) -> RawCatalog {
        RawCatalog::new(rows.into_iter().collect(), true)
    }

    fn column_names(columns: &[ColumnReference]) -> Vec<&str> {
        columns.iter().map(|c| c.column_name.as_str()).collect()
    }

    fn index_row(oid: i64, table: &str, name: &str, unique: bool, indkey: &str) -> CatalogRow {
        row(&[
            ("oid", json!(oid)),
            ("schema_name", json!("public")),
            ("table_name", json!(table)),
            ("index_name", json!(name)),
            ("is_unique", json!(unique)),
            ("indkey", json!(indkey)),
        ])
    }

    fn index_col(oid: i64, attnum: i64, name: &str) -> CatalogRow {
        row(&[("oid", json!(oid)), ("attnum", json!(attnum)), ("column_name", json!(name))])
    }

    #[test]
    fn test_columns_keep_catalog_order() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![
            (QueryName::Tables, vec![table_row("public", "t", "c", "k")]),
            (
                QueryName::Columns,
                vec![
                    column_row("public", "t", "c3", "integer", "NO"),
                    column_row("public", "t", "c1", "text", "YES"),
                    column_row("public", "t", "c2", "text", "YES"),
                ],
            ),
        ]);

        let (snapshot, report) = ObjectAssembler::new(&dialect).assemble(&raw);
        let names: Vec<_> = snapshot.tables[0].columns.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(names, vec!["c3", "c1", "c2"]);
        assert_eq!(report.unmatched_rows, 0);
    }

    #[test]
    fn test_composite_keys_keep_ordinal_order() {
        let dialect = DialectDescriptor::postgres();
        let pk = |col: &str| {
            row(&[
                ("schema_name", json!("public")),
                ("pure_name", json!("order_lines")),
                ("constraint_name", json!("order_lines_pkey")),
                ("column_name", json!(col)),
            ])
        };
        let fk = |name: &str, col: &str, ref_col: &str| {
            row(&[
                ("schema_name", json!("public")),
                ("pure_name", json!("order_lines")),
                ("constraint_name", json!(name)),
                ("column_name", json!(col)),
                ("ref_column_name", json!(ref_col)),
                ("ref_table_name", json!("orders")),
                ("ref_schema_name", json!("public")),
                ("update_action", json!("NO ACTION")),
                ("delete_action", json!("CASCADE")),
            ])
        };
        let raw = raw(vec![
            (QueryName::Tables, vec![table_row("public", "order_lines", "c", "k")]),
            (QueryName::PrimaryKeys, vec![pk("order_id"), pk("line_no")]),
            (
                QueryName::ForeignKeys,
                vec![
                    fk("fk_order", "tenant_id", "tenant_id"),
                    fk("fk_order", "order_id", "id"),
                    fk("fk_product", "product_id", "id"),
                ],
            ),
        ]);

        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&raw);
        let table = &snapshot.tables[0];

        let pk = table.primary_key.as_ref().unwrap();
        assert_eq!(pk.constraint_name, "order_lines_pkey");
        assert_eq!(column_names(&pk.columns), vec!["order_id", "line_no"]);

        assert_eq!(table.foreign_keys.len(), 2);
        let fk = &table.foreign_keys[0];
        assert_eq!(fk.constraint_name, "fk_order");
        assert_eq!(fk.delete_action, "CASCADE");
        assert_eq!(
            fk.columns,
            vec![
                ForeignKeyColumn {
                    column_name: "tenant_id".to_string(),
                    ref_column_name: "tenant_id".to_string()
                },
                ForeignKeyColumn {
                    column_name: "order_id".to_string(),
                    ref_column_name: "id".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unique_index_goes_to_uniques() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![
            (QueryName::Tables, vec![table_row("public", "users", "c", "k")]),
            (
                QueryName::Indexes,
                vec![
                    index_row(10, "users", "ux_email", true, "2"),
                    index_row(10, "users", "ix_name", false, "3 2"),
                    index_row(10, "users", "ux_partial", true, "3"),
                ],
            ),
            (
                QueryName::Indexcols,
                vec![index_col(10, 1, "id"), index_col(10, 2, "email"), index_col(10, 3, "name")],
            ),
            (
                QueryName::UniqueNames,
                vec![row(&[("constraint_name", json!("ux_email")), ("schema_name", json!("public"))])],
            ),
        ]);

        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&raw);
        let table = &snapshot.tables[0];

        let uniques: Vec<_> = table.uniques.iter().map(|u| u.constraint_name.as_str()).collect();
        let indexes: Vec<_> = table.indexes.iter().map(|i| i.constraint_name.as_str()).collect();
        assert_eq!(uniques, vec!["ux_email"]);
        assert_eq!(indexes, vec!["ix_name", "ux_partial"]);

        assert_eq!(column_names(&table.uniques[0].columns), vec!["email"]);
        assert_eq!(column_names(&table.indexes[0].columns), vec!["name", "email"]);
        assert!(table.indexes[1].is_unique);
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let dialect = DialectDescriptor::postgres();
        let names = ["a", "b", "c", "d"];
        let raw = raw(vec![
            (QueryName::Tables, vec![table_row("public", "t", "c", "k")]),
            (
                QueryName::Indexes,
                names.iter().map(|n| index_row(1, "t", n, true, "1")).collect(),
            ),
            (QueryName::Indexcols, vec![index_col(1, 1, "id")]),
            (
                QueryName::UniqueNames,
                vec![
                    row(&[("constraint_name", json!("b")), ("schema_name", json!("public"))]),
                    row(&[("constraint_name", json!("d")), ("schema_name", json!("public"))]),
                ],
            ),
        ]);

        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&raw);
        let table = &snapshot.tables[0];
        let plain: HashSet<_> = table.indexes.iter().map(|i| i.constraint_name.clone()).collect();
        let uniques: HashSet<_> = table.uniques.iter().map(|u| u.constraint_name.clone()).collect();

        assert!(plain.is_disjoint(&uniques));
        let all: HashSet<_> = plain.union(&uniques).cloned().collect();
        assert_eq!(all, names.iter().map(|n| n.to_string()).collect());
    }

    #[test]
    fn test_unique_name_in_other_schema_does_not_match() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![
            (QueryName::Tables, vec![table_row("public", "t", "c", "k")]),
            (QueryName::Indexes, vec![index_row(1, "t", "ux", true, "1")]),
            (QueryName::Indexcols, vec![index_col(1, 1, "id")]),
            (
                QueryName::UniqueNames,
                vec![row(&[("constraint_name", json!("ux")), ("schema_name", json!("audit"))])],
            ),
        ]);

        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&raw);
        assert_eq!(snapshot.tables[0].indexes.len(), 1);
        assert!(snapshot.tables[0].uniques.is_empty());
    }

    #[test]
    fn test_dangling_index_column_is_omitted() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![
            (QueryName::Tables, vec![table_row("public", "t", "c", "k")]),
            (QueryName::Indexes, vec![index_row(7, "t", "ix", false, "1 9 0")]),
            (QueryName::Indexcols, vec![index_col(7, 1, "id")]),
        ]);

        let (snapshot, report) = ObjectAssembler::new(&dialect).assemble(&raw);
        assert_eq!(column_names(&snapshot.tables[0].indexes[0].columns), vec!["id"]);
        assert_eq!(report.unresolved_index_columns, 2);
    }

    #[test]
    fn test_rows_without_identity_never_attach() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![
            (
                QueryName::Tables,
                vec![table_row("public", "t", "c", "k"), table_row("public", "", "c", "k")],
            ),
            (
                QueryName::Columns,
                vec![
                    column_row("public", "t", "id", "integer", "NO"),
                    column_row("", "t", "ghost", "integer", "NO"),
                    column_row("public", "other", "x", "integer", "NO"),
                ],
            ),
        ]);

        let (snapshot, report) = ObjectAssembler::new(&dialect).assemble(&raw);
        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.tables[0].columns.len(), 1);
        assert_eq!(report.dropped_rows, 2);
        assert_eq!(report.unmatched_rows, 1);
    }

    #[test]
    fn test_view_without_columns_is_still_emitted() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![(QueryName::Views, vec![view_row("public", "v", " SELECT 1;", "h")])]);

        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&raw);
        assert_eq!(snapshot.views.len(), 1);
        assert!(snapshot.views[0].columns.is_empty());
        assert_eq!(snapshot.views[0].create_sql, "CREATE VIEW \"public\".\"v\"\nAS\n SELECT 1;");
        assert_eq!(snapshot.views[0].content_hash.as_deref(), Some("h"));
    }

    #[test]
    fn test_view_and_matview_columns_come_from_their_queries() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![
            (QueryName::Views, vec![view_row("public", "v", "SELECT 1", "h1")]),
            (
                QueryName::Matviews,
                vec![row(&[
                    ("schema_name", json!("public")),
                    ("pure_name", json!("m")),
                    ("definition", json!("SELECT 2")),
                    ("hash_code", json!("h2")),
                ])],
            ),
            (QueryName::Columns, vec![column_row("public", "v", "a", "integer", "YES")]),
            (QueryName::MatviewColumns, vec![column_row("public", "m", "b", "integer", "YES")]),
        ]);

        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&raw);
        let matviews = snapshot.matviews.unwrap();
        assert_eq!(snapshot.views[0].columns[0].column_name, "a");
        assert_eq!(matviews[0].columns[0].column_name, "b");
        assert_eq!(matviews[0].identity.kind, SchemaObjectKind::MaterializedView);
        assert!(matviews[0].create_sql.starts_with("CREATE MATERIALIZED VIEW"));
    }

    #[test]
    fn test_matviews_absent_when_dialect_lacks_them() {
        let dialect = DialectDescriptor::cockroach();
        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&RawCatalog::new(HashMap::new(), false));
        assert!(snapshot.matviews.is_none());

        let dialect = DialectDescriptor::postgres();
        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&RawCatalog::new(HashMap::new(), true));
        assert_eq!(snapshot.matviews, Some(vec![]));
    }

    #[test]
    fn test_routines_split_by_type() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![(
            QueryName::Routines,
            vec![
                routine_row("public", "cleanup", "PROCEDURE", "h1"),
                routine_row("public", "total", "FUNCTION", "h2"),
                routine_row("public", "total", "FUNCTION", "h3"),
            ],
        )]);

        let (snapshot, report) = ObjectAssembler::new(&dialect).assemble(&raw);
        assert_eq!(snapshot.procedures.len(), 1);
        assert_eq!(snapshot.functions.len(), 1);
        assert_eq!(report.duplicate_objects, 1);

        assert_eq!(snapshot.procedures[0].data_type, None);
        assert!(snapshot.procedures[0].create_sql.contains("LANGUAGE plpgsql"));
        assert_eq!(snapshot.functions[0].data_type.as_deref(), Some("integer"));
        assert!(snapshot.functions[0].create_sql.contains("RETURNS integer"));
        assert_eq!(snapshot.functions[0].content_hash.as_deref(), Some("h2"));
    }

    #[test]
    fn test_hashes_dropped_without_aggregate_support() {
        let dialect = DialectDescriptor::redshift();
        let raw = RawCatalog::new(
            [
                (QueryName::Tables, vec![table_row("public", "t", "c", "k")]),
                (QueryName::Views, vec![view_row("public", "v", "SELECT 1", "h")]),
            ]
            .into_iter()
            .collect(),
            false,
        );

        let (snapshot, _) = ObjectAssembler::new(&dialect).assemble(&raw);
        assert_eq!(snapshot.tables[0].content_hash, None);
        assert_eq!(snapshot.views[0].content_hash, None);
    }

    #[test]
    fn test_identities_are_unique() {
        let dialect = DialectDescriptor::postgres();
        let raw = raw(vec![
            (
                QueryName::Tables,
                vec![table_row("public", "t", "c", "k"), table_row("public", "t", "c", "k")],
            ),
            (QueryName::Views, vec![view_row("public", "t", "SELECT 1", "h")]),
        ]);

        let (snapshot, report) = ObjectAssembler::new(&dialect).assemble(&raw);
        let ids: Vec<_> = snapshot.object_hashes().into_iter().map(|h| h.identity).collect();
        let unique: HashSet<_> = ids.iter().cloned().collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.views.len(), 1);
        assert_eq!(report.duplicate_objects, 1);
    }
}
