//! Dialect capability descriptor
//!
//! Static, per-engine configuration: capability flags plus the catalog query
//! templates. Dialect differences are expressed here as data; the analyser
//! itself never branches on the engine name.

use crate::analyser::model::SchemaObjectKind;
use crate::analyser::sql;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Token replaced by the object-id predicate when a template is rendered
pub const OBJECT_ID_CONDITION: &str = "=OBJECT_ID_CONDITION";

/// Logical names of the catalog queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryName {
    Tables,
    Columns,
    PrimaryKeys,
    ForeignKeys,
    Views,
    Matviews,
    MatviewColumns,
    Routines,
    Indexes,
    Indexcols,
    UniqueNames,
    TableModifications,
    ViewModifications,
    MatviewModifications,
    RoutineModifications,
}

impl QueryName {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryName::Tables => "tables",
            QueryName::Columns => "columns",
            QueryName::PrimaryKeys => "primaryKeys",
            QueryName::ForeignKeys => "foreignKeys",
            QueryName::Views => "views",
            QueryName::Matviews => "matviews",
            QueryName::MatviewColumns => "matviewColumns",
            QueryName::Routines => "routines",
            QueryName::Indexes => "indexes",
            QueryName::Indexcols => "indexcols",
            QueryName::UniqueNames => "uniqueNames",
            QueryName::TableModifications => "tableModifications",
            QueryName::ViewModifications => "viewModifications",
            QueryName::MatviewModifications => "matviewModifications",
            QueryName::RoutineModifications => "routineModifications",
        }
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog query template and the object kinds its id predicate ranges over
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub sql: String,
    pub scope: Vec<SchemaObjectKind>,
}

impl QueryTemplate {
    pub fn covers(&self, kind: SchemaObjectKind) -> bool {
        self.scope.contains(&kind)
    }
}

/// Read-only description of what a database engine's catalog can do
#[derive(Debug, Clone)]
pub struct DialectDescriptor {
    name: String,
    default_schema: String,
    supports_aggregate_hash: bool,
    supports_materialized_views: bool,
    supports_index_enumeration: bool,
    substitutions: Vec<(String, String)>,
    type_aliases: Vec<(String, String)>,
    auto_increment_prefixes: Vec<String>,
    templates: HashMap<QueryName, QueryTemplate>,
}

impl DialectDescriptor {
    /// Empty descriptor: no capabilities, no templates
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_schema: "public".to_string(),
            supports_aggregate_hash: false,
            supports_materialized_views: false,
            supports_index_enumeration: false,
            substitutions: Vec::new(),
            type_aliases: Vec::new(),
            auto_increment_prefixes: Vec::new(),
            templates: HashMap::new(),
        }
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn with_aggregate_hash(mut self, enabled: bool) -> Self {
        self.supports_aggregate_hash = enabled;
        self
    }

    pub fn with_materialized_views(mut self, enabled: bool) -> Self {
        self.supports_materialized_views = enabled;
        self
    }

    pub fn with_index_enumeration(mut self, enabled: bool) -> Self {
        self.supports_index_enumeration = enabled;
        self
    }

    /// Fixed find/replace applied to every rendered template
    pub fn with_substitution(mut self, token: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.substitutions.push((token.into(), replacement.into()));
        self
    }

    pub fn with_type_alias(mut self, raw: impl Into<String>, normalized: impl Into<String>) -> Self {
        self.type_aliases.push((raw.into(), normalized.into()));
        self
    }

    pub fn with_auto_increment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.auto_increment_prefixes.push(prefix.into());
        self
    }

    pub fn with_template(mut self, name: QueryName, sql: impl Into<String>, scope: &[SchemaObjectKind]) -> Self {
        self.templates.insert(
            name,
            QueryTemplate {
                sql: sql.into(),
                scope: scope.to_vec(),
            },
        );
        self
    }

    pub fn without_template(mut self, name: QueryName) -> Self {
        self.templates.remove(&name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    pub fn supports_aggregate_hash(&self) -> bool {
        self.supports_aggregate_hash
    }

    pub fn supports_materialized_views(&self) -> bool {
        self.supports_materialized_views
    }

    pub fn supports_index_enumeration(&self) -> bool {
        self.supports_index_enumeration
    }

    pub fn substitutions(&self) -> &[(String, String)] {
        &self.substitutions
    }

    pub fn template(&self, name: QueryName) -> Option<&QueryTemplate> {
        self.templates.get(&name)
    }

    /// Server hashes are only trusted when the dialect can compute them;
    /// otherwise every object carries `None`.
    pub fn gate_hash(&self, hash: Option<String>) -> Option<String> {
        if self.supports_aggregate_hash {
            hash
        } else {
            None
        }
    }

    /// Map a raw catalog type name through the alias table
    pub fn normalize_type_name<'a>(&'a self, raw: &'a str) -> &'a str {
        self.type_aliases
            .iter()
            .find(|(from, _)| from == raw)
            .map(|(_, to)| to.as_str())
            .unwrap_or(raw)
    }

    /// Heuristic: a default expression produced by a sequence generator
    pub fn is_auto_increment_default(&self, default_value: &str) -> bool {
        self.auto_increment_prefixes
            .iter()
            .any(|prefix| default_value.starts_with(prefix.as_str()))
    }

    /// Look up one of the built-in dialects by name
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::postgres()),
            "cockroach" | "cockroachdb" => Some(Self::cockroach()),
            "redshift" => Some(Self::redshift()),
            _ => None,
        }
    }

    /// PostgreSQL: every capability, hashes computed with `string_agg` + `md5`
    pub fn postgres() -> Self {
        use SchemaObjectKind::*;

        Self::new("postgres")
            .with_aggregate_hash(true)
            .with_materialized_views(true)
            .with_index_enumeration(true)
            .with_substitution("#REFTABLECOND#", "")
            .with_type_alias("character varying", "varchar")
            .with_type_alias("timestamp without time zone", "timestamp")
            .with_auto_increment_prefix("nextval(")
            .with_template(QueryName::Tables, sql::TABLE_MODIFICATIONS, &[Table])
            .with_template(QueryName::Columns, sql::COLUMNS, &[Table, View])
            .with_template(QueryName::PrimaryKeys, sql::PRIMARY_KEYS, &[Table])
            .with_template(QueryName::ForeignKeys, sql::FOREIGN_KEYS, &[Table])
            .with_template(QueryName::Views, sql::VIEWS, &[View])
            .with_template(QueryName::Matviews, sql::MATVIEWS, &[MaterializedView])
            .with_template(QueryName::MatviewColumns, sql::MATVIEW_COLUMNS, &[MaterializedView])
            .with_template(QueryName::Routines, sql::ROUTINES, &[Procedure, Function])
            .with_template(QueryName::Indexes, sql::INDEXES, &[Table])
            .with_template(QueryName::Indexcols, sql::INDEX_COLUMNS, &[Table])
            .with_template(QueryName::UniqueNames, sql::UNIQUE_NAMES, &[Table])
            .with_template(QueryName::TableModifications, sql::TABLE_MODIFICATIONS, &[Table])
            .with_template(QueryName::ViewModifications, sql::VIEW_MODIFICATIONS, &[View])
            .with_template(QueryName::MatviewModifications, sql::MATVIEW_MODIFICATIONS, &[MaterializedView])
            .with_template(QueryName::RoutineModifications, sql::ROUTINE_MODIFICATIONS, &[Procedure, Function])
    }

    /// CockroachDB: PostgreSQL catalog, no materialized views, and foreign
    /// key joins need an explicit referenced-table predicate.
    pub fn cockroach() -> Self {
        let mut dialect = Self::postgres()
            .with_materialized_views(false)
            .without_template(QueryName::Matviews)
            .without_template(QueryName::MatviewColumns)
            .without_template(QueryName::MatviewModifications)
            .with_auto_increment_prefix("unique_rowid(");
        dialect.name = "cockroach".to_string();
        dialect.substitutions = vec![(
            "#REFTABLECOND#".to_string(),
            "AND fk.unique_constraint_schema = ref.table_schema".to_string(),
        )];
        dialect
    }

    /// Amazon Redshift: no `string_agg`, no index enumeration
    pub fn redshift() -> Self {
        use SchemaObjectKind::*;

        let mut dialect = Self::postgres()
            .with_aggregate_hash(false)
            .with_materialized_views(false)
            .with_index_enumeration(false)
            .with_auto_increment_prefix("\"identity\"(")
            .with_template(QueryName::Tables, sql::TABLE_LIST, &[Table])
            .with_template(QueryName::TableModifications, sql::TABLE_LIST, &[Table])
            .with_template(QueryName::Routines, sql::ROUTINE_LIST, &[Procedure, Function])
            .with_template(QueryName::RoutineModifications, sql::ROUTINE_NAME_LIST, &[Procedure, Function]);
        for name in [
            QueryName::Matviews,
            QueryName::MatviewColumns,
            QueryName::MatviewModifications,
            QueryName::Indexes,
            QueryName::Indexcols,
        ] {
            dialect.templates.remove(&name);
        }
        dialect.name = "redshift".to_string();
        dialect
    }
}
