//! Schema object model
//!
//! Normalized description of the objects found in a database catalog. Every
//! object is keyed by an [`ObjectIdentity`]; a [`SchemaSnapshot`] holds the
//! complete object graph and a [`PartialSchemaSnapshot`] only the identities
//! and content hashes produced by the fast pass.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of schema objects the analyser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaObjectKind {
    Table,
    View,
    MaterializedView,
    Procedure,
    Function,
}

impl SchemaObjectKind {
    pub const ALL: [SchemaObjectKind; 5] = [
        SchemaObjectKind::Table,
        SchemaObjectKind::View,
        SchemaObjectKind::MaterializedView,
        SchemaObjectKind::Procedure,
        SchemaObjectKind::Function,
    ];

    /// Collection name used in the string-form identity (`tables`, `views`, ...)
    pub fn type_field(&self) -> &'static str {
        match self {
            SchemaObjectKind::Table => "tables",
            SchemaObjectKind::View => "views",
            SchemaObjectKind::MaterializedView => "matviews",
            SchemaObjectKind::Procedure => "procedures",
            SchemaObjectKind::Function => "functions",
        }
    }

    pub fn from_type_field(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_field() == field)
    }
}

impl fmt::Display for SchemaObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_field())
    }
}

/// `(kind, schemaName, pureName)`, unique within one snapshot.
///
/// The string form `kind:schema.name` is the addressing token used by callers
/// for single-object requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdentity {
    pub kind: SchemaObjectKind,
    pub schema_name: String,
    pub pure_name: String,
}

impl ObjectIdentity {
    pub fn new(kind: SchemaObjectKind, schema_name: impl Into<String>, pure_name: impl Into<String>) -> Self {
        Self {
            kind,
            schema_name: schema_name.into(),
            pure_name: pure_name.into(),
        }
    }

    /// Parse `kind:schema.name`, or `kind:name` with `default_schema` filled in.
    ///
    /// The schema is everything before the first dot, so object names may
    /// themselves contain dots.
    pub fn parse(text: &str, default_schema: &str) -> Result<Self, AppError> {
        let (type_field, qualified) = text
            .split_once(':')
            .ok_or_else(|| AppError::InvalidIdentity(format!("'{}' has no kind prefix", text)))?;

        let kind = SchemaObjectKind::from_type_field(type_field)
            .ok_or_else(|| AppError::InvalidIdentity(format!("unknown object kind '{}'", type_field)))?;

        let (schema_name, pure_name) = match qualified.split_once('.') {
            Some((schema, name)) if !schema.is_empty() => (schema, name),
            Some((_, name)) => (default_schema, name),
            None => (default_schema, qualified),
        };

        if pure_name.is_empty() {
            return Err(AppError::InvalidIdentity(format!("'{}' has no object name", text)));
        }

        Ok(Self::new(kind, schema_name, pure_name))
    }

    /// String-form identity, e.g. `tables:public.orders`
    pub fn object_id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.kind.type_field(), self.schema_name, self.pure_name)
    }
}

/// Column of a table, view or materialized view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub not_null: bool,
    /// Raw default expression; absent for engine-managed (auto increment) columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub auto_increment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnReference {
    pub column_name: String,
}

/// Primary key or unique constraint. Column order is the catalog's key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintInfo {
    pub constraint_name: String,
    pub columns: Vec<ColumnReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyColumn {
    pub column_name: String,
    pub ref_column_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub columns: Vec<ForeignKeyColumn>,
    pub ref_table_name: String,
    pub ref_schema_name: String,
    pub update_action: String,
    pub delete_action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub constraint_name: String,
    pub is_unique: bool,
    pub columns: Vec<ColumnReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    #[serde(flatten)]
    pub identity: ObjectIdentity,
    pub content_hash: Option<String>,
    pub columns: Vec<ColumnInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<ConstraintInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
    pub uniques: Vec<ConstraintInfo>,
}

/// View or materialized view; `identity.kind` tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewInfo {
    #[serde(flatten)]
    pub identity: ObjectIdentity,
    pub content_hash: Option<String>,
    pub create_sql: String,
    pub columns: Vec<ColumnInfo>,
}

pub type MaterializedViewInfo = ViewInfo;

/// Procedure or function; `data_type` is the return type of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineInfo {
    #[serde(flatten)]
    pub identity: ObjectIdentity,
    pub content_hash: Option<String>,
    pub create_sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// A single owned schema object of any kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "objectType", rename_all = "camelCase")]
pub enum SchemaObject {
    Table(TableInfo),
    View(ViewInfo),
    MaterializedView(MaterializedViewInfo),
    Procedure(RoutineInfo),
    Function(RoutineInfo),
}

impl SchemaObject {
    pub fn identity(&self) -> &ObjectIdentity {
        match self {
            SchemaObject::Table(t) => &t.identity,
            SchemaObject::View(v) | SchemaObject::MaterializedView(v) => &v.identity,
            SchemaObject::Procedure(r) | SchemaObject::Function(r) => &r.identity,
        }
    }
}

/// Full schema description produced by one analysis.
///
/// `matviews` is `None` when the dialect has no materialized views, which is
/// distinct from a dialect that has them but the database defines none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    pub tables: Vec<TableInfo>,
    pub views: Vec<ViewInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matviews: Option<Vec<MaterializedViewInfo>>,
    pub procedures: Vec<RoutineInfo>,
    pub functions: Vec<RoutineInfo>,
}

impl SchemaSnapshot {
    /// Identity and content hash of every object, in snapshot order
    pub fn object_hashes(&self) -> Vec<ObjectHash> {
        let tables = self
            .tables
            .iter()
            .map(|t| ObjectHash::new(t.identity.clone(), t.content_hash.clone()));
        let views = self
            .views
            .iter()
            .chain(self.matviews.iter().flatten())
            .map(|v| ObjectHash::new(v.identity.clone(), v.content_hash.clone()));
        let routines = self
            .procedures
            .iter()
            .chain(&self.functions)
            .map(|r| ObjectHash::new(r.identity.clone(), r.content_hash.clone()));

        tables.chain(views).chain(routines).collect()
    }

    pub fn object_count(&self) -> usize {
        self.tables.len()
            + self.views.len()
            + self.matviews.as_ref().map_or(0, Vec::len)
            + self.procedures.len()
            + self.functions.len()
    }

    pub fn contains(&self, identity: &ObjectIdentity) -> bool {
        self.position(identity).is_some()
    }

    fn position(&self, identity: &ObjectIdentity) -> Option<usize> {
        match identity.kind {
            SchemaObjectKind::Table => self.tables.iter().position(|t| &t.identity == identity),
            SchemaObjectKind::View => self.views.iter().position(|v| &v.identity == identity),
            SchemaObjectKind::MaterializedView => self
                .matviews
                .as_ref()?
                .iter()
                .position(|v| &v.identity == identity),
            SchemaObjectKind::Procedure => self.procedures.iter().position(|r| &r.identity == identity),
            SchemaObjectKind::Function => self.functions.iter().position(|r| &r.identity == identity),
        }
    }

    /// Remove and return the object with the given identity
    pub fn take(&mut self, identity: &ObjectIdentity) -> Option<SchemaObject> {
        let idx = self.position(identity)?;
        let object = match identity.kind {
            SchemaObjectKind::Table => SchemaObject::Table(self.tables.remove(idx)),
            SchemaObjectKind::View => SchemaObject::View(self.views.remove(idx)),
            SchemaObjectKind::MaterializedView => {
                SchemaObject::MaterializedView(self.matviews.as_mut()?.remove(idx))
            }
            SchemaObjectKind::Procedure => SchemaObject::Procedure(self.procedures.remove(idx)),
            SchemaObjectKind::Function => SchemaObject::Function(self.functions.remove(idx)),
        };
        Some(object)
    }

    pub fn remove(&mut self, identity: &ObjectIdentity) -> bool {
        self.take(identity).is_some()
    }

    /// Replace the object with the same identity in place, or append it.
    pub fn upsert(&mut self, object: SchemaObject) {
        fn put<T>(list: &mut Vec<T>, idx: Option<usize>, item: T) {
            match idx {
                Some(i) => list[i] = item,
                None => list.push(item),
            }
        }

        let idx = self.position(object.identity());
        match object {
            SchemaObject::Table(t) => put(&mut self.tables, idx, t),
            SchemaObject::View(v) => put(&mut self.views, idx, v),
            SchemaObject::MaterializedView(v) => put(self.matviews.get_or_insert_with(Vec::new), idx, v),
            SchemaObject::Procedure(r) => put(&mut self.procedures, idx, r),
            SchemaObject::Function(r) => put(&mut self.functions, idx, r),
        }
    }
}

/// `{identity, contentHash}` pair produced by the fast pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHash {
    #[serde(flatten)]
    pub identity: ObjectIdentity,
    pub content_hash: Option<String>,
}

impl ObjectHash {
    pub fn new(identity: ObjectIdentity, content_hash: Option<String>) -> Self {
        Self {
            identity,
            content_hash,
        }
    }
}

/// Hash-only view of a schema, one list per object kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSchemaSnapshot {
    pub tables: Vec<ObjectHash>,
    pub views: Vec<ObjectHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matviews: Option<Vec<ObjectHash>>,
    pub procedures: Vec<ObjectHash>,
    pub functions: Vec<ObjectHash>,
}

impl PartialSchemaSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &ObjectHash> {
        self.tables
            .iter()
            .chain(&self.views)
            .chain(self.matviews.iter().flatten())
            .chain(&self.procedures)
            .chain(&self.functions)
    }
}
