//! Catalog query executor
//!
//! Renders dialect templates and issues them through a [`CatalogSource`], the
//! seam to the database driver. Results are raw rows; decoding happens later.

use crate::analyser::dialect::{DialectDescriptor, QueryName, OBJECT_ID_CONDITION};
use crate::analyser::model::ObjectIdentity;
use crate::error::AppError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// One catalog row: lowercase column name -> scalar value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRow(Map<String, Value>);

impl CatalogRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (key, value) in pairs {
            row.insert(key, value);
        }
        row
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into().to_lowercase(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Textual field; numbers and booleans are rendered as text
    pub fn text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Boolean field; accepts booleans, `YES`/`NO`, `t`/`f` and numbers
    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "t" | "1" => Some(true),
                "no" | "n" | "false" | "f" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// The database driver as the analyser sees it.
///
/// `name` is passed along for logging only; implementations must execute
/// `sql` verbatim.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn query(&self, name: QueryName, sql: &str) -> Result<Vec<CatalogRow>, AppError>;
}

#[async_trait]
impl<T: CatalogSource + ?Sized> CatalogSource for Arc<T> {
    async fn query(&self, name: QueryName, sql: &str) -> Result<Vec<CatalogRow>, AppError> {
        (**self).query(name, sql).await
    }
}

/// Issues named catalog queries for one dialect
pub struct QueryExecutor<S> {
    source: S,
    dialect: Arc<DialectDescriptor>,
    concurrency: usize,
}

impl<S: CatalogSource> QueryExecutor<S> {
    pub fn new(source: S, dialect: Arc<DialectDescriptor>, concurrency: usize) -> Self {
        Self {
            source,
            dialect,
            concurrency: concurrency.max(1),
        }
    }

    pub fn dialect(&self) -> &DialectDescriptor {
        &self.dialect
    }

    /// Render a template: object-id predicate first, then dialect substitutions.
    pub fn render(&self, name: QueryName, filter: Option<&ObjectIdentity>) -> Result<String, AppError> {
        let template = self.dialect.template(name).ok_or_else(|| {
            AppError::UnsupportedQuery(name.as_str().to_string(), self.dialect.name().to_string())
        })?;

        let condition = match filter {
            Some(identity) => format!("= '{}'", identity.object_id().replace('\'', "''")),
            None => "is not null".to_string(),
        };

        let mut sql = template.sql.replace(OBJECT_ID_CONDITION, &condition);
        for (token, replacement) in self.dialect.substitutions() {
            sql = sql.replace(token.as_str(), replacement);
        }
        Ok(sql)
    }

    /// Run one named query.
    ///
    /// With a filter, a query whose templates do not range over the filter's
    /// kind is skipped and yields no rows. Fails with `UnsupportedQuery` when
    /// the dialect has no such template; callers check capability flags first.
    pub async fn run_query(
        &self,
        name: QueryName,
        filter: Option<&ObjectIdentity>,
    ) -> Result<Vec<CatalogRow>, AppError> {
        if let (Some(identity), Some(template)) = (filter, self.dialect.template(name)) {
            if !template.covers(identity.kind) {
                debug!(query = %name, object = %identity, "Skipping query outside object scope");
                return Ok(Vec::new());
            }
        }

        let sql = self.render(name, filter)?;
        let started = Instant::now();
        let rows = self.source.query(name, &sql).await?;

        debug!(
            query = %name,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Catalog query finished"
        );

        Ok(rows)
    }

    /// Run independent queries concurrently, bounded by the executor's limit.
    /// The first failure aborts the whole batch.
    pub async fn run_queries(
        &self,
        names: &[QueryName],
        filter: Option<&ObjectIdentity>,
    ) -> Result<HashMap<QueryName, Vec<CatalogRow>>, AppError> {
        stream::iter(names.iter().copied())
            .map(|name| async move { self.run_query(name, filter).await.map(|rows| (name, rows)) })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::model::SchemaObjectKind;
    use crate::analyser::testing::FakeCatalog;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn executor(dialect: DialectDescriptor) -> (Arc<FakeCatalog>, QueryExecutor<Arc<FakeCatalog>>) {
        let catalog = Arc::new(FakeCatalog::new());
        let executor = QueryExecutor::new(catalog.clone(), Arc::new(dialect), 4);
        (catalog, executor)
    }

    #[test]
    fn test_row_accessors_coerce_scalars() {
        let row = CatalogRow::from_pairs([
            ("IS_NULLABLE", json!("NO")),
            ("is_unique", json!(true)),
            ("attnum", json!("3")),
            ("oid", json!(16384)),
            ("default_value", Value::Null),
        ]);

        assert_eq!(row.flag("is_nullable"), Some(false));
        assert_eq!(row.flag("is_unique"), Some(true));
        assert_eq!(row.integer("attnum"), Some(3));
        assert_eq!(row.text("oid").as_deref(), Some("16384"));
        assert_eq!(row.text("default_value"), None);
    }

    #[test]
    fn test_render_without_filter_matches_everything() {
        let (_, executor) = executor(DialectDescriptor::postgres());
        let sql = executor.render(QueryName::ForeignKeys, None).unwrap();
        assert!(sql.contains("base.table_name) is not null"));
        assert!(!sql.contains(OBJECT_ID_CONDITION));
        assert!(!sql.contains("#REFTABLECOND#"));
    }

    #[test]
    fn test_render_with_filter_escapes_quotes() {
        let (_, executor) = executor(DialectDescriptor::postgres());
        let id = ObjectIdentity::new(SchemaObjectKind::Table, "public", "o'brien");
        let sql = executor.render(QueryName::Columns, Some(&id)).unwrap();
        assert!(sql.contains(") = 'tables:public.o''brien'"));
    }

    #[test]
    fn test_dialect_substitution_applied() {
        let (_, executor) = executor(DialectDescriptor::cockroach());
        let sql = executor.render(QueryName::ForeignKeys, None).unwrap();
        assert!(sql.contains("AND fk.unique_constraint_schema = ref.table_schema"));
    }

    #[tokio::test]
    async fn test_missing_template_is_unsupported() {
        let (catalog, executor) = executor(DialectDescriptor::redshift());
        let err = executor.run_query(QueryName::Indexes, None).await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedQuery(ref q, ref d) if q == "indexes" && d == "redshift"));
        assert!(catalog.issued().is_empty());
    }

    #[tokio::test]
    async fn test_filtered_query_outside_scope_is_skipped() {
        let (catalog, executor) = executor(DialectDescriptor::postgres());
        let id = ObjectIdentity::new(SchemaObjectKind::View, "public", "v");

        let rows = executor.run_query(QueryName::PrimaryKeys, Some(&id)).await.unwrap();
        assert!(rows.is_empty());
        assert!(catalog.issued().is_empty());

        executor.run_query(QueryName::Columns, Some(&id)).await.unwrap();
        assert_eq!(catalog.issued(), vec![QueryName::Columns]);
    }

    #[tokio::test]
    async fn test_run_queries_collects_by_name() {
        let (catalog, executor) = executor(DialectDescriptor::postgres());
        catalog.set_rows(QueryName::Views, vec![CatalogRow::from_pairs([("pure_name", "v")])]);

        let results = executor
            .run_queries(&[QueryName::Views, QueryName::Routines], None)
            .await
            .unwrap();

        assert_eq!(results[&QueryName::Views].len(), 1);
        assert!(results[&QueryName::Routines].is_empty());
    }

    /// Sleeps on every query and records the most queries seen in flight
    #[derive(Default)]
    struct SlowCatalog {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl CatalogSource for SlowCatalog {
        async fn query(&self, _name: QueryName, _sql: &str) -> Result<Vec<CatalogRow>, AppError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_run_queries_respects_concurrency_limit() {
        let names = [
            QueryName::Tables,
            QueryName::Columns,
            QueryName::PrimaryKeys,
            QueryName::ForeignKeys,
            QueryName::Views,
            QueryName::Routines,
        ];

        for limit in [1, 2, 4] {
            let catalog = Arc::new(SlowCatalog::default());
            let executor = QueryExecutor::new(catalog.clone(), Arc::new(DialectDescriptor::postgres()), limit);

            let results = executor.run_queries(&names, None).await.unwrap();

            assert_eq!(results.len(), names.len());
            assert_eq!(catalog.peak.load(Ordering::SeqCst), limit);
            assert_eq!(catalog.in_flight.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_run_queries_fails_on_first_error() {
        let (catalog, executor) = executor(DialectDescriptor::postgres());
        catalog.fail_on(QueryName::Routines);

        let err = executor
            .run_queries(&[QueryName::Views, QueryName::Routines], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Connection(_)));
    }
}
