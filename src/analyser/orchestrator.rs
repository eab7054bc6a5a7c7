//! Analysis orchestrator
//!
//! Two tiers: a full analysis runs every applicable catalog query and
//! assembles the whole object graph; a refresh runs only the hash queries and
//! re-analyses the objects whose hash changed, one scoped analysis each.

use crate::analyser::assembler::{AssemblyReport, ObjectAssembler, RawCatalog};
use crate::analyser::changes::{classify, partial_snapshot, ChangeSet};
use crate::analyser::dialect::{DialectDescriptor, QueryName};
use crate::analyser::executor::{CatalogSource, QueryExecutor};
use crate::analyser::model::{
    ObjectIdentity, PartialSchemaSnapshot, SchemaObject, SchemaObjectKind, SchemaSnapshot,
};
use crate::error::{AppError, PartialRefresh};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a refresh together with the classification that produced it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub snapshot: SchemaSnapshot,
    pub changes: ChangeSet,
}

pub struct Analyser<S> {
    executor: QueryExecutor<S>,
}

impl<S: CatalogSource> Analyser<S> {
    pub fn new(source: S, dialect: Arc<DialectDescriptor>, concurrency: usize) -> Self {
        Self {
            executor: QueryExecutor::new(source, dialect, concurrency),
        }
    }

    pub fn dialect(&self) -> &DialectDescriptor {
        self.executor.dialect()
    }

    /// Queries of a full analysis, gated by the dialect's capabilities
    fn analysis_queries(&self) -> Vec<QueryName> {
        let dialect = self.dialect();
        let mut queries = vec![
            QueryName::Tables,
            QueryName::Columns,
            QueryName::PrimaryKeys,
            QueryName::ForeignKeys,
            QueryName::Views,
            QueryName::Routines,
        ];
        if dialect.supports_materialized_views() {
            queries.extend([QueryName::Matviews, QueryName::MatviewColumns]);
        }
        if dialect.supports_index_enumeration() {
            queries.extend([QueryName::Indexes, QueryName::Indexcols, QueryName::UniqueNames]);
        }
        queries
    }

    fn hash_queries(&self) -> Vec<QueryName> {
        let mut queries = vec![
            QueryName::TableModifications,
            QueryName::ViewModifications,
            QueryName::RoutineModifications,
        ];
        if self.dialect().supports_materialized_views() {
            queries.push(QueryName::MatviewModifications);
        }
        queries
    }

    async fn run_analysis(
        &self,
        filter: Option<&ObjectIdentity>,
    ) -> Result<(SchemaSnapshot, AssemblyReport), AppError> {
        let dialect = self.dialect();
        let rows = self.executor.run_queries(&self.analysis_queries(), filter).await?;
        let raw = RawCatalog::new(rows, dialect.supports_materialized_views());
        Ok(ObjectAssembler::new(dialect).assemble(&raw))
    }

    /// Complete snapshot of the database
    pub async fn full_analysis(&self) -> Result<SchemaSnapshot, AppError> {
        self.full_analysis_with_report().await.map(|(snapshot, _)| snapshot)
    }

    pub async fn full_analysis_with_report(&self) -> Result<(SchemaSnapshot, AssemblyReport), AppError> {
        let started = Instant::now();
        let (snapshot, report) = self.run_analysis(None).await?;

        info!(
            dialect = %self.dialect().name(),
            tables = report.tables,
            views = report.views,
            matviews = report.matviews,
            procedures = report.procedures,
            functions = report.functions,
            dropped_rows = report.dropped_rows,
            unmatched_rows = report.unmatched_rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Full analysis finished"
        );

        Ok((snapshot, report))
    }

    /// Identities and content hashes only, one round trip per object kind
    pub async fn fast_snapshot(&self) -> Result<PartialSchemaSnapshot, AppError> {
        let started = Instant::now();
        let rows = self.executor.run_queries(&self.hash_queries(), None).await?;
        let partial = partial_snapshot(self.dialect(), &rows);

        debug!(
            objects = partial.iter().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fast snapshot finished"
        );
        Ok(partial)
    }

    /// Full analysis scoped to one object; `None` when it no longer exists
    pub async fn analyse_object(&self, identity: &ObjectIdentity) -> Result<Option<SchemaObject>, AppError> {
        if identity.kind == SchemaObjectKind::MaterializedView && !self.dialect().supports_materialized_views() {
            return Ok(None);
        }

        let (mut snapshot, _) = self.run_analysis(Some(identity)).await?;
        Ok(snapshot.take(identity))
    }

    pub async fn refresh(
        &self,
        previous: &SchemaSnapshot,
        cancel: &CancellationToken,
    ) -> Result<SchemaSnapshot, AppError> {
        self.refresh_with_changes(previous, cancel)
            .await
            .map(|outcome| outcome.snapshot)
    }

    /// Bring `previous` up to date.
    ///
    /// Removed objects are dropped, unchanged ones are carried over as they
    /// are, added and modified ones are re-analysed one by one. Cancellation
    /// or a failure in that last phase yields [`AppError::PartialRefresh`]
    /// with everything merged so far and the identities still pending.
    pub async fn refresh_with_changes(
        &self,
        previous: &SchemaSnapshot,
        cancel: &CancellationToken,
    ) -> Result<RefreshOutcome, AppError> {
        let started = Instant::now();
        let current = self.fast_snapshot().await?;
        let changes = classify(previous, &current);

        let mut merged = previous.clone();
        merged.matviews = match (self.dialect().supports_materialized_views(), merged.matviews.take()) {
            (true, matviews) => Some(matviews.unwrap_or_default()),
            (false, _) => None,
        };

        for identity in &changes.removed {
            merged.remove(identity);
        }

        let pending: Vec<ObjectIdentity> = changes.needs_analysis().cloned().collect();
        for (done, identity) in pending.iter().enumerate() {
            let analysed = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err("refresh cancelled".to_string()),
                result = self.analyse_object(identity) => result.map_err(|e| e.to_string()),
            };

            match analysed {
                Ok(Some(object)) => merged.upsert(object),
                Ok(None) => {
                    debug!(object = %identity, "Object disappeared before re-analysis");
                    merged.remove(identity);
                }
                Err(reason) => {
                    warn!(
                        object = %identity,
                        pending = pending.len() - done,
                        reason = %reason,
                        "Refresh aborted"
                    );
                    return Err(AppError::PartialRefresh(Box::new(PartialRefresh {
                        snapshot: merged,
                        pending: pending[done..].to_vec(),
                        reason,
                    })));
                }
            }
        }

        info!(
            dialect = %self.dialect().name(),
            added = changes.added.len(),
            removed = changes.removed.len(),
            modified = changes.modified.len(),
            unchanged = changes.unchanged.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refresh finished"
        );

        Ok(RefreshOutcome {
            snapshot: merged,
            changes,
        })
    }
}
