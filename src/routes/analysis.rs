//! Schema analysis route handlers
//!
//! Every handler takes the connection's analysis lock, so analyses on the
//! same database run one at a time.

use crate::analyser::{
    AssemblyReport, ChangeSet, ObjectIdentity, PartialSchemaSnapshot, SchemaObject, SchemaSnapshot,
};
use crate::error::{not_found_error, validation_error, ApiResult, AppError};
use crate::models::SuccessResponse;
use crate::snapshot::{SnapshotMetadata, StoredSnapshot};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub version: u64,
    pub captured_at: DateTime<Utc>,
    pub report: AssemblyReport,
    pub snapshot: SchemaSnapshot,
}

/// Run a full analysis and keep it as the connection's latest snapshot
pub async fn full_analysis(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<AnalysisResponse>>> {
    let conn = state.connections.get_connection(id).await?;
    let _guard = conn.lock_analysis().await;

    let (snapshot, report) = conn.analyser().full_analysis_with_report().await?;
    let stored = state.snapshots.save(id, snapshot).await;
    conn.mark_analysed().await;

    Ok(Json(SuccessResponse::with_data(
        format!("Analysed {} object(s).", stored.snapshot.object_count()),
        AnalysisResponse {
            version: stored.version,
            captured_at: stored.captured_at,
            report,
            snapshot: stored.snapshot,
        },
    )))
}

/// Latest stored snapshot of a connection
pub async fn latest_snapshot(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<StoredSnapshot>>> {
    let stored = state
        .snapshots
        .get_latest(id)
        .await
        .ok_or_else(|| not_found_error(format!("No analysis stored for connection {}", id)))?;

    Ok(Json(SuccessResponse::with_data(
        format!("Snapshot v{}.", stored.version),
        stored,
    )))
}

/// Hash-only snapshot
pub async fn fast_snapshot(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<PartialSchemaSnapshot>>> {
    let conn = state.connections.get_connection(id).await?;
    let _guard = conn.lock_analysis().await;

    let partial = conn.analyser().fast_snapshot().await?;

    Ok(Json(SuccessResponse::with_data(
        format!("{} object hash(es).", partial.iter().count()),
        partial,
    )))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Snapshot to refresh; the stored latest one when absent
    #[serde(default)]
    pub previous: Option<SchemaSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub version: u64,
    pub captured_at: DateTime<Utc>,
    pub changes: ChangeSet,
    pub snapshot: SchemaSnapshot,
}

/// Bring a snapshot up to date through the hash queries
pub async fn refresh(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<SuccessResponse<RefreshResponse>>> {
    let conn = state.connections.get_connection(id).await?;
    let _guard = conn.lock_analysis().await;

    let previous = match payload.previous {
        Some(previous) => previous,
        None => {
            state
                .snapshots
                .get_latest(id)
                .await
                .ok_or_else(|| {
                    AppError::BadRequest(
                        "No previous snapshot supplied or stored; run a full analysis first".to_string(),
                    )
                })?
                .snapshot
        }
    };

    let outcome = conn
        .analyser()
        .refresh_with_changes(&previous, conn.cancellation())
        .await?;
    let stored = state.snapshots.save(id, outcome.snapshot).await;
    conn.mark_analysed().await;

    info!(
        "Refreshed connection {}: {} added, {} removed, {} modified",
        id,
        outcome.changes.added.len(),
        outcome.changes.removed.len(),
        outcome.changes.modified.len()
    );

    Ok(Json(SuccessResponse::with_data(
        if outcome.changes.is_empty() {
            "Schema unchanged.".to_string()
        } else {
            "Schema refreshed.".to_string()
        },
        RefreshResponse {
            version: stored.version,
            captured_at: stored.captured_at,
            changes: outcome.changes,
            snapshot: stored.snapshot,
        },
    )))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRequest {
    /// `kind:schema.name`, e.g. `tables:public.orders`
    #[validate(length(min = 3, message = "Object id is required"))]
    pub object_id: String,
}

/// Analyse a single object by its string identity
pub async fn analyse_object(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ObjectRequest>,
) -> ApiResult<Json<SuccessResponse<SchemaObject>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let conn = state.connections.get_connection(id).await?;
    let identity = ObjectIdentity::parse(&payload.object_id, conn.dialect.default_schema())?;
    let _guard = conn.lock_analysis().await;

    let object = conn
        .analyser()
        .analyse_object(&identity)
        .await?
        .ok_or_else(|| not_found_error(format!("Object {} not found", identity)))?;

    Ok(Json(SuccessResponse::with_data(
        format!("Analysed {}.", identity),
        object,
    )))
}

/// Latest snapshot metadata of every connection
pub async fn list_snapshots(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<SnapshotMetadata>>>> {
    let snapshots = state.snapshots.list().await;

    Ok(Json(SuccessResponse::with_data(
        format!("{} snapshot(s).", snapshots.len()),
        snapshots,
    )))
}
