//! Change detection
//!
//! Builds the hash-only [`PartialSchemaSnapshot`] from the `*Modifications`
//! queries and classifies every identity against a previous snapshot.
//! A missing hash on either side always counts as a modification.

use crate::analyser::dialect::{DialectDescriptor, QueryName};
use crate::analyser::executor::CatalogRow;
use crate::analyser::model::{ObjectHash, ObjectIdentity, PartialSchemaSnapshot, SchemaObjectKind, SchemaSnapshot};
use crate::analyser::rows::{decode_rows, RoutineRow, RoutineType, TableRow, ViewRow};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

/// Per-identity classification of one refresh
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub added: Vec<ObjectIdentity>,
    pub removed: Vec<ObjectIdentity>,
    pub modified: Vec<ObjectIdentity>,
    pub unchanged: Vec<ObjectIdentity>,
}

impl ChangeSet {
    /// Identities that need a scoped re-analysis, added first
    pub fn needs_analysis(&self) -> impl Iterator<Item = &ObjectIdentity> {
        self.added.iter().chain(&self.modified)
    }

    /// True when nothing was added, removed or modified
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn kind_of(&self, identity: &ObjectIdentity) -> Option<ChangeKind> {
        [
            (&self.added, ChangeKind::Added),
            (&self.removed, ChangeKind::Removed),
            (&self.modified, ChangeKind::Modified),
            (&self.unchanged, ChangeKind::Unchanged),
        ]
        .into_iter()
        .find(|(list, _)| list.contains(identity))
        .map(|(_, kind)| kind)
    }
}

/// Compare the previous snapshot's hashes with a fresh fast snapshot
pub fn classify(previous: &SchemaSnapshot, current: &PartialSchemaSnapshot) -> ChangeSet {
    let previous_hashes = previous.object_hashes();
    let known: HashMap<&ObjectIdentity, Option<&str>> = previous_hashes
        .iter()
        .map(|h| (&h.identity, h.content_hash.as_deref()))
        .collect();

    let mut changes = ChangeSet::default();
    let mut seen = HashSet::new();

    for hash in current.iter() {
        if !seen.insert(&hash.identity) {
            continue;
        }
        match known.get(&hash.identity) {
            None => changes.added.push(hash.identity.clone()),
            Some(Some(old)) if hash.content_hash.as_deref() == Some(*old) => {
                changes.unchanged.push(hash.identity.clone())
            }
            Some(_) => changes.modified.push(hash.identity.clone()),
        }
    }

    changes.removed = previous_hashes
        .iter()
        .filter(|h| !seen.contains(&h.identity))
        .map(|h| h.identity.clone())
        .collect();

    changes
}

/// Turn the rows of the four `*Modifications` queries into a hash snapshot.
///
/// `matviews` stays `None` unless the dialect has materialized views.
pub fn partial_snapshot(
    dialect: &DialectDescriptor,
    rows: &HashMap<QueryName, Vec<CatalogRow>>,
) -> PartialSchemaSnapshot {
    let rows_of = |name: QueryName| rows.get(&name).map(Vec::as_slice).unwrap_or_default();
    let mut dropped = 0;
    let mut seen = HashSet::new();
    let mut keep = |hash: ObjectHash| {
        if seen.insert(hash.identity.clone()) {
            Some(hash)
        } else {
            warn!(object = %hash.identity, "Duplicate object in hash query, keeping the first");
            None
        }
    };

    let tables = decode_rows::<TableRow>(
        QueryName::TableModifications,
        rows_of(QueryName::TableModifications),
        &mut dropped,
    )
    .into_iter()
    .filter_map(|r| {
        let hash = dialect.gate_hash(r.content_hash());
        keep(ObjectHash::new(ObjectIdentity::new(SchemaObjectKind::Table, r.schema_name, r.pure_name), hash))
    })
    .collect();

    let mut views_of = |name: QueryName, kind: SchemaObjectKind, dropped: &mut usize| -> Vec<ObjectHash> {
        decode_rows::<ViewRow>(name, rows_of(name), dropped)
            .into_iter()
            .filter_map(|r| {
                let hash = dialect.gate_hash(r.hash_code);
                keep(ObjectHash::new(ObjectIdentity::new(kind, r.schema_name, r.pure_name), hash))
            })
            .collect()
    };

    let views = views_of(QueryName::ViewModifications, SchemaObjectKind::View, &mut dropped);
    let matviews = dialect.supports_materialized_views().then(|| {
        views_of(
            QueryName::MatviewModifications,
            SchemaObjectKind::MaterializedView,
            &mut dropped,
        )
    });

    let mut procedures = Vec::new();
    let mut functions = Vec::new();
    for r in decode_rows::<RoutineRow>(
        QueryName::RoutineModifications,
        rows_of(QueryName::RoutineModifications),
        &mut dropped,
    ) {
        let (kind, list) = match r.object_type {
            RoutineType::Procedure => (SchemaObjectKind::Procedure, &mut procedures),
            RoutineType::Function => (SchemaObjectKind::Function, &mut functions),
        };
        let hash = dialect.gate_hash(r.hash_code);
        if let Some(h) = keep(ObjectHash::new(ObjectIdentity::new(kind, r.schema_name, r.pure_name), hash)) {
            list.push(h);
        }
    }

    if dropped > 0 {
        warn!(dropped, "Hash query rows dropped");
    }

    PartialSchemaSnapshot {
        tables,
        views,
        matviews,
        procedures,
        functions,
    }
}
