//! Session-owned identifier and timestamp source for CRUD handlers

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::schema::{PrimitiveKind, SchemaNode, ShapeDriver};

/// Shape of identifiers minted for created resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    Uuid,
    Integer,
    Text,
}

impl IdKind {
    /// Infer from the schema's `id` property, defaulting to UUID strings
    pub fn for_resource(node: &SchemaNode) -> Self {
        match node.properties.get("id") {
            Some(id) if matches!(id.driver(), ShapeDriver::Typed(PrimitiveKind::Integer)) => {
                Self::Integer
            }
            Some(id) if id.format.as_deref().map_or(false, |f| f != "uuid") => Self::Text,
            _ => Self::Uuid,
        }
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounters {
    pub issued_ids: u64,
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
}

/// Mints identifiers and timestamps for create/replace handlers.
///
/// One store belongs to one server session, so two servers in the same
/// process never share sequences. Nothing is persisted: the store only
/// remembers counters, not resources.
#[derive(Debug, Default)]
pub struct ResourceStore {
    sequence: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    deleted: AtomicU64,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh identifier of the requested shape
    pub fn next_id(&self, kind: IdKind) -> Value {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        match kind {
            IdKind::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
            IdKind::Integer => Value::from(n),
            IdKind::Text => Value::String(format!("id-{}", n)),
        }
    }

    /// Current time as RFC 3339 with millisecond precision
    pub fn timestamp(&self) -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn record_create(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn counters(&self) -> StoreCounters {
        StoreCounters {
            issued_ids: self.sequence.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
        }
    }
}
