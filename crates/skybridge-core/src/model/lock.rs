//! Flow locks and flow relations

use crate::vendor::ResourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kinds of mutating flows serialized by the flow lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// Security-group rule create/update/delete.
    RuleUpdate,
    /// Instance start/stop.
    InstanceOperate,
    /// Resource deletion.
    ResourceDelete,
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowKind::RuleUpdate => write!(f, "rule-update"),
            FlowKind::InstanceOperate => write!(f, "instance-operate"),
            FlowKind::ResourceDelete => write!(f, "resource-delete"),
        }
    }
}

/// Lock key: one lock per (resource scope, flow kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey {
    pub res_type: ResourceKind,
    pub res_id: String,
    pub flow_kind: FlowKind,
}

impl LockKey {
    pub fn new(res_type: ResourceKind, res_id: impl Into<String>, flow_kind: FlowKind) -> Self {
        Self {
            res_type,
            res_id: res_id.into(),
            flow_kind,
        }
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.res_type, self.res_id, self.flow_kind)
    }
}

/// One row in the lock table. At most one unexpired entry may exist per
/// key; an expired entry is treated as absent by acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowLockEntry {
    pub key: LockKey,

    /// Opaque owner token; only the holder may release.
    pub owner: String,

    pub acquired_at: DateTime<Utc>,

    /// Absent means the lock never expires and must be released
    /// explicitly.
    pub expires_at: Option<DateTime<Utc>>,
}

impl FlowLockEntry {
    pub fn new(key: LockKey, owner: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            key,
            owner: owner.into(),
            acquired_at: now,
            expires_at: Some(now + chrono::Duration::milliseconds(ttl.as_millis() as i64)),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Association between a resource and an in-flight flow, letting a second
/// request discover the running flow instead of racing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResFlowRel {
    pub res_id: String,
    pub flow_id: String,
    pub flow_kind: FlowKind,
    pub created_at: DateTime<Utc>,
}

impl ResFlowRel {
    pub fn new(
        res_id: impl Into<String>,
        flow_id: impl Into<String>,
        flow_kind: FlowKind,
    ) -> Self {
        Self {
            res_id: res_id.into(),
            flow_id: flow_id.into(),
            flow_kind,
            created_at: Utc::now(),
        }
    }
}
