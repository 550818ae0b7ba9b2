//! Diff types committed through the store
//!
//! A reconciliation pass computes its whole diff in memory and hands it to
//! the store as one [`DiffSet`]; the store applies it all-or-nothing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skybridge_core::{ResourceKind, RuleDirection, SgRuleSpec, Vendor};

/// A record to create, before the store has assigned an internal id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    pub kind: ResourceKind,
    pub vendor: Vendor,
    pub account_id: String,
    pub region: String,
    pub cloud_id: String,
    pub name: String,
    pub status: String,
    pub extension: Value,
}

/// Field-level update for one record. Extension patches are merged into the
/// stored payload, never replacing it wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub name: Option<String>,
    pub status: Option<String>,
    pub biz_id: Option<i64>,
    pub extension: Option<Value>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.status.is_none()
            && self.biz_id.is_none()
            && self.extension.is_none()
    }
}

/// The complete outcome of one reconciliation diff, applied as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffSet {
    pub kind: ResourceKind,
    pub creates: Vec<NewRecord>,
    /// (internal id, update)
    pub updates: Vec<(String, RecordUpdate)>,
    /// Internal ids to delete.
    pub deletes: Vec<String>,
}

impl DiffSet {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Internal ids touched by an applied diff.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppliedSet {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

/// One entry of a security-group rule-set replacement.
///
/// `id` is set when the rule content survived from the previous generation
/// and keeps its internal id; `None` asks the store to assign a fresh one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSgRule {
    pub id: Option<String>,
    pub direction: RuleDirection,
    pub policy_index: i64,
    pub spec: SgRuleSpec,
}
