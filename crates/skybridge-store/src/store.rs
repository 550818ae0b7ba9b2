//! Store collaborator traits

use crate::diff::{AppliedSet, DiffSet, NewRecord, NewSgRule, RecordUpdate};
use async_trait::async_trait;
use skybridge_core::{
    Filter, FlowKind, FlowLockEntry, Kit, LockKey, Page, ResFlowRel, ResourceKind,
    ResourceRecord, Result, SgRule,
};

/// The shared inventory store.
///
/// Implementations are expected to honor the kit deadline on every call and
/// to apply [`DiffSet`]s within a single transaction. Uniqueness of
/// (vendor, account, region, cloud id) is enforced store-side.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Filtered listing over one page, ordered by internal id.
    async fn list(
        &self,
        kit: &Kit,
        kind: ResourceKind,
        filter: &Filter,
        page: &Page,
    ) -> Result<Vec<ResourceRecord>>;

    /// Batch create; returns the assigned internal ids in input order.
    async fn create(
        &self,
        kit: &Kit,
        kind: ResourceKind,
        records: Vec<NewRecord>,
    ) -> Result<Vec<String>>;

    /// Update one record by internal id. The extension patch is merged into
    /// the stored payload.
    async fn update(&self, kit: &Kit, id: &str, update: RecordUpdate) -> Result<()>;

    /// Delete by filter; returns the number of deleted records.
    async fn delete(&self, kit: &Kit, kind: ResourceKind, filter: &Filter) -> Result<u64>;

    /// Apply a reconciliation diff as one transaction, all-or-nothing.
    async fn apply(&self, kit: &Kit, diff: DiffSet) -> Result<AppliedSet>;

    /// All stored rules of one security group, ordered by direction then
    /// policy index.
    async fn list_sg_rules(&self, kit: &Kit, security_group_id: &str) -> Result<Vec<SgRule>>;

    /// Atomically replace the rule set of one security group with a freshly
    /// listed generation. Returns the internal ids assigned to entries that
    /// carried no id.
    async fn replace_sg_rules(
        &self,
        kit: &Kit,
        security_group_id: &str,
        cloud_security_group_id: &str,
        version: &str,
        rules: Vec<NewSgRule>,
    ) -> Result<Vec<String>>;
}

/// Outcome of a conditional lock insert.
#[derive(Debug, Clone)]
pub enum LockInsert {
    Acquired,
    /// An unexpired entry already exists; carries the current holder.
    Held(FlowLockEntry),
}

/// Outcome of an owner-checked lock delete.
#[derive(Debug, Clone)]
pub enum LockDelete {
    Deleted,
    /// No entry exists for the key.
    Absent,
    /// The entry is held by a different owner; carries the holder.
    NotOwner(FlowLockEntry),
}

/// Lock rows and flow relations, living on the same shared store as the
/// inventory. No separate coordination service is required.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Compare-and-insert: succeeds when no entry exists for the key or the
    /// existing entry has expired (the expired row is replaced). A unique
    /// constraint violation maps to [`LockInsert::Held`].
    async fn try_insert_lock(&self, kit: &Kit, entry: FlowLockEntry) -> Result<LockInsert>;

    async fn find_lock(&self, kit: &Kit, key: &LockKey) -> Result<Option<FlowLockEntry>>;

    /// Delete the entry for the key if `owner` holds it.
    async fn delete_lock(&self, kit: &Kit, key: &LockKey, owner: &str) -> Result<LockDelete>;

    async fn create_flow_rel(&self, kit: &Kit, rel: ResFlowRel) -> Result<()>;

    async fn find_flow_rel(
        &self,
        kit: &Kit,
        res_id: &str,
        flow_kind: FlowKind,
    ) -> Result<Option<ResFlowRel>>;

    async fn delete_flow_rel(&self, kit: &Kit, res_id: &str, flow_id: &str) -> Result<()>;
}
