//! In-memory reference store
//!
//! Implements the full store contract, including the uniqueness constraint
//! on (vendor, account, region, cloud id), transactional diff application
//! and compare-and-insert lock semantics. Backs the engine test-suites; a
//! production deployment plugs in a SQL-backed implementation instead.

use crate::diff::{AppliedSet, DiffSet, NewRecord, NewSgRule, RecordUpdate};
use crate::store::{LockDelete, LockInsert, LockStore, ResourceStore};
use async_trait::async_trait;
use chrono::Utc;
use skybridge_core::{
    CoreError, Filter, FlowKind, FlowLockEntry, Kit, LockKey, Page, ResFlowRel, ResourceKind,
    ResourceRecord, Result, Revision, RuleDirection, SgRule, merge_extension,
    model::BIZ_UNASSIGNED,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, ResourceRecord>,
    rules: HashMap<String, Vec<SgRule>>,
    locks: HashMap<String, FlowLockEntry>,
    rels: Vec<ResFlowRel>,
    next_id: u64,
}

impl Inner {
    fn assign_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:08}", self.next_id)
    }

    fn cloud_id_taken(&self, record: &NewRecord) -> bool {
        self.records.values().any(|existing| {
            existing.kind == record.kind
                && existing.vendor == record.vendor
                && existing.account_id == record.account_id
                && existing.region == record.region
                && existing.cloud_id.as_deref() == Some(record.cloud_id.as_str())
        })
    }

    fn insert_new(&mut self, record: NewRecord, creator: &str) -> String {
        let id = self.assign_id();
        let stored = ResourceRecord {
            id: id.clone(),
            kind: record.kind,
            vendor: record.vendor,
            account_id: record.account_id,
            region: record.region,
            cloud_id: Some(record.cloud_id),
            name: record.name,
            status: record.status,
            biz_id: BIZ_UNASSIGNED,
            extension: record.extension,
            revision: Revision::new(creator),
        };
        self.records.insert(id.clone(), stored);
        id
    }

    fn apply_update(&mut self, id: &str, update: RecordUpdate, reviser: &str) -> Result<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("record {id}")))?;
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(biz_id) = update.biz_id {
            record.biz_id = biz_id;
        }
        if let Some(patch) = update.extension {
            merge_extension(&mut record.extension, &patch);
        }
        record.revision.touch(reviser);
        Ok(())
    }
}

/// In-memory store over a single mutex, standing in for the shared
/// relational store.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("mem store mutex poisoned")
    }
}

fn direction_rank(direction: RuleDirection) -> u8 {
    match direction {
        RuleDirection::Egress => 0,
        RuleDirection::Ingress => 1,
    }
}

#[async_trait]
impl ResourceStore for MemStore {
    async fn list(
        &self,
        _kit: &Kit,
        kind: ResourceKind,
        filter: &Filter,
        page: &Page,
    ) -> Result<Vec<ResourceRecord>> {
        let inner = self.lock();
        Ok(inner
            .records
            .values()
            .filter(|record| record.kind == kind && filter.matches(*record))
            .skip(page.start as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        kit: &Kit,
        kind: ResourceKind,
        records: Vec<NewRecord>,
    ) -> Result<Vec<String>> {
        if records.is_empty() {
            return Err(CoreError::InvalidInput("no records to create".to_string()));
        }
        let mut inner = self.lock();
        let mut seen = std::collections::HashSet::new();
        for record in &records {
            if record.kind != kind {
                return Err(CoreError::InvalidInput(format!(
                    "record kind {} does not match batch kind {kind}",
                    record.kind
                )));
            }
            if inner.cloud_id_taken(record) || !seen.insert(record.cloud_id.clone()) {
                return Err(CoreError::Store(format!(
                    "duplicate cloud id {} for {}/{}/{}",
                    record.cloud_id, record.vendor, record.account_id, record.region
                )));
            }
        }
        let creator = kit.user.clone();
        Ok(records
            .into_iter()
            .map(|record| inner.insert_new(record, &creator))
            .collect())
    }

    async fn update(&self, kit: &Kit, id: &str, update: RecordUpdate) -> Result<()> {
        self.lock().apply_update(id, update, &kit.user)
    }

    async fn delete(&self, _kit: &Kit, kind: ResourceKind, filter: &Filter) -> Result<u64> {
        let mut inner = self.lock();
        let doomed: Vec<String> = inner
            .records
            .values()
            .filter(|record| record.kind == kind && filter.matches(*record))
            .map(|record| record.id.clone())
            .collect();
        for id in &doomed {
            inner.records.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    async fn apply(&self, kit: &Kit, diff: DiffSet) -> Result<AppliedSet> {
        let mut inner = self.lock();

        // Validate the whole diff before touching anything, so a bad entry
        // cannot leave a partial commit behind.
        for (id, _) in &diff.updates {
            if !inner.records.contains_key(id) {
                return Err(CoreError::Store(format!("update target {id} not found")));
            }
        }
        for id in &diff.deletes {
            if !inner.records.contains_key(id) {
                return Err(CoreError::Store(format!("delete target {id} not found")));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for record in &diff.creates {
            if inner.cloud_id_taken(record) || !seen.insert(record.cloud_id.clone()) {
                return Err(CoreError::Store(format!(
                    "duplicate cloud id {} in diff",
                    record.cloud_id
                )));
            }
        }

        let mut applied = AppliedSet::default();
        for record in diff.creates {
            applied.created.push(inner.insert_new(record, &kit.user));
        }
        for (id, update) in diff.updates {
            inner.apply_update(&id, update, &kit.user)?;
            applied.updated.push(id);
        }
        for id in diff.deletes {
            inner.records.remove(&id);
            applied.deleted.push(id);
        }
        Ok(applied)
    }

    async fn list_sg_rules(&self, _kit: &Kit, security_group_id: &str) -> Result<Vec<SgRule>> {
        let inner = self.lock();
        let mut rules = inner
            .rules
            .get(security_group_id)
            .cloned()
            .unwrap_or_default();
        rules.sort_by_key(|rule| (direction_rank(rule.direction), rule.policy_index));
        Ok(rules)
    }

    async fn replace_sg_rules(
        &self,
        kit: &Kit,
        security_group_id: &str,
        cloud_security_group_id: &str,
        version: &str,
        rules: Vec<NewSgRule>,
    ) -> Result<Vec<String>> {
        let mut inner = self.lock();
        let previous = inner
            .rules
            .get(security_group_id)
            .cloned()
            .unwrap_or_default();

        for rule in &rules {
            if let Some(id) = &rule.id {
                if !previous.iter().any(|p| &p.id == id) {
                    return Err(CoreError::Store(format!(
                        "kept rule {id} not found in previous generation"
                    )));
                }
            }
        }

        let mut created = Vec::new();
        let mut replacement = Vec::with_capacity(rules.len());
        for rule in rules {
            let (id, revision) = match rule.id {
                Some(id) => {
                    let mut revision = previous
                        .iter()
                        .find(|p| p.id == id)
                        .map(|p| p.revision.clone())
                        .unwrap_or_else(|| Revision::new(&kit.user));
                    revision.touch(&kit.user);
                    (id, revision)
                }
                None => {
                    let id = inner.assign_id();
                    created.push(id.clone());
                    (id, Revision::new(&kit.user))
                }
            };
            replacement.push(SgRule {
                id,
                security_group_id: security_group_id.to_string(),
                cloud_security_group_id: cloud_security_group_id.to_string(),
                direction: rule.direction,
                policy_index: rule.policy_index,
                version: version.to_string(),
                spec: rule.spec,
                revision,
            });
        }
        inner
            .rules
            .insert(security_group_id.to_string(), replacement);
        Ok(created)
    }
}

#[async_trait]
impl LockStore for MemStore {
    async fn try_insert_lock(&self, _kit: &Kit, entry: FlowLockEntry) -> Result<LockInsert> {
        let mut inner = self.lock();
        let key = entry.key.to_string();
        let now = Utc::now();
        if let Some(existing) = inner.locks.get(&key) {
            if !existing.is_expired(now) {
                return Ok(LockInsert::Held(existing.clone()));
            }
            tracing::warn!(
                key = %key,
                holder = %existing.owner,
                "replacing expired flow lock"
            );
        }
        inner.locks.insert(key, entry);
        Ok(LockInsert::Acquired)
    }

    async fn find_lock(&self, _kit: &Kit, key: &LockKey) -> Result<Option<FlowLockEntry>> {
        Ok(self.lock().locks.get(&key.to_string()).cloned())
    }

    async fn delete_lock(&self, _kit: &Kit, key: &LockKey, owner: &str) -> Result<LockDelete> {
        let mut inner = self.lock();
        let key = key.to_string();
        match inner.locks.get(&key) {
            None => Ok(LockDelete::Absent),
            Some(existing) if existing.owner != owner => {
                Ok(LockDelete::NotOwner(existing.clone()))
            }
            Some(_) => {
                inner.locks.remove(&key);
                Ok(LockDelete::Deleted)
            }
        }
    }

    async fn create_flow_rel(&self, _kit: &Kit, rel: ResFlowRel) -> Result<()> {
        self.lock().rels.push(rel);
        Ok(())
    }

    async fn find_flow_rel(
        &self,
        _kit: &Kit,
        res_id: &str,
        flow_kind: FlowKind,
    ) -> Result<Option<ResFlowRel>> {
        Ok(self
            .lock()
            .rels
            .iter()
            .find(|rel| rel.res_id == res_id && rel.flow_kind == flow_kind)
            .cloned())
    }

    async fn delete_flow_rel(&self, _kit: &Kit, res_id: &str, flow_id: &str) -> Result<()> {
        self.lock()
            .rels
            .retain(|rel| !(rel.res_id == res_id && rel.flow_id == flow_id));
        Ok(())
    }
}
