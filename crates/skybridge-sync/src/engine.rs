//! Engine facade
//!
//! Wires the store, the lock table and the adapter registry into the
//! caller-facing operation surface: resolve, reconcile, lock and the
//! locked mutate-then-resync flows defined in [`crate::flow`].

use crate::flow_lock::FlowLock;
use crate::reconciler::Reconciler;
use crate::resolver::Resolver;
use skybridge_core::{
    CoreError, EngineConfig, Filter, FlowKind, Kit, Page, ResourceKind, ResourceRecord, Result,
};
use skybridge_cloud::AdapterRegistry;
use skybridge_store::{LockStore, ResourceStore};
use std::sync::Arc;

pub struct SyncEngine {
    locks: Arc<dyn LockStore>,
    config: EngineConfig,
    resolver: Resolver,
    reconciler: Reconciler,
    flow_lock: FlowLock,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        locks: Arc<dyn LockStore>,
        adapters: Arc<AdapterRegistry>,
        config: EngineConfig,
    ) -> Self {
        let reconciler = Reconciler::new(store.clone(), adapters, config.clone());
        let resolver = Resolver::new(store, reconciler.clone(), config.max_id_set);
        let flow_lock = FlowLock::new(locks.clone());
        Self {
            locks,
            config,
            resolver,
            reconciler,
            flow_lock,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn flow_lock(&self) -> &FlowLock {
        &self.flow_lock
    }

    pub(crate) fn locks(&self) -> &Arc<dyn LockStore> {
        &self.locks
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The flow id currently associated with a resource, letting a caller
    /// discover an in-flight flow instead of racing it.
    pub async fn find_running_flow(
        &self,
        kit: &Kit,
        res_id: &str,
        flow_kind: FlowKind,
    ) -> Result<Option<String>> {
        Ok(self
            .locks
            .find_flow_rel(kit, res_id, flow_kind)
            .await?
            .map(|rel| rel.flow_id))
    }

    /// Fetch one record by internal id.
    pub(crate) async fn get_record(
        &self,
        kit: &Kit,
        kind: ResourceKind,
        id: &str,
    ) -> Result<ResourceRecord> {
        let records = self
            .reconciler
            .store()
            .list(kit, kind, &Filter::eq("id", id), &Page::first(1))
            .await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound(format!("{kind} {id}")))
    }
}
