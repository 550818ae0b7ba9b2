#![allow(dead_code)]

use skybridge_cloud::{AdapterRegistry, FakeAdapter, VendorResource};
use skybridge_core::{EngineConfig, Kit, ResourceKind, Vendor};
use skybridge_store::MemStore;
use skybridge_sync::{SyncEngine, SyncScope};
use std::sync::Arc;

pub const ACCOUNT: &str = "acc-1";
pub const REGION: &str = "ap-guangzhou";

/// One vendor, one store, one engine.
pub struct TestCloud {
    pub vendor: Vendor,
    pub store: Arc<MemStore>,
    pub adapter: Arc<FakeAdapter>,
    pub engine: SyncEngine,
}

impl TestCloud {
    pub fn new(vendor: Vendor) -> Self {
        Self::with_config(vendor, EngineConfig::default())
    }

    pub fn with_config(vendor: Vendor, config: EngineConfig) -> Self {
        let store = Arc::new(MemStore::new());
        let adapter = Arc::new(FakeAdapter::new(vendor));
        let registry = Arc::new(AdapterRegistry::new().with_adapter(adapter.clone()));
        let engine = SyncEngine::new(store.clone(), store.clone(), registry, config);
        Self {
            vendor,
            store,
            adapter,
            engine,
        }
    }

    pub fn kit() -> Kit {
        Kit::new("admin")
    }

    /// Seed the fake vendor and run one full-scope pass so the store
    /// mirrors it.
    pub async fn seed(&self, kind: ResourceKind, resources: Vec<VendorResource>) {
        for resource in resources {
            self.adapter.push_resource(resource);
        }
        self.engine
            .reconciler()
            .reconcile(&Self::kit(), &self.full_scope(kind))
            .await
            .expect("seed reconcile");
    }

    pub fn full_scope(&self, kind: ResourceKind) -> SyncScope {
        SyncScope::full(self.vendor, kind, ACCOUNT, REGION)
    }

    pub fn subset_scope(&self, kind: ResourceKind, cloud_ids: &[&str]) -> SyncScope {
        SyncScope::subset(
            self.vendor,
            kind,
            ACCOUNT,
            REGION,
            cloud_ids.iter().map(|id| id.to_string()).collect(),
        )
    }

    /// Internal id of the record with the given cloud id.
    pub async fn internal_id(&self, kind: ResourceKind, cloud_id: &str) -> String {
        use skybridge_core::{Filter, Page};
        use skybridge_store::ResourceStore;

        let records = self
            .store
            .list(
                &Self::kit(),
                kind,
                &Filter::eq("cloud_id", cloud_id),
                &Page::default(),
            )
            .await
            .expect("list records");
        records
            .first()
            .unwrap_or_else(|| panic!("no record for cloud id {cloud_id}"))
            .id
            .clone()
    }
}
