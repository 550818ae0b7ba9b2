//! Adapter dispatch

use crate::adapter::VendorAdapter;
use skybridge_core::{CoreError, Result, Vendor};
use std::collections::HashMap;
use std::sync::Arc;

/// Vendor tag → adapter. The single dispatch point for all vendor calls;
/// the rest of the engine is vendor-agnostic.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<Vendor, Arc<dyn VendorAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn VendorAdapter>) {
        let vendor = adapter.vendor();
        if self.adapters.insert(vendor, adapter).is_some() {
            tracing::warn!(vendor = %vendor, "adapter replaced for vendor");
        }
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn VendorAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, vendor: Vendor) -> Result<Arc<dyn VendorAdapter>> {
        self.adapters
            .get(&vendor)
            .cloned()
            .ok_or(CoreError::AdapterNotFound(vendor))
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        self.adapters.keys().copied().collect()
    }
}
