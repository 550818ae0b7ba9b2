//! Cloud credential scope

use crate::model::resource::Revision;
use crate::vendor::Vendor;
use serde::{Deserialize, Serialize};

/// A cloud credential scope. Immutable once created; referenced by every
/// resource record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned identifier.
    pub id: String,

    pub vendor: Vendor,

    /// Vendor-assigned root/main account identifier.
    pub cloud_main_account_id: String,

    /// Vendor-assigned sub account identifier, where the vendor has one.
    pub cloud_sub_account_id: Option<String>,

    /// Regions this credential manages.
    pub regions: Vec<String>,

    /// Azure resource-group context; empty for other vendors.
    pub resource_group: Option<String>,

    pub revision: Revision,
}

impl Account {
    pub fn new(
        id: impl Into<String>,
        vendor: Vendor,
        cloud_main_account_id: impl Into<String>,
        creator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            vendor,
            cloud_main_account_id: cloud_main_account_id.into(),
            cloud_sub_account_id: None,
            regions: Vec::new(),
            resource_group: None,
            revision: Revision::new(creator),
        }
    }

    pub fn with_regions(mut self, regions: Vec<String>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = Some(resource_group.into());
        self
    }

    /// Whether this credential manages the region.
    pub fn covers_region(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r == region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_coverage() {
        let account = Account::new("00000001", Vendor::Azure, "sub-1234", "admin")
            .with_regions(vec!["eastus".to_string(), "westeurope".to_string()])
            .with_resource_group("rg-prod");
        assert!(account.covers_region("eastus"));
        assert!(!account.covers_region("ap-guangzhou"));
        assert_eq!(account.resource_group.as_deref(), Some("rg-prod"));
    }
}
