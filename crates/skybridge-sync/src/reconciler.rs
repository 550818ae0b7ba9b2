//! Resource reconciliation
//!
//! A reconciliation pass lists vendor-side truth for a scope, diffs it
//! against the store and applies the minimal create/update/delete set in
//! one transaction. The vendor listing is exhausted page by page before
//! the diff is computed; any listing failure aborts the pass with no
//! writes, so an incomplete page read can never surface as a spurious
//! delete.

use crate::call::with_deadline;
use serde::{Deserialize, Serialize};
use skybridge_core::{
    CoreError, EngineConfig, Filter, Kit, Page, ResourceKind, ResourceRecord, Result, Vendor,
    merge_extension,
};
use skybridge_cloud::{AdapterRegistry, ListScope, VendorPage, VendorResource};
use skybridge_store::{DiffSet, NewRecord, RecordUpdate, ResourceStore};
use std::collections::HashMap;
use std::sync::Arc;

/// The (vendor, account, region, identifier-subset) tuple bounding one
/// reconciliation pass.
///
/// With neither `cloud_ids` nor `self_links` set the scope covers the full
/// resource population of the account and region, and store records the
/// vendor no longer reports are deleted. With an explicit identifier
/// subset, a store record missing from the vendor listing is a loss signal
/// and surfaces as an error instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncScope {
    pub vendor: Vendor,
    pub kind: ResourceKind,
    pub account_id: String,
    /// Empty for global resources.
    pub region: String,
    pub resource_group: Option<String>,
    pub cloud_ids: Option<Vec<String>>,
    pub self_links: Option<Vec<String>>,
}

impl SyncScope {
    /// Scope covering the full resource population of the account/region.
    pub fn full(
        vendor: Vendor,
        kind: ResourceKind,
        account_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            vendor,
            kind,
            account_id: account_id.into(),
            region: region.into(),
            resource_group: None,
            cloud_ids: None,
            self_links: None,
        }
    }

    /// Scope restricted to an explicit cloud-id subset.
    pub fn subset(
        vendor: Vendor,
        kind: ResourceKind,
        account_id: impl Into<String>,
        region: impl Into<String>,
        cloud_ids: Vec<String>,
    ) -> Self {
        let mut scope = Self::full(vendor, kind, account_id, region);
        scope.cloud_ids = Some(cloud_ids);
        scope
    }

    /// Scope restricted to an explicit self-link subset, for vendors that
    /// key resources by self link.
    pub fn self_link_subset(
        vendor: Vendor,
        kind: ResourceKind,
        account_id: impl Into<String>,
        region: impl Into<String>,
        self_links: Vec<String>,
    ) -> Self {
        let mut scope = Self::full(vendor, kind, account_id, region);
        scope.self_links = Some(self_links);
        scope
    }

    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = Some(resource_group.into());
        self
    }

    fn is_subset(&self) -> bool {
        self.cloud_ids.is_some() || self.self_links.is_some()
    }

    fn validate(&self, max_id_set: u32) -> Result<()> {
        if self.cloud_ids.is_some() && self.self_links.is_some() {
            return Err(CoreError::InvalidInput(
                "scope cannot mix cloud ids and self links".to_string(),
            ));
        }
        for ids in [&self.cloud_ids, &self.self_links].into_iter().flatten() {
            if ids.is_empty() {
                return Err(CoreError::InvalidInput(
                    "scope id subset must not be empty".to_string(),
                ));
            }
            if ids.len() > max_id_set as usize {
                return Err(CoreError::InvalidInput(format!(
                    "scope id subset exceeds {max_id_set}"
                )));
            }
        }
        Ok(())
    }

    fn list_scope(&self) -> ListScope {
        let mut scope = ListScope::new(&self.account_id, &self.region);
        scope.resource_group = self.resource_group.clone();
        scope.cloud_ids = self.cloud_ids.clone();
        scope.self_links = self.self_links.clone();
        scope
    }

    fn store_filter(&self) -> Filter {
        let mut filters = vec![
            Filter::eq("vendor", self.vendor.as_str()),
            Filter::eq("account_id", self.account_id.as_str()),
        ];
        if !self.region.is_empty() {
            filters.push(Filter::eq("region", self.region.as_str()));
        }
        if let Some(cloud_ids) = &self.cloud_ids {
            filters.push(Filter::contains("cloud_id", cloud_ids));
        }
        if let Some(self_links) = &self.self_links {
            filters.push(Filter::json_in("extension.self_link", self_links));
        }
        Filter::and(filters)
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: u64,
}

impl SyncSummary {
    /// True when the pass found nothing to change.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Converges the store against vendor-reported truth, one scope at a time.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    adapters: Arc<AdapterRegistry>,
    config: EngineConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        adapters: Arc<AdapterRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            adapters,
            config,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    pub(crate) fn adapters(&self) -> &Arc<AdapterRegistry> {
        &self.adapters
    }

    /// Run one reconciliation pass for the scope.
    ///
    /// Idempotent: a second pass with no intervening vendor-side change
    /// produces an empty diff.
    pub async fn reconcile(&self, kit: &Kit, scope: &SyncScope) -> Result<SyncSummary> {
        scope.validate(self.config.max_id_set)?;

        let remote = self.list_remote(kit, scope).await?;
        let local = self.list_local(kit, scope).await?;

        let (diff, unchanged) = compute_diff(scope, &remote, &local)?;
        if diff.is_empty() {
            tracing::debug!(
                rid = %kit.rid,
                vendor = %scope.vendor,
                kind = %scope.kind,
                "scope already converged"
            );
            return Ok(SyncSummary {
                unchanged,
                ..Default::default()
            });
        }

        let applied = self.store.apply(kit, diff).await?;
        tracing::info!(
            rid = %kit.rid,
            vendor = %scope.vendor,
            kind = %scope.kind,
            account_id = %scope.account_id,
            created = applied.created.len(),
            updated = applied.updated.len(),
            deleted = applied.deleted.len(),
            "reconciled scope"
        );
        Ok(SyncSummary {
            created: applied.created,
            updated: applied.updated,
            deleted: applied.deleted,
            unchanged,
        })
    }

    /// Exhaust the vendor listing for the scope. Any page failure aborts
    /// the pass before any store write.
    async fn list_remote(&self, kit: &Kit, scope: &SyncScope) -> Result<Vec<VendorResource>> {
        let adapter = self.adapters.get(scope.vendor)?;
        let list_scope = scope.list_scope();
        let mut page = VendorPage::first(self.config.vendor_page_size);
        let mut resources = Vec::new();
        loop {
            let result = with_deadline(
                kit,
                adapter.list_resources(kit, scope.kind, &list_scope, &page),
                || CoreError::VendorUnavailable {
                    vendor: scope.vendor,
                    operation: "list_resources".to_string(),
                    reason: "deadline exceeded".to_string(),
                },
            )
            .await
            .map_err(|err| {
                tracing::error!(
                    rid = %kit.rid,
                    vendor = %scope.vendor,
                    kind = %scope.kind,
                    error = %err,
                    "vendor listing failed, aborting pass without writes"
                );
                err
            })?;
            resources.extend(result.resources);
            match result.next_offset {
                Some(offset) => page.offset = offset,
                None => break,
            }
        }
        Ok(resources)
    }

    async fn list_local(&self, kit: &Kit, scope: &SyncScope) -> Result<Vec<ResourceRecord>> {
        let filter = scope.store_filter();
        let mut page = Page::default();
        let mut records = Vec::new();
        loop {
            let batch = self.store.list(kit, scope.kind, &filter, &page).await?;
            let fetched = batch.len() as u32;
            records.extend(batch);
            if fetched < page.limit {
                break;
            }
            page = page.next();
        }
        Ok(records)
    }
}

/// The extension payload a listing row converges to; the self link rides
/// inside the extension so self-link-keyed vendors stay filterable.
fn normalized_extension(resource: &VendorResource) -> serde_json::Value {
    let mut extension = resource.extension.clone();
    if let Some(self_link) = &resource.self_link {
        merge_extension(
            &mut extension,
            &serde_json::json!({ "self_link": self_link }),
        );
    }
    extension
}

fn field_diff(record: &ResourceRecord, resource: &VendorResource) -> RecordUpdate {
    let mut update = RecordUpdate::default();
    if record.name != resource.name {
        update.name = Some(resource.name.clone());
    }
    if record.status != resource.status {
        update.status = Some(resource.status.clone());
    }
    let patch = normalized_extension(resource);
    let mut merged = record.extension.clone();
    merge_extension(&mut merged, &patch);
    if merged != record.extension {
        update.extension = Some(patch);
    }
    update
}

/// Compute the minimal diff converging `local` to `remote`.
///
/// Returns the diff and the count of records left untouched.
fn compute_diff(
    scope: &SyncScope,
    remote: &[VendorResource],
    local: &[ResourceRecord],
) -> Result<(DiffSet, u64)> {
    let mut local_by_cloud: HashMap<&str, &ResourceRecord> = local
        .iter()
        .filter_map(|record| record.cloud_id.as_deref().map(|cloud_id| (cloud_id, record)))
        .collect();

    let mut diff = DiffSet::new(scope.kind);
    let mut unchanged = 0u64;

    for resource in remote {
        match local_by_cloud.remove(resource.cloud_id.as_str()) {
            None => diff.creates.push(NewRecord {
                kind: scope.kind,
                vendor: scope.vendor,
                account_id: scope.account_id.clone(),
                region: scope.region.clone(),
                cloud_id: resource.cloud_id.clone(),
                name: resource.name.clone(),
                status: resource.status.clone(),
                extension: normalized_extension(resource),
            }),
            Some(record) => {
                let update = field_diff(record, resource);
                if update.is_empty() {
                    unchanged += 1;
                } else {
                    diff.updates.push((record.id.clone(), update));
                }
            }
        }
    }

    if !local_by_cloud.is_empty() {
        if scope.is_subset() {
            // The caller asked about specific identifiers that the vendor
            // no longer reports: a loss signal, never a silent delete.
            let mut missing: Vec<String> = local_by_cloud
                .values()
                .map(|record| match &scope.self_links {
                    Some(_) => record
                        .self_link()
                        .unwrap_or(record.id.as_str())
                        .to_string(),
                    None => record.cloud_id.clone().unwrap_or_else(|| record.id.clone()),
                })
                .collect();
            missing.sort();
            return Err(CoreError::PartialSyncFailure { missing });
        }
        diff.deletes
            .extend(local_by_cloud.values().map(|record| record.id.clone()));
    }

    Ok((diff, unchanged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skybridge_core::{BIZ_UNASSIGNED, Revision};

    fn scope_full() -> SyncScope {
        SyncScope::full(Vendor::TCloud, ResourceKind::Vpc, "acc-1", "ap-guangzhou")
    }

    fn record(id: &str, cloud_id: &str, name: &str) -> ResourceRecord {
        ResourceRecord {
            id: id.to_string(),
            kind: ResourceKind::Vpc,
            vendor: Vendor::TCloud,
            account_id: "acc-1".to_string(),
            region: "ap-guangzhou".to_string(),
            cloud_id: Some(cloud_id.to_string()),
            name: name.to_string(),
            status: "AVAILABLE".to_string(),
            biz_id: BIZ_UNASSIGNED,
            extension: json!({"cidr": "10.0.0.0/16"}),
            revision: Revision::new("sync"),
        }
    }

    fn listing(cloud_id: &str, name: &str) -> VendorResource {
        VendorResource::new(cloud_id, name)
            .with_status("AVAILABLE")
            .with_extension(json!({"cidr": "10.0.0.0/16"}))
    }

    #[test]
    fn identical_sides_produce_empty_diff() {
        let remote = vec![listing("vpc-a", "net-a")];
        let local = vec![record("00000001", "vpc-a", "net-a")];
        let (diff, unchanged) = compute_diff(&scope_full(), &remote, &local).unwrap();
        assert!(diff.is_empty());
        assert_eq!(unchanged, 1);
    }

    #[test]
    fn vendor_only_resources_become_creates() {
        let remote = vec![listing("vpc-a", "net-a"), listing("vpc-b", "net-b")];
        let local = vec![record("00000001", "vpc-a", "net-a")];
        let (diff, _) = compute_diff(&scope_full(), &remote, &local).unwrap();
        assert_eq!(diff.creates.len(), 1);
        assert_eq!(diff.creates[0].cloud_id, "vpc-b");
        assert!(diff.deletes.is_empty());
    }

    #[test]
    fn store_only_resources_are_deleted_in_full_scope() {
        let remote = vec![listing("vpc-a", "net-a")];
        let local = vec![
            record("00000001", "vpc-a", "net-a"),
            record("00000002", "vpc-gone", "net-gone"),
        ];
        let (diff, _) = compute_diff(&scope_full(), &remote, &local).unwrap();
        assert_eq!(diff.deletes, vec!["00000002".to_string()]);
    }

    #[test]
    fn store_only_resources_error_in_subset_scope() {
        let scope = SyncScope::subset(
            Vendor::TCloud,
            ResourceKind::Vpc,
            "acc-1",
            "ap-guangzhou",
            vec!["vpc-a".to_string(), "vpc-gone".to_string()],
        );
        let remote = vec![listing("vpc-a", "net-a")];
        let local = vec![
            record("00000001", "vpc-a", "net-a"),
            record("00000002", "vpc-gone", "net-gone"),
        ];
        let err = compute_diff(&scope, &remote, &local).unwrap_err();
        match err {
            CoreError::PartialSyncFailure { missing } => {
                assert_eq!(missing, vec!["vpc-gone".to_string()]);
            }
            other => panic!("expected loss signal, got {other}"),
        }
    }

    #[test]
    fn renamed_resource_becomes_update() {
        let remote = vec![listing("vpc-a", "net-renamed")];
        let local = vec![record("00000001", "vpc-a", "net-a")];
        let (diff, unchanged) = compute_diff(&scope_full(), &remote, &local).unwrap();
        assert_eq!(unchanged, 0);
        assert_eq!(diff.updates.len(), 1);
        assert_eq!(diff.updates[0].0, "00000001");
        assert_eq!(diff.updates[0].1.name.as_deref(), Some("net-renamed"));
        assert!(diff.updates[0].1.extension.is_none());
    }

    #[test]
    fn extension_diff_is_merge_aware() {
        // The stored payload has a field this listing does not report; the
        // merge-aware comparison must not produce an update for it.
        let mut local = record("00000001", "vpc-a", "net-a");
        local.extension = json!({"cidr": "10.0.0.0/16", "operator_note": "keep"});
        let remote = vec![listing("vpc-a", "net-a")];
        let (diff, unchanged) = compute_diff(&scope_full(), &remote, &[local]).unwrap();
        assert!(diff.is_empty());
        assert_eq!(unchanged, 1);
    }

    #[test]
    fn self_link_rides_in_extension() {
        let resource = VendorResource::new("vpc-g", "net-g")
            .with_self_link("https://gcp/vpc-g")
            .with_extension(json!({"mtu": 1460}));
        let extension = normalized_extension(&resource);
        assert_eq!(extension["self_link"], json!("https://gcp/vpc-g"));
        assert_eq!(extension["mtu"], json!(1460));
    }
}
