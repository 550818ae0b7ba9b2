//! Identifier resolution
//!
//! Maps vendor cloud identifiers to internal records, triggering exactly
//! one reconciliation pass for the missing subset when the store does not
//! cover the request. The fully-mapped fast path issues no vendor call.

use crate::reconciler::{Reconciler, SyncScope};
use serde::{Deserialize, Serialize};
use skybridge_core::{
    CoreError, Filter, Kit, Page, ResourceKind, ResourceRecord, Result, Vendor,
};
use skybridge_store::ResourceStore;
use std::collections::HashMap;
use std::sync::Arc;

/// A cloud-id resolve request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOption {
    pub vendor: Vendor,
    pub kind: ResourceKind,
    pub account_id: String,
    pub region: String,
    pub resource_group: Option<String>,
    pub cloud_ids: Vec<String>,
}

/// A self-link resolve request, for vendors without a usable cloud id at
/// the call site. Same protocol, different key projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfLinkResolveOption {
    pub vendor: Vendor,
    pub kind: ResourceKind,
    pub account_id: String,
    /// Empty for global resources.
    pub region: String,
    pub self_links: Vec<String>,
}

/// Resolution result for one self link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRef {
    pub id: String,
    pub cloud_id: Option<String>,
}

/// The key projection a resolve call runs under.
enum KeyField {
    CloudId,
    SelfLink,
}

impl KeyField {
    fn filter(&self, keys: &[String]) -> Filter {
        match self {
            KeyField::CloudId => Filter::contains("cloud_id", keys),
            KeyField::SelfLink => Filter::json_in("extension.self_link", keys),
        }
    }

    fn of(&self, record: &ResourceRecord) -> Option<String> {
        match self {
            KeyField::CloudId => record.cloud_id.clone(),
            KeyField::SelfLink => record.self_link().map(str::to_string),
        }
    }
}

/// Resolves identifier sets against the store, filling gaps through the
/// reconciler.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn ResourceStore>,
    reconciler: Reconciler,
    max_id_set: u32,
}

impl Resolver {
    pub fn new(store: Arc<dyn ResourceStore>, reconciler: Reconciler, max_id_set: u32) -> Self {
        Self {
            store,
            reconciler,
            max_id_set,
        }
    }

    /// Resolve cloud ids to internal ids.
    ///
    /// Exactly one reconciliation attempt per call: identifiers still
    /// unresolved after it surface as
    /// [`CoreError::PartialSyncFailure`] naming the missing ids, never as
    /// a silent partial success. Callers wanting more retries call again.
    pub async fn resolve_or_sync(
        &self,
        kit: &Kit,
        opt: &ResolveOption,
    ) -> Result<HashMap<String, String>> {
        let keys = validate_keys(&opt.cloud_ids, self.max_id_set)?;
        let mut base = SyncScope::full(opt.vendor, opt.kind, &opt.account_id, &opt.region);
        base.resource_group = opt.resource_group.clone();

        let resolved = self
            .resolve_keys(kit, &base, keys, KeyField::CloudId)
            .await?;
        Ok(resolved
            .into_iter()
            .map(|(key, record)| (key, record.id))
            .collect())
    }

    /// Resolve self links to internal records.
    pub async fn resolve_self_links_or_sync(
        &self,
        kit: &Kit,
        opt: &SelfLinkResolveOption,
    ) -> Result<HashMap<String, ResolvedRef>> {
        let keys = validate_keys(&opt.self_links, self.max_id_set)?;
        let base = SyncScope::full(opt.vendor, opt.kind, &opt.account_id, &opt.region);

        let resolved = self
            .resolve_keys(kit, &base, keys, KeyField::SelfLink)
            .await?;
        Ok(resolved
            .into_iter()
            .map(|(key, record)| {
                (
                    key,
                    ResolvedRef {
                        id: record.id,
                        cloud_id: record.cloud_id,
                    },
                )
            })
            .collect())
    }

    /// Shared resolve protocol; only the key projection differs.
    async fn resolve_keys(
        &self,
        kit: &Kit,
        base: &SyncScope,
        keys: Vec<String>,
        key_field: KeyField,
    ) -> Result<HashMap<String, ResourceRecord>> {
        let mut mapped = self.query_keys(kit, base, &keys, &key_field).await?;

        // Common, cheap path: everything already in the store.
        if mapped.len() == keys.len() {
            return Ok(mapped);
        }

        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !mapped.contains_key(*key))
            .cloned()
            .collect();
        tracing::debug!(
            rid = %kit.rid,
            vendor = %base.vendor,
            kind = %base.kind,
            missing = missing.len(),
            "store misses part of the request, reconciling the missing subset"
        );

        let mut scope = base.clone();
        match key_field {
            KeyField::CloudId => scope.cloud_ids = Some(missing.clone()),
            KeyField::SelfLink => scope.self_links = Some(missing.clone()),
        }
        self.reconciler.reconcile(kit, &scope).await?;

        // Re-query the missing subset only; the first result stands.
        for (key, record) in self.query_keys(kit, base, &missing, &key_field).await? {
            mapped.insert(key, record);
        }

        let mut still_missing: Vec<String> = keys
            .iter()
            .filter(|key| !mapped.contains_key(*key))
            .cloned()
            .collect();
        if !still_missing.is_empty() {
            still_missing.sort();
            tracing::warn!(
                rid = %kit.rid,
                vendor = %base.vendor,
                kind = %base.kind,
                missing = ?still_missing,
                "identifiers unresolved after one reconciliation attempt"
            );
            return Err(CoreError::PartialSyncFailure {
                missing: still_missing,
            });
        }
        Ok(mapped)
    }

    async fn query_keys(
        &self,
        kit: &Kit,
        base: &SyncScope,
        keys: &[String],
        key_field: &KeyField,
    ) -> Result<HashMap<String, ResourceRecord>> {
        let mut filters = vec![
            Filter::eq("vendor", base.vendor.as_str()),
            Filter::eq("account_id", base.account_id.as_str()),
        ];
        if !base.region.is_empty() {
            filters.push(Filter::eq("region", base.region.as_str()));
        }
        filters.push(key_field.filter(keys));

        let records = self
            .store
            .list(
                kit,
                base.kind,
                &Filter::and(filters),
                &Page::first(self.max_id_set),
            )
            .await?;
        Ok(records
            .into_iter()
            .filter_map(|record| key_field.of(&record).map(|key| (key, record)))
            .collect())
    }
}

/// Reject empty and oversized requests before any I/O, then de-duplicate
/// preserving order.
fn validate_keys(keys: &[String], max_id_set: u32) -> Result<Vec<String>> {
    if keys.is_empty() {
        return Err(CoreError::InvalidInput("id set must not be empty".to_string()));
    }
    if keys.len() > max_id_set as usize {
        return Err(CoreError::InvalidInput(format!(
            "id set exceeds {max_id_set}"
        )));
    }
    let mut unique = Vec::with_capacity(keys.len());
    for key in keys {
        if !unique.contains(key) {
            unique.push(key.clone());
        }
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_set_is_rejected() {
        assert!(matches!(
            validate_keys(&[], 10),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn oversized_id_set_is_rejected() {
        let keys: Vec<String> = (0..11).map(|i| format!("vpc-{i}")).collect();
        assert!(matches!(
            validate_keys(&keys, 10),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn duplicates_are_collapsed_in_order() {
        let keys = vec![
            "vpc-b".to_string(),
            "vpc-a".to_string(),
            "vpc-b".to_string(),
        ];
        assert_eq!(
            validate_keys(&keys, 10).unwrap(),
            vec!["vpc-b".to_string(), "vpc-a".to_string()]
        );
    }
}
