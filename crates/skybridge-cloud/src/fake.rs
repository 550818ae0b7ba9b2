//! Scriptable fake adapter
//!
//! Serves programmed listings, applies mutations to its own vendor-side
//! state (bumping the rule-set version the way a real vendor does), counts
//! calls and injects failures. Backs the engine test-suites.

use crate::adapter::VendorAdapter;
use crate::types::{
    ListScope, ResourceCreateOption, ResourceUpdateOption, SgRuleCreateOption,
    SgRuleDeleteOption, SgRuleListing, SgRuleUpdateOption, VendorPage, VendorPageResult,
    VendorResource,
};
use async_trait::async_trait;
use skybridge_core::{CoreError, Kit, ResourceKind, Result, RuleDirection, SgRuleSpec, Vendor};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct RuleSet {
    version: u64,
    egress: Vec<SgRuleSpec>,
    ingress: Vec<SgRuleSpec>,
}

#[derive(Default)]
struct FakeState {
    resources: Vec<VendorResource>,
    rule_sets: std::collections::HashMap<String, RuleSet>,
    next_cloud_id: u64,

    list_calls: u64,
    rule_list_calls: u64,
    mutate_calls: u64,

    fail_next_list: Option<String>,
    fail_after_pages: Option<u64>,
    pages_served: u64,
    fail_next_mutate: Option<String>,
    list_delay: Option<Duration>,
    ignore_scope_filter: bool,
}

/// A vendor adapter whose cloud is a mutex-guarded struct.
pub struct FakeAdapter {
    vendor: Vendor,
    state: Mutex<FakeState>,
}

impl FakeAdapter {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            state: Mutex::new(FakeState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake adapter mutex poisoned")
    }

    fn unavailable(&self, operation: &str, reason: impl Into<String>) -> CoreError {
        CoreError::VendorUnavailable {
            vendor: self.vendor,
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    // ---- scripting surface ----

    pub fn push_resource(&self, resource: VendorResource) {
        self.state().resources.push(resource);
    }

    pub fn set_rules(
        &self,
        cloud_security_group_id: impl Into<String>,
        version: u64,
        egress: Vec<SgRuleSpec>,
        ingress: Vec<SgRuleSpec>,
    ) {
        self.state().rule_sets.insert(
            cloud_security_group_id.into(),
            RuleSet {
                version,
                egress,
                ingress,
            },
        );
    }

    /// Current vendor-side rule-set version, for assertions.
    pub fn rule_version(&self, cloud_security_group_id: &str) -> Option<u64> {
        self.state()
            .rule_sets
            .get(cloud_security_group_id)
            .map(|set| set.version)
    }

    /// Fail the next `list_resources` call.
    pub fn fail_next_list(&self, reason: impl Into<String>) {
        self.state().fail_next_list = Some(reason.into());
    }

    /// Serve `pages` pages, then fail every further `list_resources` call.
    pub fn fail_after_pages(&self, pages: u64) {
        self.state().fail_after_pages = Some(pages);
    }

    /// Fail the next mutating call.
    pub fn fail_next_mutate(&self, reason: impl Into<String>) {
        self.state().fail_next_mutate = Some(reason.into());
    }

    /// Delay every listing, for deadline tests.
    pub fn set_list_delay(&self, delay: Duration) {
        self.state().list_delay = Some(delay);
    }

    /// Emulate a vendor whose list API cannot filter by identifier and
    /// always returns the full population of the scope.
    pub fn set_ignore_scope_filter(&self, ignore: bool) {
        self.state().ignore_scope_filter = ignore;
    }

    pub fn list_calls(&self) -> u64 {
        self.state().list_calls
    }

    pub fn rule_list_calls(&self) -> u64 {
        self.state().rule_list_calls
    }

    pub fn mutate_calls(&self) -> u64 {
        self.state().mutate_calls
    }

    // ---- shared behavior ----

    fn take_mutate_failure(&self, operation: &str) -> Result<()> {
        let mut state = self.state();
        state.mutate_calls += 1;
        if let Some(reason) = state.fail_next_mutate.take() {
            return Err(self.unavailable(operation, reason));
        }
        Ok(())
    }

    fn check_version(&self, operation: &str, set: &RuleSet, version: &str) -> Result<()> {
        let requested: u64 = version
            .parse()
            .map_err(|_| self.unavailable(operation, format!("bad version {version}")))?;
        if requested != set.version {
            return Err(self.unavailable(
                operation,
                format!("rule-set version conflict: have {}, got {requested}", set.version),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl VendorAdapter for FakeAdapter {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    async fn list_resources(
        &self,
        _kit: &Kit,
        _kind: ResourceKind,
        scope: &ListScope,
        page: &VendorPage,
    ) -> Result<VendorPageResult> {
        let delay = self.state().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.list_calls += 1;
        if let Some(reason) = state.fail_next_list.take() {
            return Err(self.unavailable("list", reason));
        }
        if let Some(limit) = state.fail_after_pages {
            if state.pages_served >= limit {
                return Err(self.unavailable("list", "listing interrupted mid-page"));
            }
        }
        state.pages_served += 1;

        let ignore_filter = state.ignore_scope_filter;
        let filtered: Vec<VendorResource> = state
            .resources
            .iter()
            .filter(|resource| match &scope.cloud_ids {
                Some(ids) if !ignore_filter => ids.contains(&resource.cloud_id),
                _ => true,
            })
            .filter(|resource| match &scope.self_links {
                Some(links) if !ignore_filter => resource
                    .self_link
                    .as_ref()
                    .is_some_and(|link| links.contains(link)),
                _ => true,
            })
            .cloned()
            .collect();

        let start = page.offset as usize;
        let end = (start + page.limit as usize).min(filtered.len());
        let resources = if start < filtered.len() {
            filtered[start..end].to_vec()
        } else {
            Vec::new()
        };
        let next_offset = if end < filtered.len() {
            Some(end as u32)
        } else {
            None
        };
        Ok(VendorPageResult {
            resources,
            next_offset,
        })
    }

    async fn create_resource(
        &self,
        _kit: &Kit,
        _scope: &ListScope,
        opt: &ResourceCreateOption,
    ) -> Result<String> {
        self.take_mutate_failure("create")?;
        let mut state = self.state();
        state.next_cloud_id += 1;
        let cloud_id = format!("{}-{}-{:04}", self.vendor, opt.kind, state.next_cloud_id);
        state.resources.push(
            VendorResource::new(&cloud_id, &opt.name)
                .with_status("AVAILABLE")
                .with_extension(opt.spec.clone()),
        );
        Ok(cloud_id)
    }

    async fn update_resource(
        &self,
        _kit: &Kit,
        _scope: &ListScope,
        opt: &ResourceUpdateOption,
    ) -> Result<()> {
        self.take_mutate_failure("update")?;
        let mut state = self.state();
        let resource = state
            .resources
            .iter_mut()
            .find(|resource| resource.cloud_id == opt.cloud_id)
            .ok_or_else(|| self.unavailable("update", format!("{} not found", opt.cloud_id)))?;
        skybridge_core::merge_extension(&mut resource.extension, &opt.patch);
        Ok(())
    }

    async fn delete_resource(
        &self,
        _kit: &Kit,
        _scope: &ListScope,
        _kind: ResourceKind,
        cloud_id: &str,
    ) -> Result<()> {
        self.take_mutate_failure("delete")?;
        self.state()
            .resources
            .retain(|resource| resource.cloud_id != cloud_id);
        Ok(())
    }

    async fn start_instance(&self, _kit: &Kit, _scope: &ListScope, cloud_id: &str) -> Result<()> {
        self.take_mutate_failure("start")?;
        let mut state = self.state();
        if let Some(resource) = state
            .resources
            .iter_mut()
            .find(|resource| resource.cloud_id == cloud_id)
        {
            resource.status = "RUNNING".to_string();
        }
        Ok(())
    }

    async fn stop_instance(&self, _kit: &Kit, _scope: &ListScope, cloud_id: &str) -> Result<()> {
        self.take_mutate_failure("stop")?;
        let mut state = self.state();
        if let Some(resource) = state
            .resources
            .iter_mut()
            .find(|resource| resource.cloud_id == cloud_id)
        {
            resource.status = "STOPPED".to_string();
        }
        Ok(())
    }

    async fn list_sg_rules(
        &self,
        _kit: &Kit,
        _scope: &ListScope,
        cloud_security_group_id: &str,
    ) -> Result<SgRuleListing> {
        let mut state = self.state();
        state.rule_list_calls += 1;
        let set = state
            .rule_sets
            .entry(cloud_security_group_id.to_string())
            .or_default();
        Ok(SgRuleListing {
            version: set.version.to_string(),
            egress: set.egress.clone(),
            ingress: set.ingress.clone(),
        })
    }

    async fn create_sg_rules(
        &self,
        _kit: &Kit,
        _scope: &ListScope,
        opt: &SgRuleCreateOption,
    ) -> Result<()> {
        self.take_mutate_failure("create_sg_rules")?;
        let mut state = self.state();
        let set = state
            .rule_sets
            .entry(opt.cloud_security_group_id.clone())
            .or_default();
        set.egress.extend(opt.egress.iter().cloned());
        set.ingress.extend(opt.ingress.iter().cloned());
        set.version += 1;
        Ok(())
    }

    async fn update_sg_rule(
        &self,
        _kit: &Kit,
        _scope: &ListScope,
        opt: &SgRuleUpdateOption,
    ) -> Result<()> {
        self.take_mutate_failure("update_sg_rule")?;
        let mut state = self.state();
        let set = state
            .rule_sets
            .get_mut(&opt.cloud_security_group_id)
            .ok_or_else(|| {
                self.unavailable(
                    "update_sg_rule",
                    format!("{} not found", opt.cloud_security_group_id),
                )
            })?;
        self.check_version("update_sg_rule", set, &opt.version)?;
        let rules = match opt.direction {
            RuleDirection::Egress => &mut set.egress,
            RuleDirection::Ingress => &mut set.ingress,
        };
        let index = opt.policy_index as usize;
        if index >= rules.len() {
            return Err(self.unavailable(
                "update_sg_rule",
                format!("policy index {index} out of range"),
            ));
        }
        rules[index] = opt.rule.clone();
        set.version += 1;
        Ok(())
    }

    async fn delete_sg_rules(
        &self,
        _kit: &Kit,
        _scope: &ListScope,
        opt: &SgRuleDeleteOption,
    ) -> Result<()> {
        self.take_mutate_failure("delete_sg_rules")?;
        let mut state = self.state();
        let set = state
            .rule_sets
            .get_mut(&opt.cloud_security_group_id)
            .ok_or_else(|| {
                self.unavailable(
                    "delete_sg_rules",
                    format!("{} not found", opt.cloud_security_group_id),
                )
            })?;
        self.check_version("delete_sg_rules", set, &opt.version)?;
        let rules = match opt.direction {
            RuleDirection::Egress => &mut set.egress,
            RuleDirection::Ingress => &mut set.ingress,
        };
        let mut indexes: Vec<usize> = opt.policy_indexes.iter().map(|i| *i as usize).collect();
        indexes.sort_unstable();
        indexes.dedup();
        for index in indexes.iter().rev() {
            if *index >= rules.len() {
                return Err(self.unavailable(
                    "delete_sg_rules",
                    format!("policy index {index} out of range"),
                ));
            }
            rules.remove(*index);
        }
        set.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listing_pages_are_exhaustive() {
        let adapter = FakeAdapter::new(Vendor::TCloud);
        for i in 0..5 {
            adapter.push_resource(VendorResource::new(format!("vpc-{i}"), format!("net-{i}")));
        }
        let kit = Kit::new("admin");
        let scope = ListScope::new("acc-1", "ap-guangzhou");

        let mut collected = Vec::new();
        let mut page = VendorPage::first(2);
        loop {
            let result = adapter
                .list_resources(&kit, ResourceKind::Vpc, &scope, &page)
                .await
                .unwrap();
            collected.extend(result.resources);
            match result.next_offset {
                Some(offset) => page.offset = offset,
                None => break,
            }
        }
        assert_eq!(collected.len(), 5);
        assert_eq!(adapter.list_calls(), 3);
    }

    #[tokio::test]
    async fn scoped_listing_filters_cloud_ids() {
        let adapter = FakeAdapter::new(Vendor::Aws);
        adapter.push_resource(VendorResource::new("vpc-a", "a"));
        adapter.push_resource(VendorResource::new("vpc-b", "b"));
        let kit = Kit::new("admin");
        let scope =
            ListScope::new("acc-1", "us-east-1").with_cloud_ids(vec!["vpc-b".to_string()]);

        let result = adapter
            .list_resources(&kit, ResourceKind::Vpc, &scope, &VendorPage::first(10))
            .await
            .unwrap();
        assert_eq!(result.resources.len(), 1);
        assert_eq!(result.resources[0].cloud_id, "vpc-b");
    }

    #[tokio::test]
    async fn rule_mutations_bump_version() {
        let adapter = FakeAdapter::new(Vendor::TCloud);
        adapter.set_rules("sg-cloud-1", 7, vec![], vec![SgRuleSpec::allow("tcp", "22", "10.0.0.0/8")]);
        let kit = Kit::new("admin");
        let scope = ListScope::new("acc-1", "ap-guangzhou");

        adapter
            .create_sg_rules(
                &kit,
                &scope,
                &SgRuleCreateOption {
                    cloud_security_group_id: "sg-cloud-1".to_string(),
                    egress: vec![],
                    ingress: vec![SgRuleSpec::allow("tcp", "443", "0.0.0.0/0")],
                },
            )
            .await
            .unwrap();
        assert_eq!(adapter.rule_version("sg-cloud-1"), Some(8));

        let stale = SgRuleDeleteOption {
            cloud_security_group_id: "sg-cloud-1".to_string(),
            version: "7".to_string(),
            direction: RuleDirection::Ingress,
            policy_indexes: vec![0],
        };
        assert!(adapter.delete_sg_rules(&kit, &scope, &stale).await.is_err());
    }
}
