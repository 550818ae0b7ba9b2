//! Vendor adapter trait

use crate::types::{
    ListScope, ResourceCreateOption, ResourceUpdateOption, SgRuleCreateOption,
    SgRuleDeleteOption, SgRuleListing, SgRuleUpdateOption, VendorPage, VendorPageResult,
};
use async_trait::async_trait;
use skybridge_core::{Kit, ResourceKind, Result, Vendor};

/// Capability interface over one vendor's control-plane API.
///
/// All implementations return normalized results matching the resource
/// record extension schema for the kind; the engine dispatches on the
/// vendor tag and never looks inside vendor responses itself.
///
/// Mutating calls that are long-running vendor-side (e.g. instance delete)
/// block until the provider reports completion; the engine only sees
/// success or failure.
#[async_trait]
pub trait VendorAdapter: Send + Sync {
    /// The vendor this adapter serves.
    fn vendor(&self) -> Vendor;

    /// One page of the vendor-side listing for the scope.
    async fn list_resources(
        &self,
        kit: &Kit,
        kind: ResourceKind,
        scope: &ListScope,
        page: &VendorPage,
    ) -> Result<VendorPageResult>;

    /// Create a resource; returns the vendor-assigned cloud id.
    async fn create_resource(
        &self,
        kit: &Kit,
        scope: &ListScope,
        opt: &ResourceCreateOption,
    ) -> Result<String>;

    async fn update_resource(
        &self,
        kit: &Kit,
        scope: &ListScope,
        opt: &ResourceUpdateOption,
    ) -> Result<()>;

    async fn delete_resource(
        &self,
        kit: &Kit,
        scope: &ListScope,
        kind: ResourceKind,
        cloud_id: &str,
    ) -> Result<()>;

    async fn start_instance(&self, kit: &Kit, scope: &ListScope, cloud_id: &str) -> Result<()>;

    async fn stop_instance(&self, kit: &Kit, scope: &ListScope, cloud_id: &str) -> Result<()>;

    /// The complete ordered rule set of one security group, never a delta.
    async fn list_sg_rules(
        &self,
        kit: &Kit,
        scope: &ListScope,
        cloud_security_group_id: &str,
    ) -> Result<SgRuleListing>;

    async fn create_sg_rules(
        &self,
        kit: &Kit,
        scope: &ListScope,
        opt: &SgRuleCreateOption,
    ) -> Result<()>;

    async fn update_sg_rule(
        &self,
        kit: &Kit,
        scope: &ListScope,
        opt: &SgRuleUpdateOption,
    ) -> Result<()>;

    async fn delete_sg_rules(
        &self,
        kit: &Kit,
        scope: &ListScope,
        opt: &SgRuleDeleteOption,
    ) -> Result<()>;
}
