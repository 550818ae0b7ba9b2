//! Normalized vendor-facing types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skybridge_core::{ResourceKind, RuleDirection, SgRuleSpec};

/// Account-scoped call context: the adapter resolves the credential for
/// `account_id` and targets `region` (or the Azure resource group).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListScope {
    pub account_id: String,
    pub region: String,
    pub resource_group: Option<String>,

    /// Restrict the listing to these cloud ids; `None` lists the full
    /// population of the scope.
    pub cloud_ids: Option<Vec<String>>,

    /// Restrict the listing to these self links, for vendors that key
    /// resources by self link instead of cloud id.
    pub self_links: Option<Vec<String>>,
}

impl ListScope {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            resource_group: None,
            cloud_ids: None,
            self_links: None,
        }
    }

    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = Some(resource_group.into());
        self
    }

    pub fn with_cloud_ids(mut self, cloud_ids: Vec<String>) -> Self {
        self.cloud_ids = Some(cloud_ids);
        self
    }

    pub fn with_self_links(mut self, self_links: Vec<String>) -> Self {
        self.self_links = Some(self_links);
        self
    }
}

/// One vendor-side resource, normalized to the record shape the store
/// keeps. Vendor-specific fields travel in `extension`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorResource {
    pub cloud_id: String,
    pub name: String,
    pub status: String,

    /// Self link for vendors that key resources by link instead of id.
    pub self_link: Option<String>,

    pub extension: Value,
}

impl VendorResource {
    pub fn new(cloud_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cloud_id: cloud_id.into(),
            name: name.into(),
            status: String::new(),
            self_link: None,
            extension: Value::Object(Default::default()),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_self_link(mut self, self_link: impl Into<String>) -> Self {
        self.self_link = Some(self_link.into());
        self
    }

    pub fn with_extension(mut self, extension: Value) -> Self {
        self.extension = extension;
        self
    }
}

/// Listing cursor. Listings must be exhausted page by page before a diff is
/// computed; a partial read would cause false deletes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VendorPage {
    pub offset: u32,
    pub limit: u32,
}

impl VendorPage {
    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorPageResult {
    pub resources: Vec<VendorResource>,

    /// Offset of the next page, or `None` when this was the last page.
    pub next_offset: Option<u32>,
}

/// The full ordered rule set of one security group, both directions, as
/// listed vendor-side in one shot together with its version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgRuleListing {
    pub version: String,
    pub egress: Vec<SgRuleSpec>,
    pub ingress: Vec<SgRuleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgRuleCreateOption {
    pub cloud_security_group_id: String,
    pub egress: Vec<SgRuleSpec>,
    pub ingress: Vec<SgRuleSpec>,
}

/// Index-addressed rule update, valid only against `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgRuleUpdateOption {
    pub cloud_security_group_id: String,
    pub version: String,
    pub direction: RuleDirection,
    pub policy_index: i64,
    pub rule: SgRuleSpec,
}

/// Index-addressed rule deletion, valid only against `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgRuleDeleteOption {
    pub cloud_security_group_id: String,
    pub version: String,
    pub direction: RuleDirection,
    pub policy_indexes: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCreateOption {
    pub kind: ResourceKind,
    pub name: String,

    /// Vendor-specific creation parameters, in the extension schema of the
    /// resource kind.
    pub spec: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUpdateOption {
    pub kind: ResourceKind,
    pub cloud_id: String,
    pub patch: Value,
}

/// Instance control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceOp {
    Start,
    Stop,
    Delete,
}

impl std::fmt::Display for InstanceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceOp::Start => write!(f, "start"),
            InstanceOp::Stop => write!(f, "stop"),
            InstanceOp::Delete => write!(f, "delete"),
        }
    }
}
