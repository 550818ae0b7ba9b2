//! Security-group rules
//!
//! Rules are index-based sub-resources: the vendor identifies a rule by its
//! ordinal position within the ordered rule set of one direction, not by a
//! stable id. An index is only valid against the rule-set version it was
//! listed with; any create/update/delete shifts the indices of every later
//! rule, so the whole set must be re-listed before indices can be trusted
//! again.

use crate::model::resource::Revision;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleDirection {
    Egress,
    Ingress,
}

impl std::fmt::Display for RuleDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleDirection::Egress => write!(f, "egress"),
            RuleDirection::Ingress => write!(f, "ingress"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    Accept,
    Drop,
}

/// Vendor-neutral rule payload, shared by the stored record, the vendor
/// listing and the mutation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SgRuleSpec {
    pub protocol: Option<String>,
    pub port: Option<String>,
    pub ipv4_cidr: Option<String>,
    pub ipv6_cidr: Option<String>,
    pub cloud_target_security_group_id: Option<String>,
    pub action: RuleAction,
    pub memo: Option<String>,
}

impl SgRuleSpec {
    pub fn allow(protocol: impl Into<String>, port: impl Into<String>, cidr: impl Into<String>) -> Self {
        Self {
            protocol: Some(protocol.into()),
            port: Some(port.into()),
            ipv4_cidr: Some(cidr.into()),
            ipv6_cidr: None,
            cloud_target_security_group_id: None,
            action: RuleAction::Accept,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// A stored security-group rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgRule {
    /// Store-assigned identifier, stable across index shifts as long as the
    /// rule content survives.
    pub id: String,

    /// Internal id of the parent security group.
    pub security_group_id: String,

    pub cloud_security_group_id: String,

    pub direction: RuleDirection,

    /// Ordinal position within the ordered set of this direction, valid
    /// only against [`version`](Self::version).
    pub policy_index: i64,

    /// Vendor-side rule-set version captured when this rule was listed.
    pub version: String,

    #[serde(flatten)]
    pub spec: SgRuleSpec,

    pub revision: Revision,
}
