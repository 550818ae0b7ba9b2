//! Locked mutate-then-resync flows
//!
//! Every remote mutation runs the same pattern: acquire the flow lock,
//! call the vendor adapter, then always attempt a reconciliation for the
//! affected scope, even when the mutate call failed (to capture any
//! partial vendor-side effect), and release the lock on every exit path.
//! The store never reflects a mutation that was not re-verified against
//! the vendor.

use crate::call::with_deadline;
use crate::engine::SyncEngine;
use crate::reconciler::{SyncScope, SyncSummary};
use crate::rules::{RuleSyncScope, RuleSyncSummary};
use serde::{Deserialize, Serialize};
use skybridge_core::{
    CoreError, FlowKind, Kit, LockKey, ResFlowRel, ResourceKind, ResourceRecord, Result,
    SgRuleSpec,
};
use skybridge_cloud::{
    InstanceOp, ListScope, SgRuleCreateOption, SgRuleDeleteOption, SgRuleUpdateOption,
};
use uuid::Uuid;

/// Create rules on a security group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgRulesCreateReq {
    pub account_id: String,
    /// Internal id of the security group.
    pub security_group_id: String,
    pub egress: Vec<SgRuleSpec>,
    pub ingress: Vec<SgRuleSpec>,
}

/// Update one rule, addressed by its internal id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgRuleUpdateReq {
    pub account_id: String,
    pub security_group_id: String,
    pub rule_id: String,
    pub rule: SgRuleSpec,
}

/// Delete one rule, addressed by its internal id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgRuleDeleteReq {
    pub account_id: String,
    pub security_group_id: String,
    pub rule_id: String,
}

/// Start, stop or delete one compute instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceOpReq {
    pub account_id: String,
    /// Internal id of the instance.
    pub instance_id: String,
    pub op: InstanceOp,
}

/// The vendor-side rule mutation a rule flow performs.
enum RuleMutation {
    Create(SgRuleCreateOption),
    Update(SgRuleUpdateOption),
    Delete(SgRuleDeleteOption),
}

impl RuleMutation {
    fn operation(&self) -> &'static str {
        match self {
            RuleMutation::Create(_) => "create_sg_rules",
            RuleMutation::Update(_) => "update_sg_rule",
            RuleMutation::Delete(_) => "delete_sg_rules",
        }
    }
}

impl SyncEngine {
    /// Create security-group rules and resync the rule set.
    ///
    /// Returns the internal ids assigned to the newly observed rules.
    pub async fn create_security_group_rules(
        &self,
        kit: &Kit,
        req: &SgRulesCreateReq,
    ) -> Result<Vec<String>> {
        if req.egress.is_empty() && req.ingress.is_empty() {
            return Err(CoreError::InvalidInput(
                "rule set to create must not be empty".to_string(),
            ));
        }
        let sg = self.owned_security_group(kit, req, &req.security_group_id).await?;
        let cloud_sg_id = cloud_id_of(&sg)?;

        let mutation = RuleMutation::Create(SgRuleCreateOption {
            cloud_security_group_id: cloud_sg_id,
            egress: req.egress.clone(),
            ingress: req.ingress.clone(),
        });
        let summary = self.run_rule_flow(kit, &sg, mutation).await?;
        Ok(summary.created_ids)
    }

    /// Update one security-group rule and resync the rule set.
    pub async fn update_security_group_rule(
        &self,
        kit: &Kit,
        req: &SgRuleUpdateReq,
    ) -> Result<RuleSyncSummary> {
        let sg = self.owned_security_group(kit, req, &req.security_group_id).await?;
        let stored = self.stored_rule(kit, &sg, &req.rule_id).await?;

        let mutation = RuleMutation::Update(SgRuleUpdateOption {
            cloud_security_group_id: stored.cloud_security_group_id.clone(),
            version: stored.version.clone(),
            direction: stored.direction,
            policy_index: stored.policy_index,
            rule: req.rule.clone(),
        });
        self.run_rule_flow(kit, &sg, mutation).await
    }

    /// Delete one security-group rule and resync the rule set.
    pub async fn delete_security_group_rule(
        &self,
        kit: &Kit,
        req: &SgRuleDeleteReq,
    ) -> Result<RuleSyncSummary> {
        let sg = self.owned_security_group(kit, req, &req.security_group_id).await?;
        let stored = self.stored_rule(kit, &sg, &req.rule_id).await?;

        let mutation = RuleMutation::Delete(SgRuleDeleteOption {
            cloud_security_group_id: stored.cloud_security_group_id.clone(),
            version: stored.version.clone(),
            direction: stored.direction,
            policy_indexes: vec![stored.policy_index],
        });
        self.run_rule_flow(kit, &sg, mutation).await
    }

    /// Start, stop or delete an instance and resync the affected scope.
    ///
    /// Start/stop resyncs the single instance; delete resyncs the full
    /// population of the account/region so the disappearance converges
    /// through the full-scope delete rule.
    pub async fn operate_instance(&self, kit: &Kit, req: &InstanceOpReq) -> Result<SyncSummary> {
        let cvm = self.get_record(kit, ResourceKind::Cvm, &req.instance_id).await?;
        if cvm.account_id != req.account_id {
            return Err(CoreError::InvalidInput(format!(
                "instance {} does not belong to account {}",
                req.instance_id, req.account_id
            )));
        }
        let cloud_id = cloud_id_of(&cvm)?;
        let adapter = self.reconciler().adapters().get(cvm.vendor)?;

        let flow_kind = match req.op {
            InstanceOp::Delete => FlowKind::ResourceDelete,
            InstanceOp::Start | InstanceOp::Stop => FlowKind::InstanceOperate,
        };
        let key = LockKey::new(ResourceKind::Cvm, &cvm.id, flow_kind);
        let owner = Uuid::new_v4().to_string();
        self.flow_lock()
            .acquire(kit, &key, &owner, self.config().lock_ttl())
            .await?;
        let flow_id = self.register_flow(kit, &cvm.id, flow_kind).await;

        let scope = ListScope::new(&cvm.account_id, &cvm.region);
        let vendor = cvm.vendor;
        let mutate_result = with_deadline(
            kit,
            async {
                match req.op {
                    InstanceOp::Start => adapter.start_instance(kit, &scope, &cloud_id).await,
                    InstanceOp::Stop => adapter.stop_instance(kit, &scope, &cloud_id).await,
                    InstanceOp::Delete => {
                        adapter
                            .delete_resource(kit, &scope, ResourceKind::Cvm, &cloud_id)
                            .await
                    }
                }
            },
            || CoreError::VendorUnavailable {
                vendor,
                operation: req.op.to_string(),
                reason: "deadline exceeded".to_string(),
            },
        )
        .await;
        if let Err(err) = &mutate_result {
            tracing::error!(
                rid = %kit.rid,
                instance_id = %cvm.id,
                op = %req.op,
                error = %err,
                "instance operation failed, still resyncing"
            );
        }

        let sync_scope = match req.op {
            InstanceOp::Delete => {
                SyncScope::full(cvm.vendor, ResourceKind::Cvm, &cvm.account_id, &cvm.region)
            }
            InstanceOp::Start | InstanceOp::Stop => SyncScope::subset(
                cvm.vendor,
                ResourceKind::Cvm,
                &cvm.account_id,
                &cvm.region,
                vec![cloud_id.clone()],
            ),
        };
        let sync_result = self.reconciler().reconcile(kit, &sync_scope).await;

        self.finish_flow(kit, &cvm.id, &flow_id, &key, &owner).await;
        conclude(kit, mutate_result, sync_result)
    }

    /// The shared rule-flow driver: lock, mutate, always resync, release.
    async fn run_rule_flow(
        &self,
        kit: &Kit,
        sg: &ResourceRecord,
        mutation: RuleMutation,
    ) -> Result<RuleSyncSummary> {
        let adapter = self.reconciler().adapters().get(sg.vendor)?;
        let cloud_sg_id = cloud_id_of(sg)?;

        let key = LockKey::new(ResourceKind::SecurityGroup, &sg.id, FlowKind::RuleUpdate);
        let owner = Uuid::new_v4().to_string();
        self.flow_lock()
            .acquire(kit, &key, &owner, self.config().lock_ttl())
            .await?;
        let flow_id = self.register_flow(kit, &sg.id, FlowKind::RuleUpdate).await;

        let scope = ListScope::new(&sg.account_id, &sg.region);
        let operation = mutation.operation();
        let vendor = sg.vendor;
        let mutate_result = with_deadline(
            kit,
            async {
                match &mutation {
                    RuleMutation::Create(opt) => adapter.create_sg_rules(kit, &scope, opt).await,
                    RuleMutation::Update(opt) => adapter.update_sg_rule(kit, &scope, opt).await,
                    RuleMutation::Delete(opt) => adapter.delete_sg_rules(kit, &scope, opt).await,
                }
            },
            || CoreError::VendorUnavailable {
                vendor,
                operation: operation.to_string(),
                reason: "deadline exceeded".to_string(),
            },
        )
        .await;
        if let Err(err) = &mutate_result {
            tracing::error!(
                rid = %kit.rid,
                security_group_id = %sg.id,
                operation,
                error = %err,
                "rule mutation failed, still resyncing the rule set"
            );
        }

        let rule_scope = RuleSyncScope {
            vendor: sg.vendor,
            account_id: sg.account_id.clone(),
            region: sg.region.clone(),
            resource_group: None,
            security_group_id: sg.id.clone(),
            cloud_security_group_id: cloud_sg_id,
        };
        let sync_result = self.reconciler().reconcile_sg_rules(kit, &rule_scope).await;

        self.finish_flow(kit, &sg.id, &flow_id, &key, &owner).await;
        conclude(kit, mutate_result, sync_result)
    }

    /// Load the security group and verify it belongs to the requested
    /// account.
    async fn owned_security_group<R: AccountScoped>(
        &self,
        kit: &Kit,
        req: &R,
        security_group_id: &str,
    ) -> Result<ResourceRecord> {
        let sg = self
            .get_record(kit, ResourceKind::SecurityGroup, security_group_id)
            .await?;
        if sg.account_id != req.account_id() {
            return Err(CoreError::InvalidInput(format!(
                "security group {} does not belong to account {}",
                security_group_id,
                req.account_id()
            )));
        }
        Ok(sg)
    }

    async fn stored_rule(
        &self,
        kit: &Kit,
        sg: &ResourceRecord,
        rule_id: &str,
    ) -> Result<skybridge_core::SgRule> {
        let rules = self.reconciler().store().list_sg_rules(kit, &sg.id).await?;
        rules
            .into_iter()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| CoreError::NotFound(format!("security group rule {rule_id}")))
    }

    /// Register the flow relation. Advisory discovery metadata: a failure
    /// is logged, not fatal to the flow.
    async fn register_flow(&self, kit: &Kit, res_id: &str, flow_kind: FlowKind) -> String {
        let flow_id = Uuid::new_v4().to_string();
        if let Err(err) = self
            .locks()
            .create_flow_rel(kit, ResFlowRel::new(res_id, &flow_id, flow_kind))
            .await
        {
            tracing::warn!(
                rid = %kit.rid,
                res_id,
                error = %err,
                "flow relation not registered"
            );
        }
        flow_id
    }

    /// Clean up the flow relation and release the lock. Runs on every exit
    /// path; a failed release is logged and left to the TTL backstop
    /// rather than masking the flow result.
    async fn finish_flow(&self, kit: &Kit, res_id: &str, flow_id: &str, key: &LockKey, owner: &str) {
        if let Err(err) = self.locks().delete_flow_rel(kit, res_id, flow_id).await {
            tracing::warn!(rid = %kit.rid, res_id, error = %err, "flow relation not removed");
        }
        if let Err(err) = self.flow_lock().release(kit, key, owner).await {
            tracing::error!(rid = %kit.rid, key = %key, error = %err, "flow lock release failed");
        }
    }
}

/// Combine the mutate and resync results. The mutate error wins; the
/// compensating resync's own error on that path is logged and dropped.
fn conclude<T>(kit: &Kit, mutate: Result<()>, sync: Result<T>) -> Result<T> {
    match mutate {
        Err(err) => {
            if let Err(sync_err) = sync {
                tracing::warn!(
                    rid = %kit.rid,
                    error = %sync_err,
                    "post-failure resync also failed"
                );
            }
            Err(err)
        }
        Ok(()) => sync,
    }
}

fn cloud_id_of(record: &ResourceRecord) -> Result<String> {
    record.cloud_id.clone().ok_or_else(|| {
        CoreError::StoreInconsistency(format!("record {} has no cloud id", record.id))
    })
}

trait AccountScoped {
    fn account_id(&self) -> &str;
}

impl AccountScoped for SgRulesCreateReq {
    fn account_id(&self) -> &str {
        &self.account_id
    }
}

impl AccountScoped for SgRuleUpdateReq {
    fn account_id(&self) -> &str {
        &self.account_id
    }
}

impl AccountScoped for SgRuleDeleteReq {
    fn account_id(&self) -> &str {
        &self.account_id
    }
}
