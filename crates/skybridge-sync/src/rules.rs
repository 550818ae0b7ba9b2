//! Security-group rule reconciliation
//!
//! Rule indices are positional and shift on every mutation, so a pass
//! never patches an index incrementally: it re-lists the entire ordered
//! set for the parent, recomputes every index from zero and replaces the
//! stored mapping atomically together with the rule-set version. Rules
//! whose content survived keep their internal ids.

use crate::call::with_deadline;
use crate::reconciler::Reconciler;
use serde::{Deserialize, Serialize};
use skybridge_core::{CoreError, Kit, Result, RuleDirection, SgRule, SgRuleSpec, Vendor};
use skybridge_cloud::ListScope;
use skybridge_store::NewSgRule;

/// Scope of one rule-set reconciliation: a single parent security group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSyncScope {
    pub vendor: Vendor,
    pub account_id: String,
    pub region: String,
    pub resource_group: Option<String>,
    /// Internal id of the parent security group.
    pub security_group_id: String,
    pub cloud_security_group_id: String,
}

/// Outcome of one rule-set reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSyncSummary {
    /// Rule-set version the stored mapping now reflects.
    pub version: String,

    /// Internal ids assigned to rules first observed by this pass.
    pub created_ids: Vec<String>,

    /// Rules whose content survived from the previous generation.
    pub kept: u64,

    /// Rules of the previous generation no longer listed vendor-side.
    pub removed: u64,
}

fn parse_rule_version(version: &str) -> Result<u64> {
    version.parse().map_err(|_| {
        CoreError::StoreInconsistency(format!("unparseable rule-set version: {version}"))
    })
}

/// Take the first unconsumed stored rule matching the listed content.
///
/// Content-identical duplicates are legal vendor-side, so matching must
/// consume: two identical listed rules claim two distinct stored rows.
fn take_matching(
    stored: &[SgRule],
    consumed: &mut [bool],
    direction: RuleDirection,
    spec: &SgRuleSpec,
) -> Option<usize> {
    let found = stored.iter().enumerate().position(|(index, rule)| {
        !consumed[index] && rule.direction == direction && &rule.spec == spec
    });
    if let Some(index) = found {
        consumed[index] = true;
    }
    found
}

impl Reconciler {
    /// Reconcile the full rule set of one security group.
    ///
    /// A listing whose version is below the stored one, or equal to it
    /// while the content differs, does not correspond to any generation
    /// the store could have observed under the lock protocol; the pass
    /// fails with [`CoreError::StoreInconsistency`] and writes nothing.
    pub async fn reconcile_sg_rules(
        &self,
        kit: &Kit,
        scope: &RuleSyncScope,
    ) -> Result<RuleSyncSummary> {
        let adapter = self.adapters().get(scope.vendor)?;
        let mut list_scope = ListScope::new(&scope.account_id, &scope.region);
        list_scope.resource_group = scope.resource_group.clone();

        let listing = with_deadline(
            kit,
            adapter.list_sg_rules(kit, &list_scope, &scope.cloud_security_group_id),
            || CoreError::VendorUnavailable {
                vendor: scope.vendor,
                operation: "list_sg_rules".to_string(),
                reason: "deadline exceeded".to_string(),
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(
                rid = %kit.rid,
                vendor = %scope.vendor,
                security_group_id = %scope.security_group_id,
                error = %err,
                "rule listing failed, aborting pass without writes"
            );
            err
        })?;

        let listed_version = parse_rule_version(&listing.version)?;
        let stored = self
            .store()
            .list_sg_rules(kit, &scope.security_group_id)
            .await?;
        let stored_version = stored
            .iter()
            .map(|rule| parse_rule_version(&rule.version))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .max();

        if let Some(stored_version) = stored_version {
            if listed_version < stored_version {
                return Err(CoreError::StoreInconsistency(format!(
                    "rule set {} listed at version {listed_version}, store has {stored_version}",
                    scope.cloud_security_group_id
                )));
            }
        }

        // Recompute every index from zero against the fresh listing,
        // retaining internal ids where the content survived.
        let mut consumed = vec![false; stored.len()];
        let mut replacement = Vec::with_capacity(listing.egress.len() + listing.ingress.len());
        let mut fresh = 0u64;
        let mut index_moved = false;
        for (direction, specs) in [
            (RuleDirection::Egress, &listing.egress),
            (RuleDirection::Ingress, &listing.ingress),
        ] {
            for (index, spec) in specs.iter().enumerate() {
                let policy_index = index as i64;
                let id = match take_matching(&stored, &mut consumed, direction, spec) {
                    Some(stored_index) => {
                        if stored[stored_index].policy_index != policy_index {
                            index_moved = true;
                        }
                        Some(stored[stored_index].id.clone())
                    }
                    None => {
                        fresh += 1;
                        None
                    }
                };
                replacement.push(NewSgRule {
                    id,
                    direction,
                    policy_index,
                    spec: spec.clone(),
                });
            }
        }
        let removed = consumed.iter().filter(|used| !**used).count() as u64;
        let content_changed = fresh > 0 || removed > 0 || index_moved;

        if stored_version == Some(listed_version) {
            if content_changed {
                return Err(CoreError::StoreInconsistency(format!(
                    "rule set {} changed without a version bump at {listed_version}",
                    scope.cloud_security_group_id
                )));
            }
            // Same generation, same content: nothing to write.
            return Ok(RuleSyncSummary {
                version: listing.version,
                created_ids: Vec::new(),
                kept: stored.len() as u64,
                removed: 0,
            });
        }

        let kept = replacement.iter().filter(|rule| rule.id.is_some()).count() as u64;
        let created_ids = self
            .store()
            .replace_sg_rules(
                kit,
                &scope.security_group_id,
                &scope.cloud_security_group_id,
                &listing.version,
                replacement,
            )
            .await?;

        tracing::info!(
            rid = %kit.rid,
            vendor = %scope.vendor,
            security_group_id = %scope.security_group_id,
            version = %listing.version,
            created = created_ids.len(),
            kept,
            removed,
            "reconciled rule set"
        );
        Ok(RuleSyncSummary {
            version: listing.version,
            created_ids,
            kept,
            removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_must_be_numeric() {
        assert!(parse_rule_version("17").is_ok());
        assert!(matches!(
            parse_rule_version("v17"),
            Err(CoreError::StoreInconsistency(_))
        ));
    }

    #[test]
    fn duplicate_content_consumes_distinct_rows() {
        let spec = SgRuleSpec::allow("tcp", "22", "10.0.0.0/8");
        let rule = |id: &str, index: i64| SgRule {
            id: id.to_string(),
            security_group_id: "sg-int".to_string(),
            cloud_security_group_id: "sg-cloud".to_string(),
            direction: RuleDirection::Ingress,
            policy_index: index,
            version: "3".to_string(),
            spec: spec.clone(),
            revision: skybridge_core::Revision::new("sync"),
        };
        let stored = vec![rule("a", 0), rule("b", 1)];
        let mut consumed = vec![false; stored.len()];

        let first = take_matching(&stored, &mut consumed, RuleDirection::Ingress, &spec);
        let second = take_matching(&stored, &mut consumed, RuleDirection::Ingress, &spec);
        let third = take_matching(&stored, &mut consumed, RuleDirection::Ingress, &spec);
        assert_eq!(first, Some(0));
        assert_eq!(second, Some(1));
        assert_eq!(third, None);
    }
}
