mod common;

use common::{ACCOUNT, REGION, TestCloud};
use skybridge_cloud::{ListScope, SgRuleDeleteOption, VendorAdapter, VendorResource};
use skybridge_core::{CoreError, ResourceKind, RuleDirection, SgRuleSpec, Vendor};
use skybridge_store::ResourceStore;
use skybridge_sync::RuleSyncScope;
use std::collections::HashSet;

async fn seeded_security_group(cloud: &TestCloud) -> (String, String) {
    cloud
        .seed(
            ResourceKind::SecurityGroup,
            vec![VendorResource::new("sg-cloud-1", "web-sg").with_status("ACTIVE")],
        )
        .await;
    let internal_id = cloud
        .internal_id(ResourceKind::SecurityGroup, "sg-cloud-1")
        .await;
    (internal_id, "sg-cloud-1".to_string())
}

fn rule_scope(cloud: &TestCloud, internal_id: &str, cloud_id: &str) -> RuleSyncScope {
    RuleSyncScope {
        vendor: cloud.vendor,
        account_id: ACCOUNT.to_string(),
        region: REGION.to_string(),
        resource_group: None,
        security_group_id: internal_id.to_string(),
        cloud_security_group_id: cloud_id.to_string(),
    }
}

fn three_rules() -> Vec<SgRuleSpec> {
    vec![
        SgRuleSpec::allow("tcp", "22", "10.0.0.0/8"),
        SgRuleSpec::allow("tcp", "80", "0.0.0.0/0"),
        SgRuleSpec::allow("tcp", "443", "0.0.0.0/0"),
    ]
}

#[tokio::test]
async fn initial_rule_sync_records_the_whole_ordered_set() {
    let cloud = TestCloud::new(Vendor::TCloud);
    let (internal_id, cloud_id) = seeded_security_group(&cloud).await;
    cloud.adapter.set_rules(&cloud_id, 5, vec![], three_rules());

    let summary = cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &rule_scope(&cloud, &internal_id, &cloud_id))
        .await
        .unwrap();

    assert_eq!(summary.created_ids.len(), 3);
    assert_eq!(summary.version, "5");

    let stored = cloud
        .store
        .list_sg_rules(&TestCloud::kit(), &internal_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 3);
    let indices: Vec<i64> = stored.iter().map(|rule| rule.policy_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn deleting_a_rule_shifts_every_later_index_down() {
    let cloud = TestCloud::new(Vendor::TCloud);
    let (internal_id, cloud_id) = seeded_security_group(&cloud).await;
    cloud.adapter.set_rules(&cloud_id, 5, vec![], three_rules());
    let scope = rule_scope(&cloud, &internal_id, &cloud_id);
    cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &scope)
        .await
        .unwrap();
    let before = cloud
        .store
        .list_sg_rules(&TestCloud::kit(), &internal_id)
        .await
        .unwrap();
    let id_at_2 = before
        .iter()
        .find(|rule| rule.policy_index == 2)
        .unwrap()
        .id
        .clone();

    // Vendor-side delete of the middle rule (index 1).
    cloud
        .adapter
        .delete_sg_rules(
            &TestCloud::kit(),
            &ListScope::new(ACCOUNT, REGION),
            &SgRuleDeleteOption {
                cloud_security_group_id: cloud_id.clone(),
                version: "5".to_string(),
                direction: RuleDirection::Ingress,
                policy_indexes: vec![1],
            },
        )
        .await
        .unwrap();

    let summary = cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &scope)
        .await
        .unwrap();
    assert_eq!(summary.removed, 1);
    assert!(summary.created_ids.is_empty());

    let after = cloud
        .store
        .list_sg_rules(&TestCloud::kit(), &internal_id)
        .await
        .unwrap();
    assert_eq!(after.len(), 2);

    let indices: HashSet<i64> = after.iter().map(|rule| rule.policy_index).collect();
    assert_eq!(indices.len(), after.len(), "no two rules may share an index");
    assert_eq!(indices, HashSet::from([0, 1]));

    // The rule formerly at index 2 kept its internal id and moved to 1.
    let shifted = after.iter().find(|rule| rule.id == id_at_2).unwrap();
    assert_eq!(shifted.policy_index, 1);
}

#[tokio::test]
async fn rule_resync_is_idempotent() {
    let cloud = TestCloud::new(Vendor::TCloud);
    let (internal_id, cloud_id) = seeded_security_group(&cloud).await;
    cloud.adapter.set_rules(&cloud_id, 3, vec![], three_rules());
    let scope = rule_scope(&cloud, &internal_id, &cloud_id);

    cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &scope)
        .await
        .unwrap();
    let summary = cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &scope)
        .await
        .unwrap();

    assert!(summary.created_ids.is_empty());
    assert_eq!(summary.removed, 0);
    assert_eq!(summary.kept, 3);
}

#[tokio::test]
async fn version_regression_is_a_store_inconsistency() {
    let cloud = TestCloud::new(Vendor::TCloud);
    let (internal_id, cloud_id) = seeded_security_group(&cloud).await;
    cloud.adapter.set_rules(&cloud_id, 7, vec![], three_rules());
    let scope = rule_scope(&cloud, &internal_id, &cloud_id);
    cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &scope)
        .await
        .unwrap();

    // A listing older than what the store has seen: concurrent external
    // mutation outside the lock protocol.
    cloud.adapter.set_rules(&cloud_id, 6, vec![], three_rules());
    let err = cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &scope)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StoreInconsistency(_)));

    let stored = cloud
        .store
        .list_sg_rules(&TestCloud::kit(), &internal_id)
        .await
        .unwrap();
    assert!(
        stored.iter().all(|rule| rule.version == "7"),
        "a failed pass must leave the stored generation untouched"
    );
}

#[tokio::test]
async fn same_version_with_different_content_is_a_store_inconsistency() {
    let cloud = TestCloud::new(Vendor::TCloud);
    let (internal_id, cloud_id) = seeded_security_group(&cloud).await;
    cloud.adapter.set_rules(&cloud_id, 4, vec![], three_rules());
    let scope = rule_scope(&cloud, &internal_id, &cloud_id);
    cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &scope)
        .await
        .unwrap();

    cloud.adapter.set_rules(
        &cloud_id,
        4,
        vec![],
        vec![SgRuleSpec::allow("udp", "53", "0.0.0.0/0")],
    );
    let err = cloud
        .engine
        .reconciler()
        .reconcile_sg_rules(&TestCloud::kit(), &scope)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StoreInconsistency(_)));
}
