//! Extension payload merge
//!
//! Resource records carry a vendor-specific extension payload as an opaque
//! JSON object. Reconciliation merges the newly observed payload into the
//! stored one instead of replacing it, so fields a given vendor call does
//! not report survive the update.

use serde_json::Value;

/// Merge `patch` into `base`.
///
/// Object fields are merged recursively, scalars and arrays in the patch
/// overwrite, and an explicit null removes the field.
pub fn merge_extension(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                if value.is_null() {
                    base_map.remove(key);
                } else if let Some(existing) = base_map.get_mut(key) {
                    merge_extension(existing, value);
                } else {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unreported_fields_survive() {
        let mut base = json!({"self_link": "https://gcp/vpc-1", "mtu": 1460});
        merge_extension(&mut base, &json!({"mtu": 1500}));
        assert_eq!(base, json!({"self_link": "https://gcp/vpc-1", "mtu": 1500}));
    }

    #[test]
    fn nested_objects_merge() {
        let mut base = json!({"nic": {"primary": "eth0", "count": 1}});
        merge_extension(&mut base, &json!({"nic": {"count": 2}}));
        assert_eq!(base, json!({"nic": {"primary": "eth0", "count": 2}}));
    }

    #[test]
    fn null_removes_field() {
        let mut base = json!({"ipv6": "fd00::1", "mtu": 1460});
        merge_extension(&mut base, &json!({"ipv6": null}));
        assert_eq!(base, json!({"mtu": 1460}));
    }

    #[test]
    fn scalar_base_is_replaced() {
        let mut base = json!(null);
        merge_extension(&mut base, &json!({"zone": "ap-guangzhou-3"}));
        assert_eq!(base, json!({"zone": "ap-guangzhou-3"}));
    }
}
