//! Resource records

use crate::filter::FieldSource;
use crate::vendor::{ResourceKind, Vendor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Business-unit tag value for records not yet assigned to a unit.
pub const BIZ_UNASSIGNED: i64 = -1;

/// Creator/reviser metadata stamped on every written record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub creator: String,
    pub reviser: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Revision {
    pub fn new(creator: impl Into<String>) -> Self {
        let creator = creator.into();
        let now = Utc::now();
        Self {
            reviser: creator.clone(),
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, reviser: impl Into<String>) {
        self.reviser = reviser.into();
        self.updated_at = Utc::now();
    }
}

/// One internal inventory record mirroring a vendor-side resource.
///
/// The internal id is store-assigned, stable and never reused; it is the
/// only identifier safe for cross-system joins. The cloud id is assigned
/// by the vendor and unique within (vendor, account, region).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub kind: ResourceKind,
    pub vendor: Vendor,
    pub account_id: String,
    pub region: String,

    /// Vendor-assigned identifier; absent before the first sync observes
    /// the resource.
    pub cloud_id: Option<String>,

    pub name: String,
    pub status: String,

    /// Business-unit tag; [`BIZ_UNASSIGNED`] until assigned.
    pub biz_id: i64,

    /// Vendor-specific payload, merged on update and never replaced
    /// wholesale.
    pub extension: Value,

    pub revision: Revision,
}

impl ResourceRecord {
    /// The self link inside the extension payload, for vendors keyed by
    /// self link instead of cloud id.
    pub fn self_link(&self) -> Option<&str> {
        self.extension.get("self_link").and_then(Value::as_str)
    }
}

impl FieldSource for ResourceRecord {
    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::String(self.id.clone())),
            "kind" => serde_json::to_value(self.kind).ok(),
            "vendor" => serde_json::to_value(self.vendor).ok(),
            "account_id" => Some(Value::String(self.account_id.clone())),
            "region" => Some(Value::String(self.region.clone())),
            "cloud_id" => self.cloud_id.clone().map(Value::String),
            "name" => Some(Value::String(self.name.clone())),
            "status" => Some(Value::String(self.status.clone())),
            "biz_id" => Some(Value::from(self.biz_id)),
            _ => {
                let path = field.strip_prefix("extension.")?;
                let pointer = format!("/{}", path.replace('.', "/"));
                self.extension.pointer(&pointer).cloned()
            }
        }
    }
}
