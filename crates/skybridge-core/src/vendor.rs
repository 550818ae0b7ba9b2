//! Vendor and resource-kind tags

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Supported cloud vendors.
///
/// The engine is vendor-agnostic; this tag exists only to select the
/// matching adapter at the dispatch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    TCloud,
    Aws,
    Azure,
    HuaWei,
    Gcp,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::TCloud => "tcloud",
            Vendor::Aws => "aws",
            Vendor::Azure => "azure",
            Vendor::HuaWei => "huawei",
            Vendor::Gcp => "gcp",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Vendor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcloud" => Ok(Vendor::TCloud),
            "aws" => Ok(Vendor::Aws),
            "azure" => Ok(Vendor::Azure),
            "huawei" => Ok(Vendor::HuaWei),
            "gcp" => Ok(Vendor::Gcp),
            other => Err(CoreError::InvalidInput(format!("unknown vendor: {other}"))),
        }
    }
}

/// Resource kinds tracked by the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    Cvm,
    Disk,
    SecurityGroup,
    LoadBalancer,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Cvm => "cvm",
            ResourceKind::Disk => "disk",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::LoadBalancer => "load_balancer",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_round_trip() {
        for vendor in [
            Vendor::TCloud,
            Vendor::Aws,
            Vendor::Azure,
            Vendor::HuaWei,
            Vendor::Gcp,
        ] {
            let parsed: Vendor = vendor.as_str().parse().unwrap();
            assert_eq!(parsed, vendor);
        }
    }

    #[test]
    fn unknown_vendor_is_rejected() {
        assert!("alibaba".parse::<Vendor>().is_err());
    }

    #[test]
    fn vendor_serde_uses_lowercase() {
        assert_eq!(
            serde_json::to_string(&Vendor::HuaWei).unwrap(),
            "\"huawei\""
        );
    }
}
