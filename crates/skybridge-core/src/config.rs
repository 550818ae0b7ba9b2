//! Engine configuration
//!
//! Loaded from an optional `skybridge.toml` next to the process, overridden
//! by `SKYBRIDGE_*` environment variables.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum id set accepted by one resolve or reconcile call.
    pub max_id_set: u32,

    /// Page size used when exhausting vendor listings.
    pub vendor_page_size: u32,

    /// Flow lock TTL in seconds; the backstop for crashed holders.
    pub lock_ttl_secs: u64,

    /// Deadline for a single vendor or store call, in seconds.
    pub call_deadline_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_id_set: crate::filter::DEFAULT_MAX_PAGE_LIMIT,
            vendor_page_size: 100,
            lock_ttl_secs: 30,
            call_deadline_secs: 120,
        }
    }
}

impl EngineConfig {
    /// Load configuration, layering `skybridge.toml` (optional) under
    /// `SKYBRIDGE_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("skybridge").required(false))
            .add_source(config::Environment::with_prefix("SKYBRIDGE"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn call_deadline(&self) -> Duration {
        Duration::from_secs(self.call_deadline_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!(config.max_id_set > 0);
        assert!(config.vendor_page_size > 0);
        assert_eq!(config.lock_ttl(), Duration::from_secs(30));
    }
}
