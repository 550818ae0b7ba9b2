//! Skybridge core types
//!
//! Shared vocabulary for the Skybridge inventory engine: the vendor tag,
//! the request kit threaded through every call, the error taxonomy, the
//! store query primitives and the inventory data model.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               skybridge-sync                 │
//! │   Resolver / Reconciler / FlowLock engine    │
//! └──────┬──────────────────────┬────────────────┘
//!        │                      │
//! ┌──────▼────────┐    ┌────────▼───────┐
//! │ skybridge-    │    │ skybridge-     │
//! │ store         │    │ cloud          │
//! │ (inventory)   │    │ (vendor APIs)  │
//! └──────┬────────┘    └────────┬───────┘
//!        │                      │
//! ┌──────▼──────────────────────▼───────────────┐
//! │              skybridge-core                 │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod extension;
pub mod filter;
pub mod kit;
pub mod model;
pub mod vendor;

// Re-exports
pub use config::EngineConfig;
pub use error::{CoreError, Result};
pub use extension::merge_extension;
pub use filter::{DEFAULT_MAX_PAGE_LIMIT, FieldSource, Filter, Page};
pub use kit::Kit;
pub use model::{
    Account, BIZ_UNASSIGNED, FlowKind, FlowLockEntry, LockKey, ResFlowRel, ResourceRecord,
    Revision, RuleAction, RuleDirection, SgRule, SgRuleSpec,
};
pub use vendor::{ResourceKind, Vendor};
