//! Skybridge reconciliation and flow-locking engine
//!
//! The engine keeps the internal inventory converged with vendor-reported
//! truth and serializes remote-mutate-then-resync workflows across service
//! instances:
//!
//! - [`Resolver`] maps vendor cloud identifiers to internal records,
//!   triggering a single synchronization pass for the missing subset.
//! - [`Reconciler`] diffs vendor-side truth against the store and commits
//!   the minimal create/update/delete set in one transaction, including the
//!   positional-index rule sets of security groups.
//! - [`FlowLock`] is a store-backed, TTL'd mutual exclusion primitive; the
//!   flows on [`SyncEngine`] run every remote mutation under it and always
//!   resync before releasing.
//!
//! Coordination across instances happens only through the shared store;
//! there is no in-process coordinator.

mod call;
pub mod engine;
pub mod flow;
pub mod flow_lock;
pub mod reconciler;
pub mod resolver;
pub mod rules;

// Re-exports
pub use engine::SyncEngine;
pub use flow::{InstanceOpReq, SgRuleDeleteReq, SgRuleUpdateReq, SgRulesCreateReq};
pub use flow_lock::FlowLock;
pub use reconciler::{Reconciler, SyncScope, SyncSummary};
pub use resolver::{ResolveOption, ResolvedRef, Resolver, SelfLinkResolveOption};
pub use rules::{RuleSyncScope, RuleSyncSummary};
