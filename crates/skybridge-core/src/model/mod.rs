//! Inventory data model

mod account;
mod lock;
mod resource;
mod rule;

pub use account::Account;
pub use lock::{FlowKind, FlowLockEntry, LockKey, ResFlowRel};
pub use resource::{BIZ_UNASSIGNED, ResourceRecord, Revision};
pub use rule::{RuleAction, RuleDirection, SgRule, SgRuleSpec};
