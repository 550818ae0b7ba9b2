//! Skybridge vendor adapter abstraction
//!
//! One [`VendorAdapter`] implementation per cloud vendor, each returning
//! already-normalized results; the engine never branches on vendor-specific
//! response shapes beyond selecting the variant through the
//! [`AdapterRegistry`]. Long-running vendor operations are exposed as a
//! single blocking call; any provider-side poll-until-done loop lives in
//! the adapter.

pub mod adapter;
pub mod registry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use adapter::VendorAdapter;
pub use registry::AdapterRegistry;
pub use types::{
    InstanceOp, ListScope, ResourceCreateOption, ResourceUpdateOption, SgRuleCreateOption,
    SgRuleDeleteOption, SgRuleListing, SgRuleUpdateOption, VendorPage, VendorPageResult,
    VendorResource,
};

#[cfg(any(test, feature = "test-utils"))]
pub use fake::FakeAdapter;
