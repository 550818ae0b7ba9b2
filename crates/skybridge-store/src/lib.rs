//! Skybridge inventory store contract
//!
//! The shared store is an external collaborator: a transactional, filtered
//! CRUD surface over the inventory tables plus the lock rows the flow lock
//! is built on. The engine only ever talks to the [`ResourceStore`] and
//! [`LockStore`] traits; a SQL-backed implementation lives outside this
//! repository. The in-memory reference store (feature `test-utils`) backs
//! the engine test-suites.

pub mod diff;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod mem;

pub use diff::{AppliedSet, DiffSet, NewRecord, NewSgRule, RecordUpdate};
pub use store::{LockDelete, LockInsert, LockStore, ResourceStore};

#[cfg(any(test, feature = "test-utils"))]
pub use mem::MemStore;
