//! Store-backed flow lock
//!
//! A named, resource-scoped mutual exclusion primitive: one unexpired row
//! per (resource scope, flow kind), acquired by atomic conditional insert
//! against the shared store. The TTL is the backstop for crashed holders;
//! explicit release keeps the hot path lock-free for the next caller.

use skybridge_core::{CoreError, FlowLockEntry, Kit, LockKey, Result};
use skybridge_store::{LockDelete, LockInsert, LockStore};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct FlowLock {
    locks: Arc<dyn LockStore>,
}

impl FlowLock {
    pub fn new(locks: Arc<dyn LockStore>) -> Self {
        Self { locks }
    }

    /// Acquire the lock for the key.
    ///
    /// Fails with [`CoreError::LockConflict`] while an unexpired entry
    /// exists, regardless of owner. A conflict means "try later", not
    /// "you are next": waiters are not ordered.
    pub async fn acquire(
        &self,
        kit: &Kit,
        key: &LockKey,
        owner: &str,
        ttl: Duration,
    ) -> Result<()> {
        let entry = FlowLockEntry::new(key.clone(), owner, ttl);
        match self.locks.try_insert_lock(kit, entry).await? {
            LockInsert::Acquired => {
                tracing::debug!(rid = %kit.rid, key = %key, "flow lock acquired");
                Ok(())
            }
            LockInsert::Held(holder) => {
                tracing::debug!(
                    rid = %kit.rid,
                    key = %key,
                    holder = %holder.owner,
                    "flow lock conflict"
                );
                Err(CoreError::LockConflict {
                    key: key.to_string(),
                    holder: holder.owner,
                })
            }
        }
    }

    /// Release the lock if `owner` holds it.
    ///
    /// An already-absent entry is success: the holder's TTL expired and
    /// the net effect (lock gone) is achieved. A release against a
    /// different holder fails with [`CoreError::NotOwner`] and leaves
    /// that holder's lock in place.
    pub async fn release(&self, kit: &Kit, key: &LockKey, owner: &str) -> Result<()> {
        match self.locks.delete_lock(kit, key, owner).await? {
            LockDelete::Deleted => {
                tracing::debug!(rid = %kit.rid, key = %key, "flow lock released");
                Ok(())
            }
            LockDelete::Absent => {
                tracing::warn!(
                    rid = %kit.rid,
                    key = %key,
                    "flow lock already absent on release, likely ttl expiry"
                );
                Ok(())
            }
            LockDelete::NotOwner(holder) => {
                tracing::error!(
                    rid = %kit.rid,
                    key = %key,
                    holder = %holder.owner,
                    "flow lock release attempted by non-holder"
                );
                Err(CoreError::NotOwner {
                    key: key.to_string(),
                })
            }
        }
    }
}
