//! Engine error taxonomy

use crate::vendor::Vendor;
use thiserror::Error;

/// Errors surfaced by the inventory engine and its collaborators.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or oversized request, rejected before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A requested record does not exist in the store.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// A vendor call failed or timed out; safe to retry the whole operation.
    #[error("vendor {vendor} unavailable during {operation}: {reason}")]
    VendorUnavailable {
        vendor: Vendor,
        operation: String,
        reason: String,
    },

    /// After one reconciliation attempt some requested identifiers remain
    /// unresolved. Carries the still-missing identifiers; not retried
    /// automatically.
    #[error("partial sync failure, unresolved ids: {missing:?}")]
    PartialSyncFailure { missing: Vec<String> },

    /// Another flow holds the scope lock.
    #[error("flow lock conflict on {key}, held by {holder}")]
    LockConflict { key: String, holder: String },

    /// Lock release attempted by a non-holder.
    #[error("lock {key} is held by another owner")]
    NotOwner { key: String },

    /// An index-based sub-resource listing does not correspond to any known
    /// generation. Fatal for the reconciliation pass; never auto-corrected.
    #[error("store inconsistency: {0}")]
    StoreInconsistency(String),

    /// No adapter registered for the vendor tag.
    #[error("no adapter registered for vendor {0}")]
    AdapterNotFound(Vendor),

    /// Store collaborator failure.
    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether retrying the whole operation is safe and potentially useful.
    ///
    /// Reconciliation recomputes from scratch, so transient vendor and store
    /// failures are retryable. Input errors, loss signals and lock conflicts
    /// are surfaced for the caller to decide.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::VendorUnavailable { .. } | CoreError::Store(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let err = CoreError::VendorUnavailable {
            vendor: Vendor::Aws,
            operation: "list".to_string(),
            reason: "throttled".to_string(),
        };
        assert!(err.is_retryable());

        let err = CoreError::PartialSyncFailure {
            missing: vec!["vpc-1".to_string()],
        };
        assert!(!err.is_retryable());

        assert!(!CoreError::InvalidInput("empty".to_string()).is_retryable());
    }
}
