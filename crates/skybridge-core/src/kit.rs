//! Request kit
//!
//! Execution context threaded through every store and vendor call. Carries
//! the request id propagated into every log line, the acting user stamped
//! into revision metadata, and the call deadline.

use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Kit {
    /// Request/trace identifier.
    pub rid: String,

    /// Acting user, stamped as creator/reviser on written records.
    pub user: String,

    /// Absolute deadline for I/O issued under this kit.
    pub deadline: Option<Instant>,
}

impl Kit {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            rid: Uuid::new_v4().to_string(),
            user: user.into(),
            deadline: None,
        }
    }

    /// Use an externally assigned request id (e.g. from an inbound header).
    pub fn with_rid(mut self, rid: impl Into<String>) -> Self {
        self.rid = rid.into();
        self
    }

    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Time left before the deadline. `None` means unbounded; a zero
    /// duration means the deadline has already passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_kit_is_unbounded() {
        let kit = Kit::new("admin");
        assert!(kit.remaining().is_none());
        assert!(!kit.rid.is_empty());
    }

    #[test]
    fn elapsed_deadline_reports_zero() {
        let kit = Kit::new("admin").with_deadline(Duration::ZERO);
        assert_eq!(kit.remaining(), Some(Duration::ZERO));
    }
}
