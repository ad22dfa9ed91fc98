//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// SubscriptionId
// ============================================================================

/// Counter for subscription ID generation.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier for a registered event listener.
///
/// Returned by [`EventStream::on`](crate::ws::EventStream::on) and passed
/// back to [`EventStream::off`](crate::ws::EventStream::off) to remove the
/// listener. IDs are unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Generates the next subscription ID.
    #[inline]
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_ids_are_unique() {
        let a = SubscriptionId::next();
        let b = SubscriptionId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_subscription_id_display() {
        let id = SubscriptionId(7);
        assert_eq!(id.to_string(), "sub-7");
    }
}
