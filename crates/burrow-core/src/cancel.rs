//! Cooperative cancellation keyed by operation ID.

use std::sync::Arc;

use dashmap::DashSet;

use crate::error::{EngineError, EngineResult};

/// Set of operation IDs that have been marked cancelled.
///
/// Cancellation is level-triggered: a mark set before a task starts is still
/// observed by that task. Marks persist until [`clear`](Self::clear) is called.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    cancelled: DashSet<String>,
}

impl CancellationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            cancelled: DashSet::new(),
        }
    }

    /// Mark an operation cancelled. Idempotent.
    pub fn cancel(&self, operation_id: &str) {
        if !self.cancelled.contains(operation_id) {
            self.cancelled.insert(operation_id.to_string());
        }
    }

    /// Check whether an operation has been cancelled.
    pub fn is_cancelled(&self, operation_id: &str) -> bool {
        self.cancelled.contains(operation_id)
    }

    /// Remove the mark for an operation.
    pub fn clear(&self, operation_id: &str) {
        self.cancelled.remove(operation_id);
    }

    /// Number of operations currently marked.
    pub fn len(&self) -> usize {
        self.cancelled.len()
    }

    /// Check if no operations are marked.
    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty()
    }
}

/// A registry paired with the ID of the operation a task belongs to.
///
/// Tasks without an operation ID can never be cancelled.
#[derive(Debug, Clone)]
pub struct Operation {
    registry: Arc<CancellationRegistry>,
    id: Option<Arc<str>>,
}

impl Operation {
    /// Bind an operation ID to a registry.
    pub fn new(registry: Arc<CancellationRegistry>, id: Option<&str>) -> Self {
        Self {
            registry,
            id: id.map(Arc::from),
        }
    }

    /// An operation that is not tracked by any shared registry.
    pub fn detached() -> Self {
        Self {
            registry: Arc::new(CancellationRegistry::new()),
            id: None,
        }
    }

    /// The operation ID, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether this operation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.id
            .as_deref()
            .is_some_and(|id| self.registry.is_cancelled(id))
    }

    /// Return [`EngineError::Cancelled`] if the operation was cancelled.
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Release this operation's registry slot.
    pub fn clear(&self) {
        if let Some(id) = self.id.as_deref() {
            self.registry.clear(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let registry = CancellationRegistry::new();
        registry.cancel("op-1");
        registry.cancel("op-1");

        assert!(registry.is_cancelled("op-1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cancel_stays_until_cleared() {
        let registry = CancellationRegistry::new();
        assert!(!registry.is_cancelled("op-1"));

        registry.cancel("op-1");
        for _ in 0..3 {
            assert!(registry.is_cancelled("op-1"));
        }

        registry.clear("op-1");
        assert!(!registry.is_cancelled("op-1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_operation_check() {
        let registry = Arc::new(CancellationRegistry::new());
        let op = Operation::new(Arc::clone(&registry), Some("scan"));
        let other = Operation::new(Arc::clone(&registry), Some("other"));

        assert!(op.check().is_ok());
        registry.cancel("scan");
        assert!(matches!(op.check(), Err(EngineError::Cancelled)));
        assert!(other.check().is_ok());

        op.clear();
        assert!(op.check().is_ok());
    }

    #[test]
    fn test_operation_without_id_never_cancels() {
        let op = Operation::detached();
        assert!(op.id().is_none());
        assert!(op.check().is_ok());
    }
}
