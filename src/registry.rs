//! Live inventory of in-flight action executions.
//!
//! Every invocation — including concurrent invocations of the same action on
//! the same board — registers under a distinct [`ExecutionId`], so entries
//! stay independently addressable for cancellation. The registry is a
//! concurrent map with per-key sharding; listing one board never blocks
//! executions on another.
//!
//! Cancellation is advisory: [`ExecutionRegistry::request_cancel`] flips a
//! flag that rule code observes at its next cooperative checkpoint. The
//! dispatcher removes the entry as soon as the cancellation is acknowledged,
//! even if the underlying runtime is still unwinding.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::types::{BoardId, ContextId, ExecutionId};
use crate::utils::id_generator::IdGenerator;

/// Registry entry for one running invocation.
///
/// The registry owns the record; other components read it through the
/// shared `Arc`. Only the dispatcher (via [`RegistrationGuard`]) removes it.
#[derive(Debug)]
pub struct ExecutionRecord {
    pub execution_id: ExecutionId,
    pub board: BoardId,
    pub action: String,
    pub context_id: ContextId,
    pub started_at: DateTime<Utc>,
    cancel_requested: AtomicBool,
}

impl ExecutionRecord {
    /// Whether cancellation has been requested for this invocation.
    ///
    /// Rule code polls this at cooperative checkpoints.
    #[must_use]
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            execution_id: self.execution_id.clone(),
            board: self.board.clone(),
            action: self.action.clone(),
            context_id: self.context_id.clone(),
            started_at: self.started_at,
            cancel_requested: self.cancel_requested(),
        }
    }
}

/// Point-in-time view of a registry entry, safe to hand across the HTTP
/// boundary.
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: ExecutionId,
    pub board: BoardId,
    pub action: String,
    pub context_id: ContextId,
    pub started_at: DateTime<Utc>,
    pub cancel_requested: bool,
}

/// Result of a cancellation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The flag was set; the runtime will observe it at its next checkpoint.
    Accepted,
    /// No such execution; nothing was changed.
    NotFound,
}

/// Concurrent map of in-flight executions keyed by [`ExecutionId`].
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone, Default)]
pub struct ExecutionRegistry {
    entries: Arc<DashMap<ExecutionId, Arc<ExecutionRecord>>>,
    ids: IdGenerator,
}

impl ExecutionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new invocation and return the guard that unregisters it.
    ///
    /// Dropping the guard removes the entry, so every exit path out of the
    /// dispatcher — success, runtime error, cancellation — cleans up.
    #[must_use]
    pub fn register(
        &self,
        board: BoardId,
        action: impl Into<String>,
        context_id: ContextId,
    ) -> RegistrationGuard {
        let record = Arc::new(ExecutionRecord {
            execution_id: self.ids.generate_execution_id(),
            board,
            action: action.into(),
            context_id,
            started_at: Utc::now(),
            cancel_requested: AtomicBool::new(false),
        });
        self.entries
            .insert(record.execution_id.clone(), record.clone());
        debug!(
            execution = %record.execution_id,
            board = %record.board,
            action = %record.action,
            "execution registered"
        );
        RegistrationGuard {
            registry: self.clone(),
            record,
        }
    }

    /// Remove an entry. Idempotent; removing an unknown id is a no-op.
    pub fn unregister(&self, execution_id: &ExecutionId) {
        if self.entries.remove(execution_id).is_some() {
            debug!(execution = %execution_id, "execution unregistered");
        }
    }

    /// Entries currently running on a board.
    ///
    /// Reflects concurrent registration and removal without duplicates; the
    /// result is a point-in-time listing, not a live view.
    #[must_use]
    pub fn list(&self, board: &BoardId) -> Vec<ExecutionSummary> {
        self.entries
            .iter()
            .filter(|entry| &entry.value().board == board)
            .map(|entry| entry.value().summary())
            .collect()
    }

    /// Shared handle to a running record, if present.
    #[must_use]
    pub fn get(&self, execution_id: &ExecutionId) -> Option<Arc<ExecutionRecord>> {
        self.entries.get(execution_id).map(|e| e.value().clone())
    }

    /// Set the advisory cancellation flag for one invocation.
    pub fn request_cancel(&self, execution_id: &ExecutionId) -> CancelOutcome {
        match self.entries.get(execution_id) {
            Some(entry) => {
                entry.value().request_cancel();
                debug!(execution = %execution_id, "cancellation requested");
                CancelOutcome::Accepted
            }
            None => CancelOutcome::NotFound,
        }
    }

    /// Number of in-flight executions across all boards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Removes its registry entry when dropped.
pub struct RegistrationGuard {
    registry: ExecutionRegistry,
    record: Arc<ExecutionRecord>,
}

impl RegistrationGuard {
    #[must_use]
    pub fn record(&self) -> &Arc<ExecutionRecord> {
        &self.record
    }

    #[must_use]
    pub fn execution_id(&self) -> &ExecutionId {
        &self.record.execution_id
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.record.execution_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(name: &str) -> BoardId {
        BoardId::new(name).unwrap()
    }

    fn ctx_id() -> ContextId {
        IdGenerator::new().generate_context_id()
    }

    #[test]
    fn identical_invocations_get_distinct_ids() {
        let registry = ExecutionRegistry::new();
        let a = registry.register(board("b"), "act", ctx_id());
        let b = registry.register(board("b"), "act", ctx_id());
        assert_ne!(a.execution_id(), b.execution_id());
        assert_eq!(registry.list(&board("b")).len(), 2);
    }

    #[test]
    fn guard_drop_unregisters() {
        let registry = ExecutionRegistry::new();
        let guard = registry.register(board("b"), "act", ctx_id());
        let id = guard.execution_id().clone();
        assert!(registry.get(&id).is_some());
        drop(guard);
        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn cancel_targets_exactly_one_entry() {
        let registry = ExecutionRegistry::new();
        let a = registry.register(board("b"), "act", ctx_id());
        let b = registry.register(board("b"), "act", ctx_id());

        assert_eq!(
            registry.request_cancel(a.execution_id()),
            CancelOutcome::Accepted
        );
        assert!(a.record().cancel_requested());
        assert!(!b.record().cancel_requested());
    }

    #[test]
    fn cancel_unknown_id_is_not_found() {
        let registry = ExecutionRegistry::new();
        let ghost = ExecutionId("exec_missing".into());
        assert_eq!(registry.request_cancel(&ghost), CancelOutcome::NotFound);
        assert!(registry.is_empty());
    }

    #[test]
    fn list_is_scoped_to_board() {
        let registry = ExecutionRegistry::new();
        let _a = registry.register(board("left"), "act", ctx_id());
        let _b = registry.register(board("right"), "act", ctx_id());
        assert_eq!(registry.list(&board("left")).len(), 1);
        assert_eq!(registry.list(&board("right")).len(), 1);
    }
}
