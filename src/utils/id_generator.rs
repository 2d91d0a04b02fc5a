//! Prefixed unique identifiers for runtime objects.
//!
//! Contexts and executions each get a uuid-v4 id with a short prefix so log
//! lines and registry listings are self-describing (`ctx_…` vs `exec_…`).

use uuid::Uuid;

use crate::types::{ContextId, ExecutionId};

/// Generates runtime identifiers.
///
/// Stateless; exists as a type so callers can hold one and tests can swap
/// construction sites in a single place.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Id for a top-level invocation chain.
    #[must_use]
    pub fn generate_context_id(&self) -> ContextId {
        ContextId(format!("ctx_{}", Uuid::new_v4().simple()))
    }

    /// Id for a single action invocation. Distinct for every invocation,
    /// including concurrent calls of the same action on the same board.
    #[must_use]
    pub fn generate_execution_id(&self) -> ExecutionId {
        ExecutionId(format!("exec_{}", Uuid::new_v4().simple()))
    }
}
