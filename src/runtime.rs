//! The Action Runtime boundary.
//!
//! The execution core never parses or interprets rule code. Everything about
//! running a card's `code` text lives behind [`ActionRuntime`]; the
//! dispatcher hands the runtime an [`ActionApi`] bound to the invocation's
//! board, context, and cancellation flag, and takes back a value or an
//! error. Sandboxing and interpretation technology are entirely the
//! implementor's concern.

use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::context::ExecutionContext;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::store::StoreError;
use crate::types::{BoardId, ContextId, ExecutionId};

/// Executes opaque rule code against a bound API surface.
///
/// Implementations may suspend at any await point; nested
/// [`ActionApi::execute_action`] calls re-enter the dispatcher on the same
/// context. A cooperative implementation checks
/// [`ActionApi::cancel_requested`] at its checkpoints and returns
/// [`RuntimeError::Cancelled`] to acknowledge.
#[async_trait]
pub trait ActionRuntime: Send + Sync {
    async fn execute(
        &self,
        code: &str,
        api: ActionApi,
        params: Value,
    ) -> Result<Value, RuntimeError>;
}

/// Errors surfaced by rule-code execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    /// Rule code threw. Propagates to the dispatcher's caller; the
    /// execution's registry entry is still removed.
    #[error("rule code failed: {0}")]
    #[diagnostic(code(boardflow::runtime::failed))]
    Failed(String),

    /// The runtime acknowledged a cancellation request.
    #[error("execution cancelled")]
    #[diagnostic(code(boardflow::runtime::cancelled))]
    Cancelled,

    #[error(transparent)]
    #[diagnostic(code(boardflow::runtime::store))]
    Store(#[from] StoreError),

    /// A nested dispatch failed and the rule code chose to propagate it.
    #[error(transparent)]
    #[diagnostic(code(boardflow::runtime::dispatch))]
    Dispatch(#[from] Box<DispatchError>),

    #[error(transparent)]
    #[diagnostic(code(boardflow::runtime::serde))]
    Serde(#[from] serde_json::Error),
}

impl From<DispatchError> for RuntimeError {
    fn from(err: DispatchError) -> Self {
        RuntimeError::Dispatch(Box::new(err))
    }
}

/// API surface bound to one invocation, handed to the Action Runtime.
///
/// Variable access is scoped through the Execution Context Manager (the
/// chain's overlay layers over board state); `execute_action` recurses into
/// the dispatcher with the *same* context, so chained calls share ephemeral
/// state and recursion tracking.
#[derive(Clone)]
pub struct ActionApi {
    dispatcher: Dispatcher,
    ctx: ExecutionContext,
    action: String,
    execution_id: ExecutionId,
}

impl ActionApi {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        ctx: ExecutionContext,
        action: String,
        execution_id: ExecutionId,
    ) -> Self {
        Self {
            dispatcher,
            ctx,
            action,
            execution_id,
        }
    }

    #[must_use]
    pub fn board(&self) -> &BoardId {
        self.ctx.board()
    }

    /// Name of the action this invocation is running.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    #[must_use]
    pub fn context_id(&self) -> &ContextId {
        self.ctx.context_id()
    }

    /// Read a board variable through the chain's state path.
    pub async fn read_var(&self, name: &str) -> Result<Option<Value>, StoreError> {
        self.dispatcher.contexts().read_var(&self.ctx, name).await
    }

    /// Write a board variable through the chain's state path. Ephemeral
    /// cards write to the chain overlay only; non-ephemeral writes commit
    /// synchronously.
    pub async fn write_var(&self, name: &str, value: Value) -> Result<(), StoreError> {
        self.dispatcher
            .contexts()
            .write_var(&self.ctx, name, value)
            .await
    }

    /// Invoke another action within the same chain.
    ///
    /// Recursing into an action already in flight in this chain returns
    /// [`DispatchError::RecursionBlocked`] as an ordinary error value —
    /// rule code may catch and handle it; it never aborts the chain on its
    /// own.
    pub async fn execute_action(
        &self,
        action: &str,
        params: Value,
    ) -> Result<Value, DispatchError> {
        self.dispatcher
            .dispatch_chained(&self.ctx, action, params)
            .await
    }

    /// Whether cancellation has been requested for this invocation.
    ///
    /// Cooperative: the core never interrupts rule code on its own.
    #[must_use]
    pub fn cancel_requested(&self) -> bool {
        self.dispatcher
            .registry()
            .get(&self.execution_id)
            .is_some_and(|record| record.cancel_requested())
    }

    /// Checkpoint helper: error with [`RuntimeError::Cancelled`] when a
    /// cancellation request is pending.
    pub fn check_cancelled(&self) -> Result<(), RuntimeError> {
        if self.cancel_requested() {
            Err(RuntimeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
