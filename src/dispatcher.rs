//! The Action Dispatcher: orchestrates every action invocation.
//!
//! One dispatch moves through a fixed sequence: resolve the board and action
//! card, obtain or reuse an execution context, pass the recursion gate,
//! register with the execution registry, run the Action Runtime, then commit
//! or discard state and unregister. Registry cleanup and recursion-gate exit
//! ride on RAII guards, so no exit path — success, rule-code error, or
//! cancellation — leaks an entry.
//!
//! Nested `execute_action` calls made by rule code re-enter
//! [`dispatch_chained`](Dispatcher::dispatch_chained) with the same context,
//! which is how chains share ephemeral state and recursion tracking. There
//! is no global serialization: chains on the same or different boards run
//! genuinely in parallel, limited only by the per-board write lock on
//! individual state commits.

use std::sync::Arc;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::board::Card;
use crate::context::{ContextManager, ExecutionContext};
use crate::event_bus::{Event, ExecutionPhase};
use crate::registry::{CancelOutcome, ExecutionRegistry, ExecutionSummary};
use crate::runtime::{ActionApi, ActionRuntime, RuntimeError};
use crate::store::{BoardStore, StoreError};
use crate::types::{BoardId, ExecutionId, StateMode};

/// Errors surfaced by a dispatch.
///
/// `RecursionBlocked` is deliberately an ordinary, catchable value: nested
/// rule code receives it from `execute_action` and may handle it; it never
/// aborts sibling chains or the surrounding process.
#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    #[error("board not found: {board}")]
    #[diagnostic(code(boardflow::dispatcher::board_not_found))]
    BoardNotFound { board: String },

    #[error("action not found on board {board}: {action}")]
    #[diagnostic(code(boardflow::dispatcher::action_not_found))]
    ActionNotFound { board: String, action: String },

    /// The same action is already in flight within this chain.
    #[error("recursion blocked: {action} is already running in this chain")]
    #[diagnostic(
        code(boardflow::dispatcher::recursion_blocked),
        help("A chain may not re-enter an action it is still executing; independent chains are unaffected.")
    )]
    RecursionBlocked { action: String },

    /// Rule code threw. The registry entry was still removed.
    #[error("action {action} failed: {source}")]
    #[diagnostic(code(boardflow::dispatcher::runtime))]
    Runtime {
        action: String,
        #[source]
        source: RuntimeError,
    },

    /// The runtime acknowledged a cancellation request.
    #[error("action {action} cancelled")]
    #[diagnostic(code(boardflow::dispatcher::cancelled))]
    Cancelled { action: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Report returned by [`Dispatcher::cancel_execution`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CancelReport {
    pub success: bool,
}

/// Orchestrates action invocations against a board.
///
/// Cloning is cheap; clones share the store, registry, runtime, and event
/// sender. The surrounding HTTP layer talks to the dispatcher (usually via
/// [`Engine`](crate::engine::Engine)) and to nothing below it.
#[derive(Clone)]
pub struct Dispatcher {
    store: BoardStore,
    contexts: ContextManager,
    registry: ExecutionRegistry,
    runtime: Arc<dyn ActionRuntime>,
    events: flume::Sender<Event>,
}

impl Dispatcher {
    pub fn new(
        store: BoardStore,
        registry: ExecutionRegistry,
        runtime: Arc<dyn ActionRuntime>,
        events: flume::Sender<Event>,
    ) -> Self {
        let contexts = ContextManager::new(store.clone());
        Self {
            store,
            contexts,
            registry,
            runtime,
            events,
        }
    }

    #[must_use]
    pub fn contexts(&self) -> &ContextManager {
        &self.contexts
    }

    #[must_use]
    pub fn registry(&self) -> &ExecutionRegistry {
        &self.registry
    }

    /// Run an action as a fresh top-level chain.
    ///
    /// The chain's context lives exactly as long as this call; when it
    /// returns, the context and any remaining overlay are gone.
    #[instrument(skip(self, params), fields(board = %board, action))]
    pub async fn run_action(
        &self,
        board: &BoardId,
        action: &str,
        params: Value,
    ) -> Result<Value, DispatchError> {
        let ctx = self.contexts.begin_chain(board.clone());
        self.dispatch(&ctx, action, params).await
    }

    /// Run an action within an existing chain (nested `execute_action`).
    ///
    /// The context is reused verbatim — never re-derived from ambient
    /// state — so the nested call sees the chain's overlay and counts
    /// against its recursion tracking.
    pub async fn dispatch_chained(
        &self,
        ctx: &ExecutionContext,
        action: &str,
        params: Value,
    ) -> Result<Value, DispatchError> {
        let ctx = self.contexts.continue_chain(ctx);
        self.dispatch(&ctx, action, params).await
    }

    async fn dispatch(
        &self,
        ctx: &ExecutionContext,
        action: &str,
        params: Value,
    ) -> Result<Value, DispatchError> {
        let board = ctx.board().clone();

        // Resolving
        let (card, mode) = self.resolve(&board, action).await?;

        // Recursion gate: atomic check-and-insert scoped to this chain. The
        // entry is removed when `_entry` drops, error paths included.
        let Some(_entry) = ctx.enter_action(action) else {
            debug!(board = %board, action, context = %ctx.context_id(), "recursion blocked");
            self.emit_diagnostic("recursion", format!("{board}:{action} blocked"));
            return Err(DispatchError::RecursionBlocked {
                action: action.to_string(),
            });
        };

        // Registered: the guard unregisters on every exit path below.
        let registration =
            self.registry
                .register(board.clone(), action, ctx.context_id().clone());
        let execution_id = registration.execution_id().clone();
        self.emit(
            ExecutionPhase::Started,
            &execution_id,
            &board,
            action,
            "execution started",
        );

        // Running
        let api = ActionApi::new(
            self.clone(),
            ctx.clone(),
            action.to_string(),
            execution_id.clone(),
        );
        let outcome = self.runtime.execute(&card.code, api, params).await;

        match outcome {
            Ok(value) => {
                // Committing: non-ephemeral writes made during Running are
                // already in the store; what remains is the action's own
                // result slot and, for terminators, the overlay teardown.
                self.contexts.commit_result(ctx, &card, mode, &value).await?;
                if card.chain_terminator {
                    ctx.discard_overlay();
                }
                self.emit(
                    ExecutionPhase::Completed,
                    &execution_id,
                    &board,
                    action,
                    "execution completed",
                );
                Ok(value)
            }
            Err(RuntimeError::Cancelled) => {
                // Acknowledged cancellation: the registry entry goes away
                // now even if the runtime is still unwinding.
                if card.chain_terminator {
                    ctx.discard_overlay();
                }
                self.emit(
                    ExecutionPhase::Cancelled,
                    &execution_id,
                    &board,
                    action,
                    "execution cancelled",
                );
                Err(DispatchError::Cancelled {
                    action: action.to_string(),
                })
            }
            Err(err) => {
                // Discarding: the failure is local to this chain; siblings
                // and later invocations of the same action are unaffected.
                if card.chain_terminator {
                    ctx.discard_overlay();
                }
                warn!(board = %board, action, error = %err, "action runtime failed");
                self.emit(
                    ExecutionPhase::Failed,
                    &execution_id,
                    &board,
                    action,
                    err.to_string(),
                );
                Err(DispatchError::Runtime {
                    action: action.to_string(),
                    source: err,
                })
            }
        }
        // Unregistered: `registration` and `_entry` drop here, on every path.
    }

    /// Executions currently in flight on a board.
    #[must_use]
    pub fn list_running_executions(&self, board: &BoardId) -> Vec<ExecutionSummary> {
        self.registry.list(board)
    }

    /// Request cooperative cancellation of one invocation.
    ///
    /// The board and action must match the registered record; a mismatch or
    /// an unknown id reports `success: false` with no side effects.
    pub fn cancel_execution(
        &self,
        board: &BoardId,
        action: &str,
        execution_id: &ExecutionId,
    ) -> CancelReport {
        let matches = self
            .registry
            .get(execution_id)
            .is_some_and(|record| &record.board == board && record.action == action);
        if !matches {
            return CancelReport { success: false };
        }
        match self.registry.request_cancel(execution_id) {
            CancelOutcome::Accepted => {
                self.emit(
                    ExecutionPhase::CancelRequested,
                    execution_id,
                    board,
                    action,
                    "cancellation requested",
                );
                CancelReport { success: true }
            }
            CancelOutcome::NotFound => CancelReport { success: false },
        }
    }

    /// Resolve the action card and its effective state mode.
    async fn resolve(
        &self,
        board: &BoardId,
        action: &str,
    ) -> Result<(Card, StateMode), DispatchError> {
        let doc = self.store.load(board).await.map_err(|err| match err {
            StoreError::BoardNotFound { board } => DispatchError::BoardNotFound { board },
            other => DispatchError::Store(other),
        })?;
        let card = doc
            .action(action)
            .cloned()
            .ok_or_else(|| DispatchError::ActionNotFound {
                board: board.to_string(),
                action: action.to_string(),
            })?;
        let mode = ContextManager::effective_mode(&card, &doc);
        Ok((card, mode))
    }

    fn emit(
        &self,
        phase: ExecutionPhase,
        execution_id: &ExecutionId,
        board: &BoardId,
        action: &str,
        message: impl Into<String>,
    ) {
        let _ = self.events.send(Event::execution(
            phase,
            execution_id.clone(),
            board.clone(),
            action,
            message,
        ));
    }

    fn emit_diagnostic(&self, scope: &str, message: String) {
        let _ = self.events.send(Event::diagnostic(scope, message));
    }
}
