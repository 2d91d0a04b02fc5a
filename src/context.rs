//! Execution contexts and the chain-scoped state overlay.
//!
//! Every top-level action invocation begins a *chain*: a fresh
//! [`ExecutionContext`] that nested `execute_action` calls share by
//! reference. The context carries two pieces of chain-local state:
//!
//! - the **overlay**: ephemeral writes layered over the Board Store, visible
//!   only inside this chain and discarded when the chain terminates;
//! - the **in-flight set**: the actions currently executing in this chain,
//!   used for recursion detection.
//!
//! The context is never persisted and never derived from ambient state; the
//! dispatcher threads it explicitly through every nested call.
//!
//! # Examples
//!
//! ```rust
//! use boardflow::board::{BoardDocument, Card};
//! use boardflow::context::ContextManager;
//! use boardflow::store::BoardStore;
//! use boardflow::types::{BoardId, StateMode};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), boardflow::store::StoreError> {
//! let store = BoardStore::in_memory();
//! let board = BoardId::new("demo").unwrap();
//! store
//!     .create_board(
//!         BoardDocument::builder(board.clone())
//!             .with_card(Card::action("scratch", "…").with_state_mode(StateMode::Ephemeral))
//!             .build(),
//!     )
//!     .await?;
//!
//! let contexts = ContextManager::new(store.clone());
//! let ctx = contexts.begin_chain(board.clone());
//!
//! contexts.write_var(&ctx, "scratch", json!(41)).await?;
//! assert_eq!(contexts.read_var(&ctx, "scratch").await?, Some(json!(41)));
//! // The store never saw the ephemeral write.
//! assert_eq!(store.read_var(&board, "scratch").await?, None);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::trace;

use crate::board::{BoardDocument, Card};
use crate::store::{BoardStore, StoreError};
use crate::types::{BoardId, ContextId, StateMode};
use crate::utils::collections::new_state_map;
use crate::utils::id_generator::IdGenerator;

/// Per-chain execution state, shared by reference across nested calls.
///
/// `Clone` is shallow: clones observe and mutate the same overlay and
/// in-flight set. A context belongs to exactly one chain on one board and
/// is dropped when that chain ends.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    context_id: ContextId,
    board: BoardId,
    created_at: DateTime<Utc>,
    overlay: Mutex<FxHashMap<String, Value>>,
    in_flight: Mutex<FxHashSet<String>>,
}

impl ExecutionContext {
    fn new(board: BoardId, ids: &IdGenerator) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                context_id: ids.generate_context_id(),
                board,
                created_at: Utc::now(),
                overlay: Mutex::new(new_state_map()),
                in_flight: Mutex::new(FxHashSet::default()),
            }),
        }
    }

    #[must_use]
    pub fn context_id(&self) -> &ContextId {
        &self.inner.context_id
    }

    #[must_use]
    pub fn board(&self) -> &BoardId {
        &self.inner.board
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Atomic check-and-insert against the chain's in-flight set.
    ///
    /// Returns `None` when `action` is already executing in this chain —
    /// the recursion guard's `blocked` outcome. On success the returned
    /// [`ActionEntry`] removes the entry when dropped, so the exit happens
    /// on every path out of the nested call, error paths included.
    ///
    /// Two independent chains entering the same action never block each
    /// other; the set is scoped to this context.
    #[must_use]
    pub fn enter_action(&self, action: &str) -> Option<ActionEntry> {
        let mut in_flight = self.inner.in_flight.lock();
        if !in_flight.insert(action.to_string()) {
            return None;
        }
        Some(ActionEntry {
            ctx: self.clone(),
            action: action.to_string(),
        })
    }

    /// Value of an ephemeral write made earlier in this chain, if any.
    #[must_use]
    pub fn overlay_get(&self, name: &str) -> Option<Value> {
        self.inner.overlay.lock().get(name).cloned()
    }

    pub fn overlay_insert(&self, name: &str, value: Value) {
        self.inner.overlay.lock().insert(name.to_string(), value);
    }

    /// Wipe every ephemeral write in the chain. Called when a chain
    /// terminator completes, success or error.
    pub fn discard_overlay(&self) {
        let mut overlay = self.inner.overlay.lock();
        if !overlay.is_empty() {
            trace!(
                context = %self.inner.context_id,
                discarded = overlay.len(),
                "chain overlay discarded"
            );
        }
        overlay.clear();
    }

    /// Point-in-time copy of the overlay (diagnostics and tests).
    #[must_use]
    pub fn overlay_snapshot(&self) -> FxHashMap<String, Value> {
        self.inner.overlay.lock().clone()
    }
}

/// Live entry in a chain's in-flight set; dropping it exits the action.
#[derive(Debug)]
pub struct ActionEntry {
    ctx: ExecutionContext,
    action: String,
}

impl Drop for ActionEntry {
    fn drop(&mut self) {
        self.ctx.inner.in_flight.lock().remove(&self.action);
    }
}

/// Creates and propagates execution contexts and resolves the state path
/// for reads and writes.
///
/// Cloning is cheap; clones share the underlying store.
#[derive(Clone)]
pub struct ContextManager {
    store: BoardStore,
    ids: IdGenerator,
}

impl ContextManager {
    pub fn new(store: BoardStore) -> Self {
        Self {
            store,
            ids: IdGenerator::new(),
        }
    }

    /// Fresh context for a top-level invocation.
    #[must_use]
    pub fn begin_chain(&self, board: BoardId) -> ExecutionContext {
        let ctx = ExecutionContext::new(board, &self.ids);
        trace!(context = %ctx.context_id(), board = %ctx.board(), "chain started");
        ctx
    }

    /// Reuse the enclosing chain's context for a nested `execute_action`.
    ///
    /// The context is passed by reference through the dispatch call; this
    /// returns a shallow clone of the same chain state.
    #[must_use]
    pub fn continue_chain(&self, ctx: &ExecutionContext) -> ExecutionContext {
        ctx.clone()
    }

    /// Resolve a card's state mode against its board's default.
    #[must_use]
    pub fn effective_mode(card: &Card, board: &BoardDocument) -> StateMode {
        card.effective_mode(board.ephemeral)
    }

    /// Read a variable through the chain's state path.
    ///
    /// Ephemeral-effective names hit the overlay first and fall back to the
    /// board's base state; a chain sees its own pending writes but never
    /// another chain's. Non-ephemeral names read base state directly.
    pub async fn read_var(
        &self,
        ctx: &ExecutionContext,
        name: &str,
    ) -> Result<Option<Value>, StoreError> {
        let (mode, base) = self.resolve(ctx.board(), name).await?;
        if mode.is_ephemeral() {
            if let Some(pending) = ctx.overlay_get(name) {
                return Ok(Some(pending));
            }
        }
        Ok(base)
    }

    /// Write a variable through the chain's state path.
    ///
    /// Ephemeral-effective names go only to the overlay — the Board Store
    /// is untouched and other observers see no change. Non-ephemeral names
    /// commit synchronously to the store. Names with no backing card write
    /// as non-ephemeral, matching the legacy-card rule.
    pub async fn write_var(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let (mode, _) = self.resolve(ctx.board(), name).await?;
        if mode.is_ephemeral() {
            ctx.overlay_insert(name, value);
            Ok(())
        } else {
            self.store.write_var(ctx.board(), name, value).await
        }
    }

    /// Commit an action's returned value to its own state slot, honoring
    /// the card's effective mode.
    pub async fn commit_result(
        &self,
        ctx: &ExecutionContext,
        card: &Card,
        mode: StateMode,
        value: &Value,
    ) -> Result<(), StoreError> {
        if mode.is_ephemeral() {
            ctx.overlay_insert(&card.name, value.clone());
            Ok(())
        } else {
            self.store
                .write_var(ctx.board(), &card.name, value.clone())
                .await
        }
    }

    /// Effective mode and committed base value for a name, under one read
    /// acquisition.
    async fn resolve(
        &self,
        board: &BoardId,
        name: &str,
    ) -> Result<(StateMode, Option<Value>), StoreError> {
        self.store
            .with_board_read(board, |record| {
                let mode = record
                    .doc
                    .card(name)
                    .map(|card| card.effective_mode(record.doc.ephemeral))
                    .unwrap_or(StateMode::NonEphemeral);
                (mode, record.doc.base_state.get(name).cloned())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_action_blocks_reentry_until_dropped() {
        let ctx = ExecutionContext::new(BoardId::new("b").unwrap(), &IdGenerator::new());

        let entry = ctx.enter_action("ping").expect("first entry succeeds");
        assert!(ctx.enter_action("ping").is_none(), "reentry is blocked");
        assert!(ctx.enter_action("pong").is_some(), "other actions unaffected");

        drop(entry);
        assert!(ctx.enter_action("ping").is_some(), "exit reopens the action");
    }

    #[test]
    fn clones_share_chain_state() {
        let ctx = ExecutionContext::new(BoardId::new("b").unwrap(), &IdGenerator::new());
        let alias = ctx.clone();

        ctx.overlay_insert("k", serde_json::json!(1));
        assert_eq!(alias.overlay_get("k"), Some(serde_json::json!(1)));
        assert_eq!(alias.context_id(), ctx.context_id());

        let _entry = ctx.enter_action("a");
        assert!(alias.enter_action("a").is_none());
    }

    #[test]
    fn independent_contexts_do_not_interfere() {
        let ids = IdGenerator::new();
        let a = ExecutionContext::new(BoardId::new("b").unwrap(), &ids);
        let b = ExecutionContext::new(BoardId::new("b").unwrap(), &ids);

        let _held = a.enter_action("act").unwrap();
        assert!(b.enter_action("act").is_some());

        a.overlay_insert("k", serde_json::json!("mine"));
        assert_eq!(b.overlay_get("k"), None);
    }

    #[test]
    fn discard_overlay_clears_pending_writes() {
        let ctx = ExecutionContext::new(BoardId::new("b").unwrap(), &IdGenerator::new());
        ctx.overlay_insert("k", serde_json::json!(1));
        ctx.discard_overlay();
        assert_eq!(ctx.overlay_get("k"), None);
    }
}
