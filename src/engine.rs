//! The engine façade: everything the surrounding platform calls.
//!
//! `Engine` wires the Board Store, Execution Registry, Version Manager,
//! Action Dispatcher, and event bus into one composition root. An HTTP
//! layer holds a single `Engine` and never reaches below it; the status
//! mapping (unknown board ⇒ 404, rule-code failure ⇒ 500, …) is that
//! layer's job, not the engine's.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use boardflow::board::{BoardDocument, Card};
//! use boardflow::engine::Engine;
//! use boardflow::runtime::ActionRuntime;
//! use boardflow::types::BoardId;
//! use serde_json::json;
//!
//! # async fn example(runtime: Arc<dyn ActionRuntime>) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::builder(runtime).build();
//! let board = BoardId::new("porch")?;
//!
//! engine
//!     .create_board(
//!         BoardDocument::builder(board.clone())
//!             .with_card(Card::action("light", "toggle()"))
//!             .build(),
//!     )
//!     .await?;
//!
//! let result = engine.run_action(&board, "light", json!({})).await?;
//! let version = engine.create_version(&board, Some("after install".into())).await?;
//! # let _ = (result, version);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::board::{BoardDocument, Card, VersionMeta};
use crate::config::EngineConfig;
use crate::dispatcher::{CancelReport, DispatchError, Dispatcher};
use crate::event_bus::{EventBus, EventSink};
use crate::registry::{ExecutionRegistry, ExecutionSummary};
use crate::runtime::ActionRuntime;
use crate::store::{BoardStore, StoreBackend, StoreError};
use crate::types::{BoardId, ExecutionId};
use crate::versioning::{VersionError, VersionManager};

/// Composition root for the execution core.
pub struct Engine {
    store: BoardStore,
    dispatcher: Dispatcher,
    versions: VersionManager,
    event_bus: EventBus,
}

impl Engine {
    /// Start building an engine around an Action Runtime implementation.
    pub fn builder(runtime: Arc<dyn ActionRuntime>) -> EngineBuilder {
        EngineBuilder {
            runtime,
            config: EngineConfig::default(),
            backend: None,
            extra_sinks: Vec::new(),
        }
    }

    // ----- board management (consumed surface) -----

    pub async fn create_board(&self, doc: BoardDocument) -> Result<(), StoreError> {
        self.store.create_board(doc).await
    }

    pub async fn add_card(&self, board: &BoardId, card: Card) -> Result<Vec<Card>, StoreError> {
        self.store.add_card(board, card).await
    }

    pub async fn update_card(&self, board: &BoardId, card: Card) -> Result<Vec<Card>, StoreError> {
        self.store.update_card(board, card).await
    }

    pub async fn remove_card(
        &self,
        board: &BoardId,
        card_name: &str,
    ) -> Result<Vec<Card>, StoreError> {
        self.store.remove_card(board, card_name).await
    }

    pub async fn cards(&self, board: &BoardId) -> Result<Vec<Card>, StoreError> {
        self.store.cards(board).await
    }

    /// Committed base-state value of one variable, bypassing any chain
    /// overlay (there is none at this boundary).
    pub async fn read_state(
        &self,
        board: &BoardId,
        card_name: &str,
    ) -> Result<Option<Value>, StoreError> {
        self.store.read_var(board, card_name).await
    }

    // ----- execution -----

    /// Run an action as a fresh top-level chain.
    pub async fn run_action(
        &self,
        board: &BoardId,
        action: &str,
        params: Value,
    ) -> Result<Value, DispatchError> {
        self.dispatcher.run_action(board, action, params).await
    }

    /// Executions currently in flight on a board.
    #[must_use]
    pub fn list_running_executions(&self, board: &BoardId) -> Vec<ExecutionSummary> {
        self.dispatcher.list_running_executions(board)
    }

    /// Request cooperative cancellation of one invocation.
    #[must_use]
    pub fn cancel_execution(
        &self,
        board: &BoardId,
        action: &str,
        execution_id: &ExecutionId,
    ) -> CancelReport {
        self.dispatcher.cancel_execution(board, action, execution_id)
    }

    // ----- versioning -----

    pub async fn create_version(
        &self,
        board: &BoardId,
        comment: Option<String>,
    ) -> Result<u64, VersionError> {
        self.versions.snapshot(board, comment).await
    }

    pub async fn current_version(&self, board: &BoardId) -> Result<u64, VersionError> {
        self.versions.current_version(board).await
    }

    pub async fn history(&self, board: &BoardId) -> Result<Vec<VersionMeta>, VersionError> {
        self.versions.history(board).await
    }

    pub async fn attach_version_meta(
        &self,
        board: &BoardId,
        version: u64,
        comment: Option<String>,
        tag: Option<String>,
    ) -> Result<(), VersionError> {
        self.versions.attach_meta(board, version, comment, tag).await
    }

    pub async fn restore_version(&self, board: &BoardId, version: u64) -> Result<(), VersionError> {
        self.versions.restore(board, version).await
    }

    // ----- accessors -----

    #[must_use]
    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Drain the event listener before shutdown.
    pub async fn shutdown(&self) {
        self.event_bus.stop_listener().await;
    }
}

/// Fluent construction for [`Engine`].
pub struct EngineBuilder {
    runtime: Arc<dyn ActionRuntime>,
    config: EngineConfig,
    backend: Option<Arc<dyn StoreBackend>>,
    extra_sinks: Vec<Box<dyn EventSink>>,
}

impl EngineBuilder {
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist through a custom backend instead of the in-memory default.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn StoreBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach an additional event sink beyond the configured ones.
    #[must_use]
    pub fn add_sink<T: EventSink + 'static>(mut self, sink: T) -> Self {
        self.extra_sinks.push(Box::new(sink));
        self
    }

    #[must_use]
    pub fn build(self) -> Engine {
        let store = match self.backend {
            Some(backend) => BoardStore::new(backend),
            None => BoardStore::in_memory(),
        }
        .with_lock_timeout(self.config.lock_timeout);

        let event_bus = self.config.event_bus.build_event_bus();
        for sink in self.extra_sinks {
            event_bus.add_boxed_sink(sink);
        }
        event_bus.listen_for_events();

        let registry = ExecutionRegistry::new();
        let dispatcher = Dispatcher::new(
            store.clone(),
            registry,
            self.runtime,
            event_bus.get_sender(),
        );
        let versions = VersionManager::new(store.clone());

        Engine {
            store,
            dispatcher,
            versions,
            event_bus,
        }
    }
}
