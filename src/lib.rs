//! # Boardflow: Execution Core for Board-Based Automation
//!
//! Boardflow is the execution core of a board-based automation platform:
//! boards hold cards, action cards run user rule code against board state,
//! and invocations chain through a shared per-chain context with ephemeral
//! state overlays, recursion detection, a live execution registry with
//! cooperative cancellation, and board versioning.
//!
//! ## Core Concepts
//!
//! - **Boards & Cards**: A board is a named container of cards; each card
//!   has a kind, a state mode, and opaque rule code.
//! - **Chains**: A top-level invocation starts a chain; nested
//!   `execute_action` calls share the chain's [`ExecutionContext`] by
//!   reference until a chain-terminator card ends it.
//! - **State modes**: Ephemeral writes live in the chain overlay and vanish
//!   at termination; non-ephemeral writes commit synchronously to the
//!   Board Store.
//! - **Registry**: Every invocation is individually addressable while it
//!   runs — listable and cancellable by execution id.
//! - **Versioning**: Append-only snapshots with monotonic version numbers
//!   and non-destructive restore.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use boardflow::board::{BoardDocument, Card};
//! use boardflow::engine::Engine;
//! use boardflow::runtime::ActionRuntime;
//! use boardflow::types::{BoardId, StateMode};
//! use serde_json::json;
//!
//! # async fn example(runtime: Arc<dyn ActionRuntime>) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::builder(runtime).build();
//! let board = BoardId::new("greenhouse")?;
//!
//! engine
//!     .create_board(
//!         BoardDocument::builder(board.clone())
//!             .with_card(Card::action("vent", "open_vents()"))
//!             .with_card(
//!                 Card::action("probe", "sample()").with_state_mode(StateMode::Ephemeral),
//!             )
//!             .build(),
//!     )
//!     .await?;
//!
//! let outcome = engine.run_action(&board, "vent", json!({"target": 21})).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```
//!
//! The rule-code interpreter is not part of this crate: implement
//! [`runtime::ActionRuntime`] over your interpreter of choice and hand it to
//! [`engine::Engine::builder`]. The [`runtime::ActionApi`] it receives is
//! already bound to the invocation's board, chain context, and cancellation
//! flag.
//!
//! ## Module Guide
//!
//! - [`types`] - Board ids, card kinds, state modes
//! - [`board`] - Card and board document model
//! - [`store`] - Board Store: serialized writes, persistence backends
//! - [`context`] - Execution contexts, overlays, recursion guard
//! - [`registry`] - Live execution registry and cancellation
//! - [`runtime`] - Action Runtime boundary and bound API surface
//! - [`dispatcher`] - The dispatch state machine
//! - [`versioning`] - Snapshot / history / restore
//! - [`engine`] - The façade the surrounding platform calls
//! - [`event_bus`] - Structured events and sinks
//!
//! [`ExecutionContext`]: context::ExecutionContext

pub mod board;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod event_bus;
pub mod registry;
pub mod runtime;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod versioning;
