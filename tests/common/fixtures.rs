//! Shared fixtures for integration tests.

use std::sync::Arc;

use boardflow::board::{BoardDocument, Card};
use boardflow::config::{EngineConfig, EventBusConfig};
use boardflow::engine::Engine;
use boardflow::event_bus::MemorySink;
use boardflow::types::BoardId;

use super::scripted::ScriptedRuntime;

pub fn board_id(name: &str) -> BoardId {
    BoardId::new(name).expect("test board name")
}

/// Engine with no event sinks (keeps test output quiet).
pub fn engine_with(runtime: ScriptedRuntime) -> Engine {
    Engine::builder(Arc::new(runtime))
        .config(EngineConfig::default().with_event_bus(EventBusConfig::new(vec![])))
        .build()
}

/// Engine plus a memory sink capturing every emitted event.
pub fn engine_with_events(runtime: ScriptedRuntime) -> (Engine, MemorySink) {
    let sink = MemorySink::new();
    let engine = Engine::builder(Arc::new(runtime))
        .config(EngineConfig::default().with_event_bus(EventBusConfig::new(vec![])))
        .add_sink(sink.clone())
        .build();
    (engine, sink)
}

/// Create `board` on the engine seeded with the given cards.
pub async fn seed_board(engine: &Engine, board: &BoardId, cards: Vec<Card>) {
    let mut builder = BoardDocument::builder(board.clone());
    for card in cards {
        builder = builder.with_card(card);
    }
    engine
        .create_board(builder.build())
        .await
        .expect("seed board");
}
