//! State-mode semantics: ephemeral overlays vs persisted base state.
//!
//! Validates that ephemeral invocations never touch the Board Store, that
//! non-ephemeral invocations commit their result synchronously, and that
//! parallel ephemeral chains stay isolated from each other.

mod common;

use std::time::Duration;

use serde_json::json;

use boardflow::board::Card;
use boardflow::runtime::RuntimeError;
use boardflow::types::StateMode;

use common::*;

#[tokio::test]
async fn ephemeral_invocation_never_changes_base_state() {
    let runtime = ScriptedRuntime::new().on("probe", |_api, _params| async move {
        Ok(json!({"sampled": true}))
    });
    let engine = engine_with(runtime);
    let board = board_id("sensors");
    seed_board(
        &engine,
        &board,
        vec![Card::action("probe", "sample()").with_state_mode(StateMode::Ephemeral)],
    )
    .await;

    let result = engine.run_action(&board, "probe", json!({})).await.unwrap();
    assert_eq!(result, json!({"sampled": true}));

    // The store never saw the ephemeral result.
    assert_eq!(engine.read_state(&board, "probe").await.unwrap(), None);
}

#[tokio::test]
async fn non_ephemeral_invocation_commits_its_result() {
    let runtime = ScriptedRuntime::new().on("persist", |_api, _params| async move {
        Ok(json!({"sampled": true}))
    });
    let engine = engine_with(runtime);
    let board = board_id("sensors");
    seed_board(&engine, &board, vec![Card::action("persist", "sample()")]).await;

    let result = engine
        .run_action(&board, "persist", json!({}))
        .await
        .unwrap();

    assert_eq!(
        engine.read_state(&board, "persist").await.unwrap(),
        Some(result)
    );
}

#[tokio::test]
async fn default_mode_follows_the_board_flag() {
    let runtime = ScriptedRuntime::new().on("act", |_api, _params| async move { Ok(json!(7)) });
    let engine = engine_with(runtime);

    // Board defaults to ephemeral: the default-mode card writes nothing.
    let board = board_id("transient");
    let doc = boardflow::board::BoardDocument::builder(board.clone())
        .with_card(Card::action("act", "…").with_state_mode(StateMode::Default))
        .ephemeral_by_default(true)
        .build();
    engine.create_board(doc).await.unwrap();

    engine.run_action(&board, "act", json!({})).await.unwrap();
    assert_eq!(engine.read_state(&board, "act").await.unwrap(), None);
}

#[tokio::test]
async fn explicit_mode_is_not_overridden_by_the_board_flag() {
    let runtime = ScriptedRuntime::new().on("keep", |_api, _params| async move { Ok(json!(1)) });
    let engine = engine_with(runtime);

    let board = board_id("transient");
    let doc = boardflow::board::BoardDocument::builder(board.clone())
        .with_card(Card::action("keep", "…").with_state_mode(StateMode::NonEphemeral))
        .ephemeral_by_default(true)
        .build();
    engine.create_board(doc).await.unwrap();

    engine.run_action(&board, "keep", json!({})).await.unwrap();
    assert_eq!(
        engine.read_state(&board, "keep").await.unwrap(),
        Some(json!(1))
    );
}

#[tokio::test]
async fn ephemeral_reads_fall_back_to_committed_base_state() {
    let runtime = ScriptedRuntime::new().on("reader", |api, _params| async move {
        let seen = api.read_var("reader").await.map_err(RuntimeError::from)?;
        Ok(json!({"seen": seen}))
    });
    let engine = engine_with(runtime);
    let board = board_id("sensors");
    let doc = boardflow::board::BoardDocument::builder(board.clone())
        .with_card(Card::action("reader", "…").with_state_mode(StateMode::Ephemeral))
        .with_state("reader", json!("committed"))
        .build();
    engine.create_board(doc).await.unwrap();

    let result = engine.run_action(&board, "reader", json!({})).await.unwrap();
    assert_eq!(result, json!({"seen": "committed"}));
    // And the base value is still what it was.
    assert_eq!(
        engine.read_state(&board, "reader").await.unwrap(),
        Some(json!("committed"))
    );
}

#[tokio::test]
async fn parallel_ephemeral_chains_stay_isolated() {
    // Each worker writes its own id into the same ephemeral slot, waits,
    // and reads it back; with a shared slot a crossed overlay would leak
    // another worker's id.
    let runtime = ScriptedRuntime::new().on("worker", |api, params| async move {
        let worker_id = params["workerId"].clone();
        let delay_ms = params["delayMs"].as_u64().unwrap_or(0);
        api.write_var("worker", worker_id)
            .await
            .map_err(RuntimeError::from)?;
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        let read_back = api.read_var("worker").await.map_err(RuntimeError::from)?;
        Ok(json!({"workerId": read_back}))
    });
    let engine = std::sync::Arc::new(engine_with(runtime));
    let board = board_id("pool");
    seed_board(
        &engine,
        &board,
        vec![Card::action("worker", "…").with_state_mode(StateMode::Ephemeral)],
    )
    .await;

    let mut handles = Vec::new();
    for i in 0..8u64 {
        let engine = engine.clone();
        let board = board.clone();
        handles.push(tokio::spawn(async move {
            let params = json!({"workerId": format!("w{i}"), "delayMs": (8 - i) * 10});
            (i, engine.run_action(&board, "worker", params).await)
        }));
    }

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        let value = result.unwrap();
        assert_eq!(
            value,
            json!({"workerId": format!("w{i}")}),
            "worker {i} observed a foreign overlay"
        );
    }

    // Nothing leaked into base state.
    assert_eq!(engine.read_state(&board, "worker").await.unwrap(), None);
}

#[tokio::test]
async fn legacy_cards_behave_as_non_ephemeral() {
    let runtime = ScriptedRuntime::new().on("old", |_api, _params| async move { Ok(json!("v")) });
    let engine = engine_with(runtime);
    let board = board_id("legacy");

    // Deserialized without a state_mode field, as old documents are.
    let card: Card = serde_json::from_value(json!({
        "name": "old",
        "kind": "action",
        "code": "…"
    }))
    .unwrap();
    seed_board(&engine, &board, vec![card]).await;

    engine.run_action(&board, "old", json!({})).await.unwrap();
    assert_eq!(
        engine.read_state(&board, "old").await.unwrap(),
        Some(json!("v"))
    );
}
