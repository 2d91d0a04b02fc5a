//! Version manager semantics: monotonic snapshots, metadata, restore.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use boardflow::board::Card;
use boardflow::versioning::VersionError;

use common::*;

fn noop_runtime() -> ScriptedRuntime {
    ScriptedRuntime::new()
}

#[tokio::test]
async fn snapshots_are_strictly_increasing() {
    let engine = engine_with(noop_runtime());
    let board = board_id("versioned");
    seed_board(&engine, &board, vec![Card::value("v")]).await;

    assert_eq!(engine.current_version(&board).await.unwrap(), 0);
    for expected in 1..=5u64 {
        let version = engine.create_version(&board, None).await.unwrap();
        assert_eq!(version, expected);
    }
    assert_eq!(engine.current_version(&board).await.unwrap(), 5);
}

#[tokio::test]
async fn concurrent_snapshots_have_no_gaps_or_duplicates() {
    let engine = Arc::new(engine_with(noop_runtime()));
    let board = board_id("versioned");
    seed_board(&engine, &board, vec![Card::value("v")]).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let engine = engine.clone();
        let board = board.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_version(&board, Some(format!("writer {i}")))
                .await
        }));
    }

    let mut versions = HashSet::new();
    for handle in handles {
        versions.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(versions, (1..=10).collect::<HashSet<u64>>());

    let history = engine.history(&board).await.unwrap();
    let listed: Vec<u64> = history.iter().map(|m| m.version).collect();
    assert_eq!(listed, (1..=10).collect::<Vec<u64>>(), "history not ascending");
}

#[tokio::test]
async fn restore_returns_board_state_to_the_snapshot() {
    let runtime = ScriptedRuntime::new().on("set", |api, params| async move {
        api.write_var("slot", params["value"].clone()).await?;
        Ok(json!("ok"))
    });
    let engine = engine_with(runtime);
    let board = board_id("versioned");
    seed_board(
        &engine,
        &board,
        vec![Card::action("set", "…"), Card::value("slot")],
    )
    .await;

    engine
        .run_action(&board, "set", json!({"value": "first"}))
        .await
        .unwrap();
    let v1 = engine.create_version(&board, Some("first".into())).await.unwrap();

    engine
        .run_action(&board, "set", json!({"value": "second"}))
        .await
        .unwrap();
    assert_eq!(
        engine.read_state(&board, "slot").await.unwrap(),
        Some(json!("second"))
    );

    engine.restore_version(&board, v1).await.unwrap();
    assert_eq!(
        engine.read_state(&board, "slot").await.unwrap(),
        Some(json!("first"))
    );
}

#[tokio::test]
async fn restore_preserves_later_history_entries() {
    let engine = engine_with(noop_runtime());
    let board = board_id("versioned");
    seed_board(&engine, &board, vec![Card::value("v")]).await;

    let v1 = engine.create_version(&board, None).await.unwrap();
    let _v2 = engine.create_version(&board, None).await.unwrap();
    let v3 = engine.create_version(&board, None).await.unwrap();

    engine.restore_version(&board, v1).await.unwrap();

    let history = engine.history(&board).await.unwrap();
    assert_eq!(history.len(), 3, "restore must not delete history entries");
    assert_eq!(history.last().unwrap().version, v3);
    // The counter never decreases.
    assert_eq!(engine.current_version(&board).await.unwrap(), v3);
}

#[tokio::test]
async fn attach_meta_updates_comment_and_tag() {
    let engine = engine_with(noop_runtime());
    let board = board_id("versioned");
    seed_board(&engine, &board, vec![Card::value("v")]).await;

    let version = engine.create_version(&board, None).await.unwrap();
    engine
        .attach_version_meta(&board, version, Some("stable".into()), Some("v1.0".into()))
        .await
        .unwrap();

    let history = engine.history(&board).await.unwrap();
    assert_eq!(history[0].comment.as_deref(), Some("stable"));
    assert_eq!(history[0].tag.as_deref(), Some("v1.0"));
}

#[tokio::test]
async fn unknown_versions_are_reported_as_not_found() {
    let engine = engine_with(noop_runtime());
    let board = board_id("versioned");
    seed_board(&engine, &board, vec![Card::value("v")]).await;

    let restore = engine.restore_version(&board, 99).await;
    assert!(matches!(
        restore,
        Err(VersionError::VersionNotFound { version: 99, .. })
    ));

    let attach = engine.attach_version_meta(&board, 7, None, None).await;
    assert!(matches!(
        attach,
        Err(VersionError::VersionNotFound { version: 7, .. })
    ));
}

#[tokio::test]
async fn snapshot_content_is_immune_to_later_writes() {
    let runtime = ScriptedRuntime::new().on("set", |api, params| async move {
        api.write_var("slot", params["value"].clone()).await?;
        Ok(json!("ok"))
    });
    let engine = engine_with(runtime);
    let board = board_id("versioned");
    seed_board(
        &engine,
        &board,
        vec![Card::action("set", "…"), Card::value("slot")],
    )
    .await;

    engine
        .run_action(&board, "set", json!({"value": "captured"}))
        .await
        .unwrap();
    let version = engine.create_version(&board, None).await.unwrap();

    // Mutate live state, then add another card.
    engine
        .run_action(&board, "set", json!({"value": "drifted"}))
        .await
        .unwrap();
    engine
        .add_card(&board, Card::value("late_arrival"))
        .await
        .unwrap();

    engine.restore_version(&board, version).await.unwrap();
    assert_eq!(
        engine.read_state(&board, "slot").await.unwrap(),
        Some(json!("captured"))
    );
    // The card added after the snapshot is gone from the restored tip.
    let cards = engine.cards(&board).await.unwrap();
    assert!(cards.iter().all(|c| c.name != "late_arrival"));
}
