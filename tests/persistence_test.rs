//! Snapshots, configuration files and the event stream, exercised through the engine.

use rankgraph::{
    config::{ConfigProvider, EngineConfig, TomlConfigProvider},
    engine::PreferenceEngine,
    event::GraphEvent,
    properties::{ItemId, ItemPair, KnowsState, NodeKind, RankerId},
    store::GraphStore,
    RankGraphError,
};
use std::sync::Arc;
use tempfile::TempDir;
use test_log::test;
use tokio::sync::mpsc::unbounded_channel;

mod common;
use common::{ids, movie_night};

#[test]
fn test_snapshot_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.json");
    let engine = movie_night(GraphStore::new());
    let ranker = RankerId::from("123");
    engine
        .queue()
        .insert_queued_compare(&ranker, &"B".into(), &"C".into())
        .unwrap();
    engine.on_item_created(&"F".into()).unwrap();
    engine.knowledge().set_unknown(&ranker, &ids(&["F"])).unwrap();
    engine.store().save_snapshot(&path).unwrap();

    let restored = common::engine_over(GraphStore::load_snapshot(&path).unwrap());
    assert_eq!(
        restored.ranking().topological_sort(&ranker, None).unwrap(),
        engine.ranking().topological_sort(&ranker, None).unwrap()
    );
    assert_eq!(
        restored.queue().list_queued_compares(&ranker, None).unwrap().len(),
        1
    );
    assert_eq!(
        restored.knowledge().knows_state(&ranker, &"F".into()).unwrap(),
        KnowsState::Unknown
    );
    assert_eq!(restored.store().snapshot(), engine.store().snapshot());
}

#[test]
fn test_snapshot_reloads_after_chained_preferences() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.json");
    let engine = common::engine_over(GraphStore::new());
    common::register(&engine, "r", &["A", "B", "C"]);
    let ranker = RankerId::from("r");
    let [a, b, c] = [ItemId::from("A"), ItemId::from("B"), ItemId::from("C")];

    assert!(engine
        .queue()
        .insert_queued_compare(&ranker, &a, &c)
        .unwrap()
        .is_queued());
    assert!(engine
        .preferences()
        .insert_preference(&ranker, &a, &b)
        .unwrap()
        .is_created());
    assert!(engine
        .preferences()
        .insert_preference(&ranker, &b, &c)
        .unwrap()
        .is_created());
    assert!(engine.store().built_in_test().is_empty());
    engine.store().save_snapshot(&path).unwrap();

    let restored = common::engine_over(GraphStore::load_snapshot(&path).unwrap());
    assert!(restored
        .queue()
        .list_queued_compares(&ranker, None)
        .unwrap()
        .is_empty());
    assert_eq!(
        restored.ranking().topological_sort(&ranker, None).unwrap(),
        vec![a, b, c]
    );
}

#[test]
fn test_missing_snapshot_is_store_unavailable() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        GraphStore::load_snapshot(dir.path().join("absent.json")),
        Err(RankGraphError::StoreUnavailable(_))
    ));
}

#[test]
fn test_corrupt_snapshot_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{ \"items\": [ { \"id\": 3 } ] }").unwrap();
    assert!(matches!(
        GraphStore::load_snapshot(&path),
        Err(RankGraphError::Serialization(_))
    ));
}

#[test]
fn test_config_file_drives_engine() {
    let dir = TempDir::new().unwrap();
    let provider = TomlConfigProvider::new(dir.path().join("rankgraph.toml"));
    provider
        .set_config(&EngineConfig {
            populate_batch: 1,
            rng_seed: Some(5),
            ..Default::default()
        })
        .unwrap();

    let engine = movie_night(GraphStore::new());
    let configured = PreferenceEngine::new(
        provider.get_config().unwrap(),
        engine.store().clone(),
    )
    .unwrap();
    // The default cap now comes from the file.
    assert_eq!(
        configured
            .queue()
            .populate_queued_compares(&"123".into(), None)
            .unwrap(),
        1
    );
}

#[test(tokio::test)]
async fn test_events_follow_committed_mutations() {
    let (tx, mut rx) = unbounded_channel();
    let store = Arc::new(GraphStore::new().with_event_sender(tx));
    let engine = PreferenceEngine::new(EngineConfig::default(), store).unwrap();
    let ranker = RankerId::from("r");
    let [a, b] = [ItemId::from("a"), ItemId::from("b")];

    engine.on_ranker_created(&ranker).unwrap();
    engine.on_item_created(&a).unwrap();
    engine.on_item_created(&b).unwrap();
    engine
        .knowledge()
        .set_known(&ranker, &[a.clone(), b.clone()])
        .unwrap();
    engine.queue().insert_queued_compare(&ranker, &a, &b).unwrap();
    engine.preferences().insert_preference(&ranker, &b, &a).unwrap();
    // Rejected calls produce no events.
    engine.preferences().insert_preference(&ranker, &a, &b).unwrap();
    engine.on_item_deleted(&a).unwrap();

    let expected = vec![
        GraphEvent::NodeCreated(NodeKind::Ranker, "r".to_string()),
        GraphEvent::NodeCreated(NodeKind::Item, "a".to_string()),
        GraphEvent::NodeCreated(NodeKind::Item, "b".to_string()),
        GraphEvent::KnowledgeChanged(ranker.clone(), vec![a.clone(), b.clone()], KnowsState::Known),
        GraphEvent::CompareQueued(ranker.clone(), ItemPair::new(a.clone(), b.clone())),
        GraphEvent::CompareRemoved(ranker.clone(), ItemPair::new(a.clone(), b.clone())),
        GraphEvent::PreferenceInserted(ranker.clone(), b.clone(), a.clone()),
        GraphEvent::NodeRemoved(NodeKind::Item, "a".to_string()),
    ];
    let mut received = Vec::new();
    while let Some(event) = rx.recv().await {
        received.push(event);
        if received.len() == expected.len() {
            break;
        }
    }
    assert_eq!(received, expected);
    assert!(rx.try_recv().is_err());
}
