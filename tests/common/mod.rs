//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use rankgraph::{
    config::EngineConfig,
    engine::PreferenceEngine,
    properties::{ItemId, ItemNode, RankerId},
    store::GraphStore,
};
use std::sync::Arc;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[allow(dead_code)]
pub fn ids(names: &[&str]) -> Vec<ItemId> {
    names.iter().map(|name| ItemId::from(*name)).collect()
}

/// Engine with a fixed rng seed over the given store.
#[allow(dead_code)]
pub fn engine_over(store: GraphStore) -> PreferenceEngine {
    let config = EngineConfig {
        rng_seed: Some(1234),
        ..Default::default()
    };
    PreferenceEngine::new(config, Arc::new(store)).unwrap()
}

/// Register `ranker` if needed, register any missing items, and mark them all known.
#[allow(dead_code)]
pub fn register(engine: &PreferenceEngine, ranker: &str, names: &[&str]) {
    let ranker = RankerId::from(ranker);
    if engine.on_ranker_created(&ranker).is_err() {
        tracing::debug!("ranker {ranker} already registered");
    }
    let items = ids(names);
    for item in items.iter() {
        engine.store().upsert_item(ItemNode::new(item.clone()));
    }
    engine.knowledge().set_known(&ranker, &items).unwrap();
}

/// Ranker `123` knows A through E and prefers A > B, A > C, A > D, B > E and C > E.
#[allow(dead_code)]
pub fn movie_night(store: GraphStore) -> PreferenceEngine {
    let engine = engine_over(store);
    register(&engine, "123", &["A", "B", "C", "D", "E"]);
    let pairs = [("A", "B"), ("A", "C"), ("A", "D"), ("B", "E"), ("C", "E")]
        .into_iter()
        .map(|(a, b)| (ItemId::from(a), ItemId::from(b)))
        .collect::<Vec<_>>();
    let warnings = engine
        .preferences()
        .insert_preferences(&"123".into(), &pairs)
        .unwrap();
    assert!(warnings.is_empty(), "{warnings:?}");
    engine
}
