//! Shared test utilities for engine testing

use crate::{
    config::EngineConfig,
    engine::PreferenceEngine,
    properties::{ItemId, RankerId},
    store::GraphStore,
};
use std::sync::Arc;

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn ids(names: &[&str]) -> Vec<ItemId> {
    names.iter().map(|name| ItemId::from(*name)).collect()
}

/// An engine over an empty store with a fixed rng seed.
pub fn seeded_engine() -> PreferenceEngine {
    init_logging();
    let config = EngineConfig {
        rng_seed: Some(7),
        ..Default::default()
    };
    PreferenceEngine::new(config, Arc::new(GraphStore::new())).unwrap()
}

/// Ranker `123` knows items A through E and prefers A > B, A > C, A > D, B > E and C > E.
pub fn movie_night() -> PreferenceEngine {
    let engine = seeded_engine();
    let ranker = RankerId::from("123");
    engine.on_ranker_created(&ranker).unwrap();
    let items = ids(&["A", "B", "C", "D", "E"]);
    for item in items.iter() {
        engine.on_item_created(item).unwrap();
    }
    engine.knowledge().set_known(&ranker, &items).unwrap();
    let warnings = engine
        .preferences()
        .insert_preferences(
            &ranker,
            &[
                ("A".into(), "B".into()),
                ("A".into(), "C".into()),
                ("A".into(), "D".into()),
                ("B".into(), "E".into()),
                ("C".into(), "E".into()),
            ],
        )
        .unwrap();
    assert!(warnings.is_empty(), "{warnings:?}");
    engine
}
