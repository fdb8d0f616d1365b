//! [PreferenceEngine] wires the managers to one shared [GraphStore] and exposes the lifecycle hooks
//! an owning application calls when rankers and items come and go.

use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;

use crate::{
    config::EngineConfig,
    error::RankGraphError,
    knowledge::KnowledgeManager,
    preference::PreferenceManager,
    properties::{ItemId, ItemNode, NodeKind, RankerId},
    queue::ComparisonQueue,
    ranking::RankingEngine,
    store::GraphStore,
};

pub type SharedRng = Arc<Mutex<StdRng>>;

fn shared_rng(seed: Option<u64>) -> SharedRng {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Arc::new(Mutex::new(rng))
}

#[derive(Debug, Clone)]
pub struct PreferenceEngine {
    config: EngineConfig,
    store: Arc<GraphStore>,
    knowledge: KnowledgeManager,
    preferences: PreferenceManager,
    queue: ComparisonQueue,
    ranking: RankingEngine,
}

impl PreferenceEngine {
    pub fn new(config: EngineConfig, store: Arc<GraphStore>) -> Result<Self, RankGraphError> {
        config.validate()?;
        let rng = shared_rng(config.rng_seed);
        Ok(PreferenceEngine {
            knowledge: KnowledgeManager::new(
                store.clone(),
                rng.clone(),
                config.undefined_items_limit,
            ),
            preferences: PreferenceManager::new(store.clone()),
            queue: ComparisonQueue::new(
                store.clone(),
                rng,
                config.populate_batch,
                config.random_sample_limit,
            ),
            ranking: RankingEngine::new(store.clone()),
            config,
            store,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn knowledge(&self) -> &KnowledgeManager {
        &self.knowledge
    }

    pub fn preferences(&self) -> &PreferenceManager {
        &self.preferences
    }

    pub fn queue(&self) -> &ComparisonQueue {
        &self.queue
    }

    pub fn ranking(&self) -> &RankingEngine {
        &self.ranking
    }

    pub fn on_ranker_created(&self, ranker: &RankerId) -> Result<(), RankGraphError> {
        tracing::info!("[PreferenceEngine::on_ranker_created] {ranker}");
        self.store.create_node(NodeKind::Ranker, ranker.as_str())
    }

    /// Drops the ranker along with its knowledge, preferences and pending comparisons.
    pub fn on_ranker_deleted(&self, ranker: &RankerId) -> Result<(), RankGraphError> {
        tracing::info!("[PreferenceEngine::on_ranker_deleted] {ranker}");
        self.store.remove_node(NodeKind::Ranker, ranker.as_str())
    }

    pub fn on_item_created(&self, item: &ItemId) -> Result<(), RankGraphError> {
        self.store.create_item(ItemNode::new(item.clone()))
    }

    pub fn on_item_created_with_labels<I, S>(
        &self,
        item: &ItemId,
        labels: I,
    ) -> Result<(), RankGraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store
            .create_item(ItemNode::with_labels(item.clone(), labels))
    }

    /// Removes the item and every edge touching it, for every ranker.
    pub fn on_item_deleted(&self, item: &ItemId) -> Result<(), RankGraphError> {
        tracing::info!("[PreferenceEngine::on_item_deleted] {item}");
        self.store.remove_node(NodeKind::Item, item.as_str())
    }
}
