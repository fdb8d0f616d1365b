//! Which items a ranker knows.
//!
//! Knowledge gates everything else: preferences and pending comparisons may only exist between
//! items the ranker KNOWS. Moving an item to DOES_NOT_KNOW (or revoking knowledge altogether) purges
//! the ranker's relations touching that item.

use rand::seq::SliceRandom;
use std::sync::Arc;

use crate::{
    engine::SharedRng,
    error::RankGraphError,
    event::GraphEvent,
    properties::{EdgeKind, ItemId, KnowsState, RankerId},
    store::{lookup_item, GraphStore, ItemRegistry, RankerGraph, RankerTxn},
};

#[derive(Debug, Clone)]
pub struct KnowledgeManager {
    store: Arc<GraphStore>,
    rng: SharedRng,
    undefined_items_limit: usize,
}

fn label_filtered<'a, I>(items: I, registry: &ItemRegistry, label: Option<&str>) -> Vec<ItemId>
where
    I: IntoIterator<Item = &'a ItemId>,
{
    items
        .into_iter()
        .filter(|id| {
            registry
                .get(*id)
                .is_some_and(|node| node.matches_label(label))
        })
        .cloned()
        .collect()
}

fn purge_relations(txn: &mut RankerTxn<'_>, item: &ItemId) {
    let ranker = txn.ranker().clone();
    let detached = txn.graph_mut().detach_item(item);
    for rel in detached {
        txn.emit(GraphEvent::relation_removed(&ranker, &rel));
    }
}

impl KnowledgeManager {
    pub fn new(store: Arc<GraphStore>, rng: SharedRng, undefined_items_limit: usize) -> Self {
        KnowledgeManager {
            store,
            rng,
            undefined_items_limit,
        }
    }

    /// Mark every item as known. All-or-nothing: any unregistered item fails the whole call before
    /// anything changes.
    pub fn set_known(&self, ranker: &RankerId, items: &[ItemId]) -> Result<(), RankGraphError> {
        self.store.write_ranker(ranker, |txn| {
            txn.require_items(items)?;
            let graph = txn.graph_mut();
            for item in items {
                graph.remove_knowledge(EdgeKind::DoesNotKnow, item);
                graph.add_knowledge(EdgeKind::Knows, item);
            }
            tracing::debug!(
                "[KnowledgeManager::set_known] ranker {ranker} knows {} items",
                items.len()
            );
            txn.emit(GraphEvent::KnowledgeChanged(
                ranker.clone(),
                items.to_vec(),
                KnowsState::Known,
            ));
            Ok(())
        })
    }

    /// Mark every item as not known, deleting the ranker's preferences and pending comparisons that
    /// touch any of them.
    pub fn set_unknown(&self, ranker: &RankerId, items: &[ItemId]) -> Result<(), RankGraphError> {
        self.store.write_ranker(ranker, |txn| {
            txn.require_items(items)?;
            for item in items {
                purge_relations(txn, item);
                let graph = txn.graph_mut();
                graph.remove_knowledge(EdgeKind::Knows, item);
                graph.add_knowledge(EdgeKind::DoesNotKnow, item);
            }
            tracing::debug!(
                "[KnowledgeManager::set_unknown] ranker {ranker} does not know {} items",
                items.len()
            );
            txn.emit(GraphEvent::KnowledgeChanged(
                ranker.clone(),
                items.to_vec(),
                KnowsState::Unknown,
            ));
            Ok(())
        })
    }

    /// Forget both KNOWS and DOES_NOT_KNOW for the item, along with every relation touching it.
    /// Returns the state the item was in before.
    pub fn revoke_knowledge(
        &self,
        ranker: &RankerId,
        item: &ItemId,
    ) -> Result<KnowsState, RankGraphError> {
        self.store.write_ranker(ranker, |txn| {
            txn.item(item)?;
            let previous = txn.graph().knows_state(item);
            if previous == KnowsState::Undefined {
                return Ok(previous);
            }
            purge_relations(txn, item);
            let graph = txn.graph_mut();
            graph.remove_knowledge(EdgeKind::Knows, item);
            graph.remove_knowledge(EdgeKind::DoesNotKnow, item);
            txn.emit(GraphEvent::KnowledgeChanged(
                ranker.clone(),
                vec![item.clone()],
                KnowsState::Undefined,
            ));
            Ok(previous)
        })
    }

    fn read_state<T, F>(&self, ranker: &RankerId, item: &ItemId, f: F) -> Result<T, RankGraphError>
    where
        F: FnOnce(&RankerGraph) -> T,
    {
        self.store
            .read_ranker(ranker, |graph, items| lookup_item(items, item).map(|_| f(graph)))?
    }

    pub fn knows(&self, ranker: &RankerId, item: &ItemId) -> Result<bool, RankGraphError> {
        self.read_state(ranker, item, |graph| graph.knows(item))
    }

    pub fn does_not_know(&self, ranker: &RankerId, item: &ItemId) -> Result<bool, RankGraphError> {
        self.read_state(ranker, item, |graph| graph.does_not_know(item))
    }

    pub fn knows_state(&self, ranker: &RankerId, item: &ItemId) -> Result<KnowsState, RankGraphError> {
        self.read_state(ranker, item, |graph| graph.knows_state(item))
    }

    pub fn known_items(
        &self,
        ranker: &RankerId,
        label: Option<&str>,
    ) -> Result<Vec<ItemId>, RankGraphError> {
        self.store
            .read_ranker(ranker, |graph, items| label_filtered(graph.known(), items, label))
    }

    pub fn unknown_items(
        &self,
        ranker: &RankerId,
        label: Option<&str>,
    ) -> Result<Vec<ItemId>, RankGraphError> {
        self.store
            .read_ranker(ranker, |graph, items| label_filtered(graph.unknown(), items, label))
    }

    /// A random sample of up to `limit` items the ranker has neither known nor disclaimed. `None`
    /// uses the configured default limit.
    pub fn list_undefined_items(
        &self,
        ranker: &RankerId,
        label: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<ItemId>, RankGraphError> {
        let candidates = self.store.read_ranker(ranker, |graph, items| {
            items
                .values()
                .filter(|node| node.matches_label(label))
                .filter(|node| graph.knows_state(&node.id) == KnowsState::Undefined)
                .map(|node| node.id.clone())
                .collect::<Vec<_>>()
        })?;
        let limit = limit.unwrap_or(self.undefined_items_limit);
        let mut rng = self.rng.lock();
        Ok(candidates
            .choose_multiple(&mut *rng, limit)
            .cloned()
            .collect())
    }
}
