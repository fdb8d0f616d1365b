//! The shared property graph every manager operates on.
//!
//! A [GraphStore] holds the item registry plus one independently locked [RankerGraph] per ranker.
//! All reads and writes against a ranker's tagged subgraph go through [GraphStore::read_ranker] and
//! [GraphStore::write_ranker], which take locks in a fixed order: ranker registry, then items, then
//! the ranker graph.

use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    error::RankGraphError,
    event::GraphEvent,
    properties::{ItemId, ItemNode, NodeKind, RankerId},
    query::ItemPred,
};

mod graph;
mod snapshot;

pub use graph::{ItemGraph, ItemRelation, ItemSubGraph, RankerGraph};
pub use snapshot::{RankerSnapshot, StoreSnapshot};

pub type ItemRegistry = BTreeMap<ItemId, ItemNode>;
type RankerRegistry = BTreeMap<RankerId, Arc<RwLock<RankerGraph>>>;

/// Mutable access to one ranker's subgraph for the duration of a [GraphStore::write_ranker] call.
/// Events pushed with [RankerTxn::emit] are published only if the closure returns `Ok`.
pub struct RankerTxn<'a> {
    graph: &'a mut RankerGraph,
    items: &'a ItemRegistry,
    events: Vec<GraphEvent>,
}

impl<'a> RankerTxn<'a> {
    pub fn ranker(&self) -> &RankerId {
        self.graph.ranker()
    }

    pub fn graph(&self) -> &RankerGraph {
        self.graph
    }

    pub fn graph_mut(&mut self) -> &mut RankerGraph {
        self.graph
    }

    pub fn items(&self) -> &ItemRegistry {
        self.items
    }

    pub fn item(&self, id: &ItemId) -> Result<&ItemNode, RankGraphError> {
        lookup_item(self.items, id)
    }

    /// Validate that every id names a registered item.
    pub fn require_items<'b, I>(&self, ids: I) -> Result<(), RankGraphError>
    where
        I: IntoIterator<Item = &'b ItemId>,
    {
        for id in ids {
            self.item(id)?;
        }
        Ok(())
    }

    pub fn emit(&mut self, event: GraphEvent) {
        self.events.push(event);
    }
}

pub(crate) fn lookup_item<'a>(
    items: &'a ItemRegistry,
    id: &ItemId,
) -> Result<&'a ItemNode, RankGraphError> {
    items
        .get(id)
        .ok_or_else(|| RankGraphError::NotFound(format!("item {id}")))
}

#[derive(Debug, Default)]
pub struct GraphStore {
    rankers: RwLock<RankerRegistry>,
    items: RwLock<ItemRegistry>,
    tx: Option<UnboundedSender<GraphEvent>>,
}

impl GraphStore {
    pub fn new() -> Self {
        GraphStore::default()
    }

    /// Publish one [GraphEvent] per committed mutation on `tx`.
    pub fn with_event_sender(mut self, tx: UnboundedSender<GraphEvent>) -> Self {
        self.tx = Some(tx);
        self
    }

    fn publish(&self, events: Vec<GraphEvent>) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        for event in events {
            if let Err(err) = tx.send(event).map_err(RankGraphError::from) {
                tracing::warn!("[GraphStore::publish] {err}");
                break;
            }
        }
    }

    fn ranker_lock<'a>(
        rankers: &'a RankerRegistry,
        ranker: &RankerId,
    ) -> Result<&'a Arc<RwLock<RankerGraph>>, RankGraphError> {
        rankers
            .get(ranker)
            .ok_or_else(|| RankGraphError::NotFound(format!("ranker {ranker}")))
    }

    /// Create-only. Returns [RankGraphError::ConstraintViolation] if the id is taken.
    pub fn create_node(&self, kind: NodeKind, id: &str) -> Result<(), RankGraphError> {
        match kind {
            NodeKind::Ranker => {
                let ranker = RankerId::from(id);
                {
                    let mut rankers = self.rankers.write();
                    if rankers.contains_key(&ranker) {
                        return Err(RankGraphError::ConstraintViolation(format!(
                            "ranker {ranker} already exists"
                        )));
                    }
                    rankers.insert(
                        ranker.clone(),
                        Arc::new(RwLock::new(RankerGraph::new(ranker))),
                    );
                }
                self.publish(vec![GraphEvent::NodeCreated(kind, id.to_string())]);
                Ok(())
            }
            NodeKind::Item => self.create_item(ItemNode::new(ItemId::from(id))),
        }
    }

    pub fn create_item(&self, node: ItemNode) -> Result<(), RankGraphError> {
        let id = node.id.clone();
        {
            let mut items = self.items.write();
            if items.contains_key(&id) {
                return Err(RankGraphError::ConstraintViolation(format!(
                    "item {id} already exists"
                )));
            }
            items.insert(id.clone(), node);
        }
        self.publish(vec![GraphEvent::NodeCreated(NodeKind::Item, id.to_string())]);
        Ok(())
    }

    /// Create-or-noop. Returns whether a node was created.
    pub fn upsert_node(&self, kind: NodeKind, id: &str) -> bool {
        match kind {
            NodeKind::Ranker => self.create_node(kind, id).is_ok(),
            NodeKind::Item => self.upsert_item(ItemNode::new(ItemId::from(id))),
        }
    }

    /// Create-or-merge: an existing item gains any new labels. Returns whether a node was created.
    pub fn upsert_item(&self, node: ItemNode) -> bool {
        let id = node.id.clone();
        {
            let mut items = self.items.write();
            if let Some(existing) = items.get_mut(&id) {
                existing.labels.extend(node.labels);
                return false;
            }
            items.insert(id.clone(), node);
        }
        self.publish(vec![GraphEvent::NodeCreated(NodeKind::Item, id.to_string())]);
        true
    }

    /// Remove a node and every edge touching it. Removing an item detaches it from every ranker's
    /// subgraph.
    pub fn remove_node(&self, kind: NodeKind, id: &str) -> Result<(), RankGraphError> {
        match kind {
            NodeKind::Ranker => {
                let removed = self.rankers.write().remove(&RankerId::from(id));
                if removed.is_none() {
                    return Err(RankGraphError::NotFound(format!("ranker {id}")));
                }
            }
            NodeKind::Item => {
                let item = ItemId::from(id);
                let rankers = self.rankers.read();
                let mut items = self.items.write();
                if items.remove(&item).is_none() {
                    return Err(RankGraphError::NotFound(format!("item {id}")));
                }
                for graph_lock in rankers.values() {
                    let mut graph = graph_lock.write();
                    let detached = graph.forget_item(&item);
                    if !detached.is_empty() {
                        tracing::debug!(
                            "[GraphStore::remove_node] item {item} removed {} relations from ranker {}",
                            detached.len(),
                            graph.ranker()
                        );
                    }
                }
            }
        }
        self.publish(vec![GraphEvent::NodeRemoved(kind, id.to_string())]);
        Ok(())
    }

    pub fn contains_node(&self, kind: NodeKind, id: &str) -> bool {
        match kind {
            NodeKind::Ranker => self.rankers.read().contains_key(id),
            NodeKind::Item => self.items.read().contains_key(id),
        }
    }

    pub fn ranker_ids(&self) -> Vec<RankerId> {
        self.rankers.read().keys().cloned().collect()
    }

    pub fn item(&self, id: &ItemId) -> Option<ItemNode> {
        self.items.read().get(id).cloned()
    }

    pub fn items(&self, pred: &ItemPred) -> Vec<ItemNode> {
        self.items
            .read()
            .values()
            .filter(|node| pred.match_item(node))
            .cloned()
            .collect()
    }

    /// Run `f` against one ranker's subgraph under its read lock.
    pub fn read_ranker<T, F>(&self, ranker: &RankerId, f: F) -> Result<T, RankGraphError>
    where
        F: FnOnce(&RankerGraph, &ItemRegistry) -> T,
    {
        let rankers = self.rankers.read();
        let graph_lock = GraphStore::ranker_lock(&rankers, ranker)?;
        let items = self.items.read();
        let graph = graph_lock.read();
        Ok(f(&*graph, &*items))
    }

    /// Run `f` against one ranker's subgraph under its write lock. `f` must validate before it
    /// mutates: an `Err` return discards the pending events but cannot roll back mutations.
    ///
    /// The registry read lock is held until the events are published, so a concurrent removal of
    /// the ranker is ordered entirely before or after the call.
    pub fn write_ranker<T, F>(&self, ranker: &RankerId, f: F) -> Result<T, RankGraphError>
    where
        F: FnOnce(&mut RankerTxn<'_>) -> Result<T, RankGraphError>,
    {
        let rankers = self.rankers.read();
        let graph_lock = GraphStore::ranker_lock(&rankers, ranker)?;
        let items = self.items.read();
        let mut graph = graph_lock.write();
        let mut txn = RankerTxn {
            graph: &mut *graph,
            items: &*items,
            events: Vec::new(),
        };
        let result = f(&mut txn);
        let events = txn.events;
        drop(graph);
        drop(items);
        if result.is_ok() {
            self.publish(events);
        }
        drop(rankers);
        result
    }

    /// Check every ranker subgraph's invariants, plus that every edge endpoint is a registered
    /// item.
    ///
    /// Caution! This walks every subgraph.
    pub fn built_in_test(&self) -> Vec<String> {
        let rankers = self.rankers.read();
        let items = self.items.read();
        let mut errors = Vec::new();
        for graph_lock in rankers.values() {
            let graph = graph_lock.read();
            errors.extend(graph.built_in_test());
            for item in graph.known().iter().chain(graph.unknown().iter()) {
                if !items.contains_key(item) {
                    errors.push(format!(
                        "[GraphStore::built_in_test] ranker {} references missing item {item}",
                        graph.ranker()
                    ));
                }
            }
        }
        errors
    }
}
