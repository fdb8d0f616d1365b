use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    properties::{EdgeKind, ItemId, ItemPair, KnowsState, NodeKind, RankerId},
    store::ItemRelation,
};

/// One committed mutation of the graph store. Events are sent after the owning call releases its
/// locks, and never for a call that returned an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphEvent {
    /// Kind, id
    NodeCreated(NodeKind, String),
    /// Kind, id. Removing a node removes every edge touching it.
    NodeRemoved(NodeKind, String),
    /// Ranker, items, new state
    KnowledgeChanged(RankerId, Vec<ItemId>, KnowsState),
    /// Ranker, preferred, nonpreferred
    PreferenceInserted(RankerId, ItemId, ItemId),
    /// Ranker, preferred, nonpreferred
    PreferenceRemoved(RankerId, ItemId, ItemId),
    /// Ranker, pair
    CompareQueued(RankerId, ItemPair),
    /// Ranker, pair resolved or invalidated
    CompareRemoved(RankerId, ItemPair),
    /// Ranker, number of pending pairs dropped
    ComparesCleared(RankerId, usize),
}

impl GraphEvent {
    pub fn relation_removed(ranker: &RankerId, rel: &ItemRelation) -> GraphEvent {
        match rel.kind {
            EdgeKind::PendingCompare => GraphEvent::CompareRemoved(
                ranker.clone(),
                ItemPair::new(rel.source.clone(), rel.sink.clone()),
            ),
            _ => GraphEvent::PreferenceRemoved(ranker.clone(), rel.source.clone(), rel.sink.clone()),
        }
    }

    /// The ranker whose tagged subgraph changed, if the event is ranker scoped.
    pub fn ranker(&self) -> Option<&RankerId> {
        match self {
            GraphEvent::NodeCreated(_, _) | GraphEvent::NodeRemoved(_, _) => None,
            GraphEvent::KnowledgeChanged(ranker, _, _)
            | GraphEvent::PreferenceInserted(ranker, _, _)
            | GraphEvent::PreferenceRemoved(ranker, _, _)
            | GraphEvent::CompareQueued(ranker, _)
            | GraphEvent::CompareRemoved(ranker, _)
            | GraphEvent::ComparesCleared(ranker, _) => Some(ranker),
        }
    }
}

impl Display for GraphEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            GraphEvent::NodeCreated(kind, id) => write!(f, "NodeCreated({kind} {id})"),
            GraphEvent::NodeRemoved(kind, id) => write!(f, "NodeRemoved({kind} {id})"),
            GraphEvent::KnowledgeChanged(ranker, items, state) => {
                write!(f, "KnowledgeChanged({ranker}: {} items {state})", items.len())
            }
            GraphEvent::PreferenceInserted(ranker, a, b) => {
                write!(f, "PreferenceInserted({ranker}: {a} > {b})")
            }
            GraphEvent::PreferenceRemoved(ranker, a, b) => {
                write!(f, "PreferenceRemoved({ranker}: {a} > {b})")
            }
            GraphEvent::CompareQueued(ranker, pair) => write!(f, "CompareQueued({ranker}: {pair})"),
            GraphEvent::CompareRemoved(ranker, pair) => {
                write!(f, "CompareRemoved({ranker}: {pair})")
            }
            GraphEvent::ComparesCleared(ranker, count) => {
                write!(f, "ComparesCleared({ranker}: {count})")
            }
        }
    }
}
