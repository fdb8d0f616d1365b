use std::{cmp::Reverse, sync::Arc};

use crate::{
    error::RankGraphError,
    properties::{EdgeKind, ItemId, RankerId},
    store::GraphStore,
};

/// Derives a total order over a ranker's known items from its preference DAG.
///
/// Each item is weighted by how many distinct items it is preferred over, directly or
/// transitively. If `a` reaches `b` then everything `b` reaches is also reachable from `a`, and the
/// DAG rules out `b` reaching `a`, so `a` strictly outweighs `b`: sorting by weight always respects
/// the partial order.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    store: Arc<GraphStore>,
}

impl RankingEngine {
    pub fn new(store: Arc<GraphStore>) -> Self {
        RankingEngine { store }
    }

    /// `(item, weight)` for every known item (restricted to `label` if given), heaviest first.
    /// Equal weights are ordered by ascending item id.
    pub fn preference_weights(
        &self,
        ranker: &RankerId,
        label: Option<&str>,
    ) -> Result<Vec<(ItemId, usize)>, RankGraphError> {
        let mut weights = self.store.read_ranker(ranker, |graph, items| {
            graph
                .known()
                .iter()
                .filter(|id| items.get(*id).is_some_and(|node| node.matches_label(label)))
                .map(|id| {
                    let weight = graph.reachable(id, EdgeKind::PreferredTo.into()).len();
                    (id.clone(), weight)
                })
                .collect::<Vec<_>>()
        })?;
        weights.sort_by(|(a_id, a_weight), (b_id, b_weight)| {
            (Reverse(a_weight), a_id).cmp(&(Reverse(b_weight), b_id))
        });
        Ok(weights)
    }

    pub fn topological_sort(
        &self,
        ranker: &RankerId,
        label: Option<&str>,
    ) -> Result<Vec<ItemId>, RankGraphError> {
        Ok(self
            .preference_weights(ranker, label)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }
}
