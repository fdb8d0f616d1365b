//! The comparison queue: pending pairs a ranker has yet to judge.
//!
//! A pair is eligible for the queue only while neither item reaches the other through the ranker's
//! PREFERRED_TO or PENDING_COMPARE edges. Counting pending edges as connections keeps the queue free
//! of comparisons whose answer might already follow once an earlier queued pair is resolved.

use rand::{seq::SliceRandom, Rng};
use std::{collections::BTreeMap, sync::Arc};

use crate::{
    engine::SharedRng,
    error::RankGraphError,
    event::GraphEvent,
    properties::{CompareOutcome, EdgeKind, ItemId, ItemPair, NodeKind, RankerId, RejectReason},
    store::GraphStore,
};

#[derive(Debug, Clone)]
pub struct ComparisonQueue {
    store: Arc<GraphStore>,
    rng: SharedRng,
    populate_batch: usize,
    random_sample_limit: usize,
}

impl ComparisonQueue {
    pub fn new(
        store: Arc<GraphStore>,
        rng: SharedRng,
        populate_batch: usize,
        random_sample_limit: usize,
    ) -> Self {
        ComparisonQueue {
            store,
            rng,
            populate_batch,
            random_sample_limit,
        }
    }

    /// Queue a comparison between `left` and `right` unless they are the same item, one is not
    /// known to the ranker, or the pair is already connected in either direction.
    pub fn insert_queued_compare(
        &self,
        ranker: &RankerId,
        left: &ItemId,
        right: &ItemId,
    ) -> Result<CompareOutcome, RankGraphError> {
        if left == right {
            return Ok(CompareOutcome::Rejected(RejectReason::Reflexive));
        }
        self.store.write_ranker(ranker, |txn| {
            txn.require_items([left, right])?;
            let graph = txn.graph();
            if !graph.knows(left) || !graph.knows(right) {
                return Ok(CompareOutcome::Rejected(RejectReason::UnknownItem));
            }
            let pair = [left.clone(), right.clone()];
            let related = EdgeKind::item_relations();
            if graph.path_exists(&pair[..1], &pair[1..], related)
                || graph.path_exists(&pair[1..], &pair[..1], related)
            {
                return Ok(CompareOutcome::Rejected(RejectReason::AlreadyRelated));
            }
            txn.graph_mut()
                .add_edge(EdgeKind::PendingCompare, left, right);
            let pair = ItemPair::new(left.clone(), right.clone());
            tracing::debug!("[ComparisonQueue::insert_queued_compare] ranker {ranker}: queued {pair}");
            txn.emit(GraphEvent::CompareQueued(ranker.clone(), pair));
            Ok(CompareOutcome::Queued)
        })
    }

    /// Queue each pair in its own transaction. Returns how many were queued.
    pub fn insert_queued_compares(
        &self,
        ranker: &RankerId,
        pairs: &[(ItemId, ItemId)],
    ) -> Result<usize, RankGraphError> {
        if !self.store.contains_node(NodeKind::Ranker, ranker.as_str()) {
            return Err(RankGraphError::NotFound(format!("ranker {ranker}")));
        }
        let mut queued = 0;
        for (left, right) in pairs {
            match self.insert_queued_compare(ranker, left, right) {
                Ok(outcome) if outcome.is_queued() => queued += 1,
                Ok(_) => {}
                Err(RankGraphError::NotFound(msg)) => {
                    tracing::warn!(
                        "[ComparisonQueue::insert_queued_compares] ranker {ranker}: skipping {left}, {right}: {msg}"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(queued)
    }

    /// Up to `limit` known item pairs that are not yet connected in either direction, in random
    /// order. `None` uses the configured sample limit.
    pub fn random_possible_queued_compares(
        &self,
        ranker: &RankerId,
        limit: Option<usize>,
    ) -> Result<Vec<ItemPair>, RankGraphError> {
        let mut candidates = self.store.read_ranker(ranker, |graph, _| {
            let related = EdgeKind::item_relations();
            let reach = graph
                .known()
                .iter()
                .map(|item| (item, graph.reachable(item, related)))
                .collect::<BTreeMap<_, _>>();
            let mut candidates = Vec::new();
            for (i, (low, low_reach)) in reach.iter().enumerate() {
                for (high, high_reach) in reach.iter().skip(i + 1) {
                    if !low_reach.contains(*high) && !high_reach.contains(*low) {
                        candidates.push(ItemPair::new((*low).clone(), (*high).clone()));
                    }
                }
            }
            candidates
        })?;
        candidates.shuffle(&mut *self.rng.lock());
        candidates.truncate(limit.unwrap_or(self.random_sample_limit));
        Ok(candidates)
    }

    /// Fill the queue with up to `max_created` new pending comparisons. Stops early once no eligible
    /// pair remains. Returns how many were created.
    pub fn populate_queued_compares(
        &self,
        ranker: &RankerId,
        max_created: Option<usize>,
    ) -> Result<usize, RankGraphError> {
        let max_created = max_created.unwrap_or(self.populate_batch);
        let mut created = 0;
        while created < max_created {
            let sample = self.random_possible_queued_compares(ranker, Some(max_created - created))?;
            if sample.is_empty() {
                break;
            }
            let before = created;
            for pair in sample {
                if self
                    .insert_queued_compare(ranker, pair.low(), pair.high())?
                    .is_queued()
                {
                    created += 1;
                }
            }
            if created == before {
                break;
            }
        }
        tracing::debug!(
            "[ComparisonQueue::populate_queued_compares] ranker {ranker}: created {created} pending comparisons"
        );
        Ok(created)
    }

    /// Pending comparisons in random order, each pair presented in a random orientation. `None`
    /// lists them all.
    pub fn list_queued_compares(
        &self,
        ranker: &RankerId,
        limit: Option<usize>,
    ) -> Result<Vec<(ItemId, ItemId)>, RankGraphError> {
        let mut pairs = self.store.read_ranker(ranker, |graph, _| graph.pending_pairs())?;
        let mut rng = self.rng.lock();
        pairs.shuffle(&mut *rng);
        if let Some(limit) = limit {
            pairs.truncate(limit);
        }
        Ok(pairs
            .into_iter()
            .map(|pair| {
                let (low, high) = pair.into_tuple();
                if rng.gen_bool(0.5) {
                    (low, high)
                } else {
                    (high, low)
                }
            })
            .collect())
    }

    /// Delete every pending comparison of the ranker. Returns how many were removed.
    pub fn clear_queued_compares(&self, ranker: &RankerId) -> Result<usize, RankGraphError> {
        self.store.write_ranker(ranker, |txn| {
            let cleared = txn.graph_mut().clear_pending().len();
            txn.emit(GraphEvent::ComparesCleared(ranker.clone(), cleared));
            Ok(cleared)
        })
    }

    /// Clear the queue, repopulate it, and list the result.
    pub fn reset_queued_compares(
        &self,
        ranker: &RankerId,
        max_created: Option<usize>,
    ) -> Result<Vec<(ItemId, ItemId)>, RankGraphError> {
        self.clear_queued_compares(ranker)?;
        self.populate_queued_compares(ranker, max_created)?;
        self.list_queued_compares(ranker, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::movie_night;
    use test_log::test;

    #[test]
    fn test_incomparable_pair_is_queued_once() {
        let engine = movie_night();
        let queue = engine.queue();
        let ranker = RankerId::from("123");
        let [b, c] = [ItemId::from("B"), ItemId::from("C")];

        assert_eq!(
            queue.insert_queued_compare(&ranker, &b, &c).unwrap(),
            CompareOutcome::Queued
        );
        assert_eq!(
            queue.insert_queued_compare(&ranker, &c, &b).unwrap(),
            CompareOutcome::Rejected(RejectReason::AlreadyRelated)
        );
        assert_eq!(queue.list_queued_compares(&ranker, None).unwrap().len(), 1);
    }

    #[test]
    fn test_ordered_pairs_are_rejected() {
        let engine = movie_night();
        let queue = engine.queue();
        let ranker = RankerId::from("123");

        // A > B > E transitively.
        assert_eq!(
            queue
                .insert_queued_compare(&ranker, &"E".into(), &"A".into())
                .unwrap(),
            CompareOutcome::Rejected(RejectReason::AlreadyRelated)
        );
        assert_eq!(
            queue
                .insert_queued_compare(&ranker, &"A".into(), &"A".into())
                .unwrap(),
            CompareOutcome::Rejected(RejectReason::Reflexive)
        );
    }

    #[test]
    fn test_pending_edges_block_connected_pairs() {
        let engine = movie_night();
        let queue = engine.queue();
        let ranker = RankerId::from("123");

        // With B ~ C pending, D reaches B through D ~ C ~ B once D ~ C is queued.
        queue
            .insert_queued_compare(&ranker, &"B".into(), &"C".into())
            .unwrap();
        queue
            .insert_queued_compare(&ranker, &"D".into(), &"C".into())
            .unwrap();
        assert_eq!(
            queue
                .insert_queued_compare(&ranker, &"B".into(), &"D".into())
                .unwrap(),
            CompareOutcome::Rejected(RejectReason::AlreadyRelated)
        );
    }

    #[test]
    fn test_random_possible_pairs_are_unrelated() {
        let engine = movie_night();
        let queue = engine.queue();
        let ranker = RankerId::from("123");

        let mut pairs = queue
            .random_possible_queued_compares(&ranker, None)
            .unwrap();
        pairs.sort();
        let expected = [("B", "C"), ("B", "D"), ("C", "D"), ("D", "E")]
            .into_iter()
            .map(|(a, b)| ItemPair::new(a.into(), b.into()))
            .collect::<Vec<_>>();
        assert_eq!(pairs, expected);
        assert_eq!(
            queue
                .random_possible_queued_compares(&ranker, Some(2))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_populate_stops_when_nothing_is_eligible() {
        let engine = movie_night();
        let queue = engine.queue();
        let ranker = RankerId::from("123");

        let created = queue.populate_queued_compares(&ranker, None).unwrap();
        assert!(created >= 1);
        assert!(queue
            .random_possible_queued_compares(&ranker, None)
            .unwrap()
            .is_empty());
        assert_eq!(queue.populate_queued_compares(&ranker, None).unwrap(), 0);
        assert!(engine.store().built_in_test().is_empty());
    }

    #[test]
    fn test_populate_respects_cap() {
        let engine = movie_night();
        let queue = engine.queue();
        let ranker = RankerId::from("123");
        assert_eq!(queue.populate_queued_compares(&ranker, Some(1)).unwrap(), 1);
        assert_eq!(queue.list_queued_compares(&ranker, None).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_and_reset() {
        let engine = movie_night();
        let queue = engine.queue();
        let ranker = RankerId::from("123");

        queue.populate_queued_compares(&ranker, None).unwrap();
        let pending = queue.list_queued_compares(&ranker, None).unwrap().len();
        assert_eq!(queue.clear_queued_compares(&ranker).unwrap(), pending);
        assert!(queue.list_queued_compares(&ranker, None).unwrap().is_empty());

        let listed = queue.reset_queued_compares(&ranker, None).unwrap();
        assert!(!listed.is_empty());
        for (left, right) in listed {
            assert!(!engine
                .preferences()
                .preference_exists(&ranker, &left, &right)
                .unwrap());
        }
    }

    #[test]
    fn test_batch_queue_counts_only_queued() {
        let engine = movie_night();
        let queue = engine.queue();
        let ranker = RankerId::from("123");
        let queued = queue
            .insert_queued_compares(
                &ranker,
                &[
                    ("B".into(), "C".into()),
                    ("A".into(), "E".into()),
                    ("B".into(), "missing".into()),
                ],
            )
            .unwrap();
        assert_eq!(queued, 1);
    }
}
