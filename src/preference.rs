//! Direct preference edges and the cycle check that guards them.

use std::sync::Arc;

use crate::{
    error::RankGraphError,
    event::GraphEvent,
    properties::{EdgeKind, InvalidReason, ItemId, NodeKind, PreferenceOutcome, RankerId},
    store::{lookup_item, GraphStore},
};

#[derive(Debug, Clone)]
pub struct PreferenceManager {
    store: Arc<GraphStore>,
}

impl PreferenceManager {
    pub fn new(store: Arc<GraphStore>) -> Self {
        PreferenceManager { store }
    }

    /// Record that `ranker` prefers `preferred` over `nonpreferred`.
    ///
    /// Rejections that are a normal part of eliciting preferences (reflexive pairs, items the ranker
    /// doesn't know, pairs whose reverse is already implied) come back as
    /// [PreferenceOutcome::Invalid]. Unregistered ranker or item ids are an error.
    ///
    /// The cycle check and the insert happen under the ranker's write lock, so concurrent inserts
    /// for one ranker can never jointly close a cycle. A successful insert resolves the pending
    /// comparison between the pair, along with any other pending pair the new edge orders.
    pub fn insert_preference(
        &self,
        ranker: &RankerId,
        preferred: &ItemId,
        nonpreferred: &ItemId,
    ) -> Result<PreferenceOutcome, RankGraphError> {
        if preferred == nonpreferred {
            tracing::debug!(
                "[PreferenceManager::insert_preference] ranker {ranker}: reflexive preference for {preferred}"
            );
            return Ok(PreferenceOutcome::Invalid(InvalidReason::Reflexive));
        }
        self.store.write_ranker(ranker, |txn| {
            txn.require_items([preferred, nonpreferred])?;
            let graph = txn.graph();
            if !graph.knows(preferred) || !graph.knows(nonpreferred) {
                return Ok(PreferenceOutcome::Invalid(InvalidReason::UnknownItem));
            }
            if graph.path_exists(
                std::slice::from_ref(nonpreferred),
                std::slice::from_ref(preferred),
                EdgeKind::PreferredTo.into(),
            ) {
                tracing::debug!(
                    "[PreferenceManager::insert_preference] ranker {ranker}: {preferred} > {nonpreferred} would close a cycle"
                );
                return Ok(PreferenceOutcome::Invalid(InvalidReason::WouldCycle));
            }
            if graph.contains_edge(EdgeKind::PreferredTo, preferred, nonpreferred) {
                return Ok(PreferenceOutcome::Exists);
            }

            let graph = txn.graph_mut();
            graph.add_edge(EdgeKind::PreferredTo, preferred, nonpreferred);
            for pair in graph.settle_pending(preferred, nonpreferred) {
                txn.emit(GraphEvent::CompareRemoved(ranker.clone(), pair));
            }
            txn.emit(GraphEvent::PreferenceInserted(
                ranker.clone(),
                preferred.clone(),
                nonpreferred.clone(),
            ));
            tracing::debug!(
                "[PreferenceManager::insert_preference] ranker {ranker}: {preferred} > {nonpreferred}"
            );
            Ok(PreferenceOutcome::Created)
        })
    }

    /// Best-effort batch insert of `(preferred, nonpreferred)` pairs. Each pair is committed on its
    /// own against the state left by the pairs before it. Returns one warning per pair that was not
    /// created.
    pub fn insert_preferences(
        &self,
        ranker: &RankerId,
        pairs: &[(ItemId, ItemId)],
    ) -> Result<Vec<String>, RankGraphError> {
        if !self.store.contains_node(NodeKind::Ranker, ranker.as_str()) {
            return Err(RankGraphError::NotFound(format!("ranker {ranker}")));
        }
        let mut warnings = Vec::new();
        for (preferred, nonpreferred) in pairs {
            match self.insert_preference(ranker, preferred, nonpreferred) {
                Ok(PreferenceOutcome::Created) => {}
                Ok(PreferenceOutcome::Exists) => {
                    warnings.push(format!("{preferred} > {nonpreferred}: preference already exists"))
                }
                Ok(PreferenceOutcome::Invalid(reason)) => {
                    warnings.push(format!("{preferred} > {nonpreferred}: {reason}"))
                }
                Err(err @ RankGraphError::NotFound(_)) => {
                    warnings.push(format!("{preferred} > {nonpreferred}: {err}"))
                }
                Err(err) => return Err(err),
            }
        }
        if !warnings.is_empty() {
            tracing::info!(
                "[PreferenceManager::insert_preferences] ranker {ranker}: {} of {} pairs not created",
                warnings.len(),
                pairs.len()
            );
        }
        Ok(warnings)
    }

    /// Every direct preference of the ranker as `(preferred, nonpreferred)`, optionally restricted
    /// to pairs where both items carry `label`.
    pub fn get_direct_preferences(
        &self,
        ranker: &RankerId,
        label: Option<&str>,
    ) -> Result<Vec<(ItemId, ItemId)>, RankGraphError> {
        self.store.read_ranker(ranker, |graph, items| {
            graph
                .preferences()
                .into_iter()
                .filter(|(preferred, nonpreferred)| {
                    [preferred, nonpreferred].into_iter().all(|id| {
                        items
                            .get(id)
                            .is_some_and(|node| node.matches_label(label))
                    })
                })
                .collect()
        })
    }

    pub fn direct_preference_exists(
        &self,
        ranker: &RankerId,
        preferred: &ItemId,
        nonpreferred: &ItemId,
    ) -> Result<bool, RankGraphError> {
        self.store.read_ranker(ranker, |graph, items| -> Result<bool, RankGraphError> {
            for id in [preferred, nonpreferred] {
                lookup_item(items, id)?;
            }
            Ok(graph.contains_edge(EdgeKind::PreferredTo, preferred, nonpreferred))
        })?
    }

    /// Whether the ranker's preferences order `preferred` above `nonpreferred`, directly or
    /// transitively.
    pub fn preference_exists(
        &self,
        ranker: &RankerId,
        preferred: &ItemId,
        nonpreferred: &ItemId,
    ) -> Result<bool, RankGraphError> {
        self.store.read_ranker(ranker, |graph, items| -> Result<bool, RankGraphError> {
            for id in [preferred, nonpreferred] {
                lookup_item(items, id)?;
            }
            Ok(graph.path_exists(
                std::slice::from_ref(preferred),
                std::slice::from_ref(nonpreferred),
                EdgeKind::PreferredTo.into(),
            ))
        })?
    }

    /// Remove the direct edge if present. Returns whether an edge was removed.
    pub fn delete_preference(
        &self,
        ranker: &RankerId,
        preferred: &ItemId,
        nonpreferred: &ItemId,
    ) -> Result<bool, RankGraphError> {
        self.store.write_ranker(ranker, |txn| {
            let removed = txn
                .graph_mut()
                .remove_edge(EdgeKind::PreferredTo, preferred, nonpreferred);
            if removed {
                txn.emit(GraphEvent::PreferenceRemoved(
                    ranker.clone(),
                    preferred.clone(),
                    nonpreferred.clone(),
                ));
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        properties::ItemPair,
        tests::helpers::{ids, movie_night, seeded_engine},
    };
    use test_log::test;

    fn pref(a: &str, b: &str) -> (ItemId, ItemId) {
        (a.into(), b.into())
    }

    #[test]
    fn test_insert_then_exists() {
        let engine = movie_night();
        let prefs = engine.preferences();
        let ranker = RankerId::from("123");
        let [d, e] = [ItemId::from("D"), ItemId::from("E")];

        assert_eq!(
            prefs.insert_preference(&ranker, &d, &e).unwrap(),
            PreferenceOutcome::Created
        );
        assert_eq!(
            prefs.insert_preference(&ranker, &d, &e).unwrap(),
            PreferenceOutcome::Exists
        );
        let count = prefs
            .get_direct_preferences(&ranker, None)
            .unwrap()
            .into_iter()
            .filter(|p| *p == pref("D", "E"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transitive_cycle_is_invalid() {
        let engine = movie_night();
        let prefs = engine.preferences();
        let ranker = RankerId::from("123");

        // A > B > E, so E > A would close a cycle.
        assert_eq!(
            prefs
                .insert_preference(&ranker, &"E".into(), &"A".into())
                .unwrap(),
            PreferenceOutcome::Invalid(InvalidReason::WouldCycle)
        );
        assert!(prefs
            .preference_exists(&ranker, &"A".into(), &"E".into())
            .unwrap());
        assert!(!prefs
            .direct_preference_exists(&ranker, &"A".into(), &"E".into())
            .unwrap());
    }

    #[test]
    fn test_reflexive_and_unknown_items_are_invalid() {
        let engine = movie_night();
        let prefs = engine.preferences();
        let ranker = RankerId::from("123");
        engine.on_item_created(&"F".into()).unwrap();

        assert_eq!(
            prefs
                .insert_preference(&ranker, &"A".into(), &"A".into())
                .unwrap(),
            PreferenceOutcome::Invalid(InvalidReason::Reflexive)
        );
        assert_eq!(
            prefs
                .insert_preference(&ranker, &"A".into(), &"F".into())
                .unwrap(),
            PreferenceOutcome::Invalid(InvalidReason::UnknownItem)
        );
        assert!(matches!(
            prefs.insert_preference(&ranker, &"A".into(), &"missing".into()),
            Err(RankGraphError::NotFound(_))
        ));
    }

    #[test]
    fn test_batch_reports_warnings_without_aborting() {
        let engine = movie_night();
        let prefs = engine.preferences();
        let ranker = RankerId::from("123");

        let warnings = prefs
            .insert_preferences(
                &ranker,
                &[
                    pref("D", "E"),
                    pref("E", "A"),
                    pref("A", "B"),
                    pref("A", "missing"),
                    pref("B", "C"),
                ],
            )
            .unwrap();
        assert_eq!(warnings.len(), 3);
        assert!(prefs
            .direct_preference_exists(&ranker, &"D".into(), &"E".into())
            .unwrap());
        assert!(prefs
            .direct_preference_exists(&ranker, &"B".into(), &"C".into())
            .unwrap());

        assert!(matches!(
            prefs.insert_preferences(&"nobody".into(), &[pref("A", "B")]),
            Err(RankGraphError::NotFound(_))
        ));
    }

    #[test]
    fn test_batch_sees_earlier_pairs() {
        let engine = movie_night();
        let prefs = engine.preferences();
        let ranker = RankerId::from("123");

        // D > E is created first, then E > D is rejected against it.
        let warnings = prefs
            .insert_preferences(&ranker, &[pref("D", "E"), pref("E", "D")])
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("E > D"));
    }

    #[test]
    fn test_preference_resolves_pending_compare() {
        let engine = movie_night();
        let ranker = RankerId::from("123");
        let queue = engine.queue();
        assert!(queue
            .insert_queued_compare(&ranker, &"B".into(), &"C".into())
            .unwrap()
            .is_queued());

        engine
            .preferences()
            .insert_preference(&ranker, &"C".into(), &"B".into())
            .unwrap();
        assert!(queue.list_queued_compares(&ranker, None).unwrap().is_empty());
    }

    #[test]
    fn test_chained_preferences_settle_pending_compare() {
        let engine = seeded_engine();
        let ranker = RankerId::from("r");
        engine.on_ranker_created(&ranker).unwrap();
        let items = ids(&["A", "B", "C"]);
        for item in items.iter() {
            engine.on_item_created(item).unwrap();
        }
        engine.knowledge().set_known(&ranker, &items).unwrap();
        let (a, b, c) = (&items[0], &items[1], &items[2]);

        assert!(engine
            .queue()
            .insert_queued_compare(&ranker, a, c)
            .unwrap()
            .is_queued());
        let prefs = engine.preferences();
        assert!(prefs.insert_preference(&ranker, a, b).unwrap().is_created());
        // A ~ C survives A > B alone.
        assert_eq!(
            engine.queue().list_queued_compares(&ranker, None).unwrap().len(),
            1
        );
        assert!(prefs.insert_preference(&ranker, b, c).unwrap().is_created());

        // A > B > C orders A above C, so the comparison is settled.
        assert!(engine
            .queue()
            .list_queued_compares(&ranker, None)
            .unwrap()
            .is_empty());
        assert!(!engine
            .store()
            .read_ranker(&ranker, |graph, _| graph.pending_pairs())
            .unwrap()
            .contains(&ItemPair::new(a.clone(), c.clone())));
        assert!(engine.store().built_in_test().is_empty());
    }

    #[test]
    fn test_delete_preference_is_noop_when_absent() {
        let engine = movie_night();
        let prefs = engine.preferences();
        let ranker = RankerId::from("123");

        assert!(prefs
            .delete_preference(&ranker, &"A".into(), &"D".into())
            .unwrap());
        assert!(!prefs
            .delete_preference(&ranker, &"A".into(), &"D".into())
            .unwrap());
        // Without A > D the reverse is now allowed.
        assert!(prefs
            .insert_preference(&ranker, &"D".into(), &"A".into())
            .unwrap()
            .is_created());
        assert_eq!(prefs.get_direct_preferences(&ranker, None).unwrap().len(), 5);
    }
}
