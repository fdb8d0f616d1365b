use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::Path,
    sync::Arc,
};

use super::{lookup_item, GraphStore, ItemRegistry, RankerGraph};
use crate::{
    error::RankGraphError,
    properties::{EdgeKind, ItemId, ItemNode, ItemPair, RankerId},
};

/// Serializable form of one ranker's tagged subgraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankerSnapshot {
    #[serde(default)]
    pub known: BTreeSet<ItemId>,
    #[serde(default)]
    pub unknown: BTreeSet<ItemId>,
    /// (preferred, nonpreferred)
    #[serde(default)]
    pub preferences: Vec<(ItemId, ItemId)>,
    #[serde(default)]
    pub pending: Vec<ItemPair>,
}

impl From<&RankerGraph> for RankerSnapshot {
    fn from(graph: &RankerGraph) -> Self {
        RankerSnapshot {
            known: graph.known().clone(),
            unknown: graph.unknown().clone(),
            preferences: graph.preferences(),
            pending: graph.pending_pairs(),
        }
    }
}

impl RankerSnapshot {
    fn into_graph(self, ranker: RankerId, items: &ItemRegistry) -> Result<RankerGraph, RankGraphError> {
        let mut graph = RankerGraph::new(ranker);
        for item in self.known.iter().chain(self.unknown.iter()) {
            lookup_item(items, item)?;
        }
        for item in self.known.iter() {
            graph.add_knowledge(EdgeKind::Knows, item);
        }
        for item in self.unknown.iter() {
            graph.add_knowledge(EdgeKind::DoesNotKnow, item);
        }
        for (preferred, nonpreferred) in self.preferences.iter() {
            graph.add_edge(EdgeKind::PreferredTo, preferred, nonpreferred);
        }
        for pair in self.pending.iter() {
            graph.add_edge(EdgeKind::PendingCompare, pair.low(), pair.high());
        }
        Ok(graph)
    }
}

/// Serializable form of a whole [GraphStore].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub items: Vec<ItemNode>,
    #[serde(default)]
    pub rankers: BTreeMap<RankerId, RankerSnapshot>,
}

impl GraphStore {
    pub fn snapshot(&self) -> StoreSnapshot {
        let rankers = self.rankers.read();
        let items = self.items.read();
        StoreSnapshot {
            items: items.values().cloned().collect(),
            rankers: rankers
                .iter()
                .map(|(ranker, graph_lock)| (ranker.clone(), RankerSnapshot::from(&*graph_lock.read())))
                .collect(),
        }
    }

    /// Rebuild a store from a snapshot. The result must pass [GraphStore::built_in_test], otherwise
    /// the snapshot is rejected with [RankGraphError::StoreUnavailable].
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<GraphStore, RankGraphError> {
        let items: ItemRegistry = snapshot
            .items
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect();
        let mut rankers = BTreeMap::new();
        for (ranker, ranker_snapshot) in snapshot.rankers {
            let graph = ranker_snapshot
                .into_graph(ranker.clone(), &items)
                .map_err(|err| {
                    RankGraphError::StoreUnavailable(format!(
                        "snapshot for ranker {ranker} is inconsistent: {err}"
                    ))
                })?;
            rankers.insert(ranker, Arc::new(RwLock::new(graph)));
        }
        let store = GraphStore {
            rankers: RwLock::new(rankers),
            items: RwLock::new(items),
            tx: None,
        };
        let errors = store.built_in_test();
        if !errors.is_empty() {
            tracing::warn!(
                "[GraphStore::from_snapshot] rejecting snapshot with {} invariant violations",
                errors.len()
            );
            return Err(RankGraphError::StoreUnavailable(errors.join("\n")));
        }
        Ok(store)
    }

    /// Write the store as pretty JSON. The file is written next to `path` and renamed into place.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<(), RankGraphError> {
        let path = path.as_ref();
        tracing::debug!("Writing store snapshot to: {:?}", path);
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| snapshot_io_error(path, e))?;
        fs::rename(&tmp_path, path).map_err(|e| snapshot_io_error(path, e))?;
        Ok(())
    }

    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<GraphStore, RankGraphError> {
        let path = path.as_ref();
        tracing::debug!("Reading store snapshot from: {:?}", path);
        let content = fs::read_to_string(path).map_err(|e| snapshot_io_error(path, e))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
        GraphStore::from_snapshot(snapshot)
    }
}

/// Any snapshot I/O failure, a missing file included, is [RankGraphError::StoreUnavailable].
fn snapshot_io_error(path: &Path, err: io::Error) -> RankGraphError {
    RankGraphError::StoreUnavailable(format!("snapshot {path:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::NodeKind;
    use tempfile::TempDir;
    use test_log::test;

    fn sample_snapshot() -> StoreSnapshot {
        StoreSnapshot {
            items: ["a", "b", "c"]
                .into_iter()
                .map(|id| ItemNode::new(id.into()))
                .collect(),
            rankers: BTreeMap::from([(
                RankerId::from("r"),
                RankerSnapshot {
                    known: BTreeSet::from(["a".into(), "b".into(), "c".into()]),
                    unknown: BTreeSet::new(),
                    preferences: vec![("a".into(), "b".into())],
                    pending: vec![ItemPair::new("c".into(), "a".into())],
                },
            )]),
        }
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let store = GraphStore::from_snapshot(sample_snapshot()).unwrap();
        store.save_snapshot(&path).unwrap();

        let loaded = GraphStore::load_snapshot(&path).unwrap();
        assert_eq!(loaded.snapshot(), sample_snapshot());
        assert!(loaded.contains_node(NodeKind::Ranker, "r"));
    }

    #[test]
    fn test_cyclic_snapshot_is_rejected() {
        let mut snapshot = sample_snapshot();
        if let Some(ranker) = snapshot.rankers.get_mut(&RankerId::from("r")) {
            ranker.preferences.push(("b".into(), "a".into()));
        }
        assert!(matches!(
            GraphStore::from_snapshot(snapshot),
            Err(RankGraphError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_snapshot_with_missing_item_is_rejected() {
        let mut snapshot = sample_snapshot();
        snapshot.items.retain(|node| node.id.as_str() != "c");
        assert!(matches!(
            GraphStore::from_snapshot(snapshot),
            Err(RankGraphError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_snapshot_file_is_store_unavailable() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GraphStore::load_snapshot(dir.path().join("nope.json")),
            Err(RankGraphError::StoreUnavailable(_))
        ));
        assert!(matches!(
            GraphStore::new().save_snapshot(dir.path().join("no_dir").join("store.json")),
            Err(RankGraphError::StoreUnavailable(_))
        ));
    }
}
