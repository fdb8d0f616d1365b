//! Graph data structures for one ranker's tagged subgraph.
//!
//! - [`ItemGraph`]: item-to-item relations (PREFERRED_TO, PENDING_COMPARE) on a petgraph
//!   `StableGraph` with an id -> index map
//! - [`RankerGraph`]: a ranker's KNOWS/DOES_NOT_KNOW sets plus its [`ItemGraph`]

use crate::{
    properties::{EdgeKind, EdgeKindSet, ItemId, ItemPair, KnowsState, RankerId},
    query::EdgePred,
};
use petgraph::{
    algo::kosaraju_scc,
    graphmap::GraphMap,
    stable_graph::{EdgeIndex, NodeIndex, StableGraph},
    visit::EdgeRef,
    Directed, Direction,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

pub type ItemSubGraph = GraphMap<NodeIndex, (), Directed>;

/// One item-to-item edge. PENDING_COMPARE relations always carry the low item as `source`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemRelation {
    pub kind: EdgeKind,
    pub source: ItemId,
    pub sink: ItemId,
}

impl fmt::Display for ItemRelation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let arrow = if self.kind.is_directed() { "->" } else { "<->" };
        write!(f, "{} -[{}]{} {}", self.source, self.kind, arrow, self.sink)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemGraph {
    graph: StableGraph<ItemId, EdgeKind>,
    index: BTreeMap<ItemId, NodeIndex>,
}

impl ItemGraph {
    pub fn as_graph(&self) -> &StableGraph<ItemId, EdgeKind> {
        &self.graph
    }

    pub fn index_of(&self, item: &ItemId) -> Option<NodeIndex> {
        self.index.get(item).copied()
    }

    pub fn contains_item(&self, item: &ItemId) -> bool {
        self.index.contains_key(item)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node(&mut self, item: &ItemId) -> NodeIndex {
        if let Some(idx) = self.index.get(item) {
            return *idx;
        }
        let idx = self.graph.add_node(item.clone());
        self.index.insert(item.clone(), idx);
        idx
    }

    /// Undirected kinds are stored once, low -> high.
    fn orient<'a>(kind: EdgeKind, from: &'a ItemId, to: &'a ItemId) -> (&'a ItemId, &'a ItemId) {
        if !kind.is_directed() && to < from {
            (to, from)
        } else {
            (from, to)
        }
    }

    fn find_edge(&self, kind: EdgeKind, from: &ItemId, to: &ItemId) -> Option<EdgeIndex> {
        let (from, to) = ItemGraph::orient(kind, from, to);
        let source_idx = self.index_of(from)?;
        let sink_idx = self.index_of(to)?;
        self.graph
            .edges_directed(source_idx, Direction::Outgoing)
            .find(|edge| edge.target() == sink_idx && *edge.weight() == kind)
            .map(|edge| edge.id())
    }

    pub fn contains_edge(&self, kind: EdgeKind, from: &ItemId, to: &ItemId) -> bool {
        self.find_edge(kind, from, to).is_some()
    }

    /// Merge semantics: returns false when the edge was already present.
    pub fn add_edge(&mut self, kind: EdgeKind, from: &ItemId, to: &ItemId) -> bool {
        if self.contains_edge(kind, from, to) {
            return false;
        }
        let (from, to) = ItemGraph::orient(kind, from, to);
        let source_idx = self.node(from);
        let sink_idx = self.node(to);
        self.graph.add_edge(source_idx, sink_idx, kind);
        true
    }

    pub fn remove_edge(&mut self, kind: EdgeKind, from: &ItemId, to: &ItemId) -> bool {
        match self.find_edge(kind, from, to) {
            Some(edge_idx) => self.graph.remove_edge(edge_idx).is_some(),
            None => false,
        }
    }

    fn relation(&self, edge_idx: EdgeIndex) -> Option<ItemRelation> {
        let (source_idx, sink_idx) = self.graph.edge_endpoints(edge_idx)?;
        Some(ItemRelation {
            kind: *self.graph.edge_weight(edge_idx)?,
            source: self.graph[source_idx].clone(),
            sink: self.graph[sink_idx].clone(),
        })
    }

    /// Detach and delete the item node, returning every relation that touched it.
    pub fn remove_item(&mut self, item: &ItemId) -> Vec<ItemRelation> {
        let Some(idx) = self.index.remove(item) else {
            return Vec::new();
        };
        let mut removed = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .filter_map(|edge| self.relation(edge.id()))
            .collect::<Vec<_>>();
        removed.sort();
        removed.dedup();
        self.graph.remove_node(idx);
        removed
    }

    /// Keep only the relations for which `f` returns true, returning the removed ones.
    pub fn retain<F: FnMut(&ItemRelation) -> bool>(&mut self, mut f: F) -> Vec<ItemRelation> {
        let to_remove = self
            .graph
            .edge_indices()
            .filter_map(|edge_idx| self.relation(edge_idx).map(|rel| (edge_idx, rel)))
            .filter(|(_, rel)| !f(rel))
            .collect::<Vec<_>>();
        let mut removed = Vec::with_capacity(to_remove.len());
        for (edge_idx, rel) in to_remove {
            self.graph.remove_edge(edge_idx);
            removed.push(rel);
        }
        removed
    }

    /// Items one hop away from `idx` over `kinds`. Directed kinds are followed along `dir` only,
    /// PENDING_COMPARE in both directions.
    fn neighbors(&self, idx: NodeIndex, kinds: EdgeKindSet, dir: Direction) -> Vec<NodeIndex> {
        let mut next = self
            .graph
            .edges_directed(idx, dir)
            .filter(|edge| kinds.contains(*edge.weight()))
            .map(|edge| match dir {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            })
            .collect::<Vec<_>>();
        if kinds.contains(EdgeKind::PendingCompare) {
            next.extend(
                self.graph
                    .edges_directed(idx, dir.opposite())
                    .filter(|edge| *edge.weight() == EdgeKind::PendingCompare)
                    .map(|edge| match dir {
                        Direction::Outgoing => edge.source(),
                        Direction::Incoming => edge.target(),
                    }),
            );
        }
        next
    }

    /// Depth first walk of at least one hop from every start node along `dir`. `visit` returns
    /// true to stop the walk early.
    fn walk<F: FnMut(NodeIndex) -> bool>(
        &self,
        starts: &[NodeIndex],
        kinds: EdgeKindSet,
        dir: Direction,
        mut visit: F,
    ) -> bool {
        let mut explored = BTreeSet::new();
        let mut stack = starts
            .iter()
            .flat_map(|idx| self.neighbors(*idx, kinds, dir))
            .collect::<Vec<_>>();
        while let Some(idx) = stack.pop() {
            if !explored.insert(idx) {
                continue;
            }
            if visit(idx) {
                return true;
            }
            stack.extend(
                self.neighbors(idx, kinds, dir)
                    .into_iter()
                    .filter(|next| !explored.contains(next)),
            );
        }
        false
    }

    /// Variable-length (one or more hops) path existence from any item of `from` to any item of
    /// `to`, following only edges whose kind is in `kinds`.
    pub fn path_exists(&self, from: &[ItemId], to: &[ItemId], kinds: EdgeKindSet) -> bool {
        let starts = from
            .iter()
            .filter_map(|item| self.index_of(item))
            .collect::<Vec<_>>();
        let targets = to
            .iter()
            .filter_map(|item| self.index_of(item))
            .collect::<BTreeSet<_>>();
        if starts.is_empty() || targets.is_empty() {
            return false;
        }
        self.walk(&starts, kinds, Direction::Outgoing, |idx| targets.contains(&idx))
    }

    /// Every item reachable from `from` over `kinds`, excluding `from` itself.
    pub fn reachable(&self, from: &ItemId, kinds: EdgeKindSet) -> BTreeSet<ItemId> {
        self.collect_walk(from, kinds, Direction::Outgoing)
    }

    /// Every item with a path to `to` over `kinds`, excluding `to` itself.
    pub fn reaching(&self, to: &ItemId, kinds: EdgeKindSet) -> BTreeSet<ItemId> {
        self.collect_walk(to, kinds, Direction::Incoming)
    }

    fn collect_walk(&self, start: &ItemId, kinds: EdgeKindSet, dir: Direction) -> BTreeSet<ItemId> {
        let mut found = BTreeSet::new();
        if let Some(start) = self.index_of(start) {
            self.walk(&[start], kinds, dir, |idx| {
                if idx != start {
                    found.insert(self.graph[idx].clone());
                }
                false
            });
        }
        found
    }

    pub fn relations(&self) -> Vec<ItemRelation> {
        let mut relations = self
            .graph
            .edge_indices()
            .filter_map(|edge_idx| self.relation(edge_idx))
            .collect::<Vec<_>>();
        relations.sort();
        relations
    }

    pub fn as_subgraph(&self, kind: EdgeKind) -> ItemSubGraph {
        ItemSubGraph::from_edges(self.graph.edge_indices().filter_map(|edge_idx| {
            let (source, sink) = self.graph.edge_endpoints(edge_idx)?;
            (self.graph[edge_idx] == kind).then_some((source, sink))
        }))
    }

    /// Strongly connected components of more than one item in the `kind` subgraph.
    pub fn cycles(&self, kind: EdgeKind) -> Vec<Vec<ItemId>> {
        kosaraju_scc(&self.as_subgraph(kind))
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut items = scc
                    .into_iter()
                    .map(|idx| self.graph[idx].clone())
                    .collect::<Vec<_>>();
                items.sort();
                items
            })
            .collect()
    }
}

/// One ranker's tagged subgraph: which items it knows or disclaims, and the preference and pending
/// relations between its known items.
///
/// Invariants (checked by [RankerGraph::built_in_test]):
///
/// 0. The PREFERRED_TO subgraph is acyclic.
/// 1. KNOWS and DOES_NOT_KNOW are disjoint.
/// 2. Every PREFERRED_TO and PENDING_COMPARE endpoint is a known item.
/// 3. No PENDING_COMPARE pair is already ordered by a PREFERRED_TO path.
#[derive(Debug, Clone, Default)]
pub struct RankerGraph {
    ranker: RankerId,
    known: BTreeSet<ItemId>,
    unknown: BTreeSet<ItemId>,
    relations: ItemGraph,
}

impl RankerGraph {
    pub fn new(ranker: RankerId) -> Self {
        RankerGraph {
            ranker,
            ..Default::default()
        }
    }

    pub fn ranker(&self) -> &RankerId {
        &self.ranker
    }

    pub fn known(&self) -> &BTreeSet<ItemId> {
        &self.known
    }

    pub fn unknown(&self) -> &BTreeSet<ItemId> {
        &self.unknown
    }

    pub fn relations(&self) -> &ItemGraph {
        &self.relations
    }

    pub fn knows(&self, item: &ItemId) -> bool {
        self.known.contains(item)
    }

    pub fn does_not_know(&self, item: &ItemId) -> bool {
        self.unknown.contains(item)
    }

    pub fn knows_state(&self, item: &ItemId) -> KnowsState {
        if self.knows(item) {
            KnowsState::Known
        } else if self.does_not_know(item) {
            KnowsState::Unknown
        } else {
            KnowsState::Undefined
        }
    }

    /// Add a KNOWS or DOES_NOT_KNOW edge to `item`. Merge semantics; mutual exclusion is the
    /// caller's job.
    pub fn add_knowledge(&mut self, kind: EdgeKind, item: &ItemId) -> bool {
        match kind {
            EdgeKind::Knows => self.known.insert(item.clone()),
            EdgeKind::DoesNotKnow => self.unknown.insert(item.clone()),
            _ => {
                tracing::warn!("[RankerGraph::add_knowledge] {kind} is not a knowledge edge");
                false
            }
        }
    }

    pub fn remove_knowledge(&mut self, kind: EdgeKind, item: &ItemId) -> bool {
        match kind {
            EdgeKind::Knows => self.known.remove(item),
            EdgeKind::DoesNotKnow => self.unknown.remove(item),
            _ => false,
        }
    }

    pub fn add_edge(&mut self, kind: EdgeKind, from: &ItemId, to: &ItemId) -> bool {
        if !EdgeKind::item_relations().contains(kind) {
            tracing::warn!("[RankerGraph::add_edge] {kind} is not an item relation");
            return false;
        }
        self.relations.add_edge(kind, from, to)
    }

    pub fn remove_edge(&mut self, kind: EdgeKind, from: &ItemId, to: &ItemId) -> bool {
        self.relations.remove_edge(kind, from, to)
    }

    pub fn contains_edge(&self, kind: EdgeKind, from: &ItemId, to: &ItemId) -> bool {
        self.relations.contains_edge(kind, from, to)
    }

    /// Remove every PREFERRED_TO and PENDING_COMPARE edge touching `item`.
    pub fn detach_item(&mut self, item: &ItemId) -> Vec<ItemRelation> {
        self.relations.remove_item(item)
    }

    /// Drop the item from this subgraph entirely: relations and knowledge edges.
    pub fn forget_item(&mut self, item: &ItemId) -> Vec<ItemRelation> {
        self.known.remove(item);
        self.unknown.remove(item);
        self.detach_item(item)
    }

    pub fn path_exists(&self, from: &[ItemId], to: &[ItemId], kinds: EdgeKindSet) -> bool {
        self.relations.path_exists(from, to, kinds)
    }

    pub fn reachable(&self, from: &ItemId, kinds: EdgeKindSet) -> BTreeSet<ItemId> {
        self.relations.reachable(from, kinds)
    }

    /// Drop every pending pair ordered by the PREFERRED_TO edge `preferred -> nonpreferred`: pairs
    /// joining an item at or above `preferred` with an item at or below `nonpreferred`.
    pub fn settle_pending(&mut self, preferred: &ItemId, nonpreferred: &ItemId) -> Vec<ItemPair> {
        let kinds: EdgeKindSet = EdgeKind::PreferredTo.into();
        let mut above = self.relations.reaching(preferred, kinds);
        above.insert(preferred.clone());
        let mut below = self.relations.reachable(nonpreferred, kinds);
        below.insert(nonpreferred.clone());
        let mut settled = self
            .relations
            .retain(|rel| {
                rel.kind != EdgeKind::PendingCompare
                    || !((above.contains(&rel.source) && below.contains(&rel.sink))
                        || (above.contains(&rel.sink) && below.contains(&rel.source)))
            })
            .into_iter()
            .map(|rel| ItemPair::new(rel.source, rel.sink))
            .collect::<Vec<_>>();
        settled.sort();
        settled
    }

    pub fn query(&self, pred: &EdgePred) -> Vec<ItemRelation> {
        self.relations
            .relations()
            .into_iter()
            .filter(|rel| pred.matches(rel))
            .collect()
    }

    pub fn preferences(&self) -> Vec<(ItemId, ItemId)> {
        self.query(&EdgePred::Kind(EdgeKind::PreferredTo.into()))
            .into_iter()
            .map(|rel| (rel.source, rel.sink))
            .collect()
    }

    pub fn pending_pairs(&self) -> Vec<ItemPair> {
        self.query(&EdgePred::Kind(EdgeKind::PendingCompare.into()))
            .into_iter()
            .map(|rel| ItemPair::new(rel.source, rel.sink))
            .collect()
    }

    pub fn clear_pending(&mut self) -> Vec<ItemPair> {
        self.relations
            .retain(|rel| rel.kind != EdgeKind::PendingCompare)
            .into_iter()
            .map(|rel| ItemPair::new(rel.source, rel.sink))
            .collect()
    }

    pub fn built_in_test(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for scc in self.relations.cycles(EdgeKind::PreferredTo) {
            errors.push(format!(
                "[RankerGraph::built_in_test invariant 0] ranker {} preferences contain cycle: {scc:?}",
                self.ranker
            ));
        }

        for item in self.known.intersection(&self.unknown) {
            errors.push(format!(
                "[RankerGraph::built_in_test invariant 1] ranker {} both knows and does not know {item}",
                self.ranker
            ));
        }

        for rel in self.relations.relations() {
            for endpoint in [&rel.source, &rel.sink] {
                if !self.known.contains(endpoint) {
                    errors.push(format!(
                        "[RankerGraph::built_in_test invariant 2] ranker {} relation {rel} touches unknown item {endpoint}",
                        self.ranker
                    ));
                }
            }
            if rel.kind == EdgeKind::PendingCompare {
                let pair = [rel.source.clone(), rel.sink.clone()];
                let preferred = EdgeKind::PreferredTo.into();
                if self.path_exists(&pair[..1], &pair[1..], preferred)
                    || self.path_exists(&pair[1..], &pair[..1], preferred)
                {
                    errors.push(format!(
                        "[RankerGraph::built_in_test invariant 3] ranker {} pending pair {rel} is already ordered",
                        self.ranker
                    ));
                }
            }
        }
        errors
    }
}

impl fmt::Display for RankerGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RankerGraph({}: {} known, {} unknown, {} relations)",
            self.ranker,
            self.known.len(),
            self.unknown.len(),
            self.relations.edge_count()
        )
    }
}
