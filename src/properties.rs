pub use enumset::EnumSet;
/// [crate::properties] contains the identifiers, node/edge kinds and outcome values shared by the
/// graph store and the managers built on top of it.
use enumset::*;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Borrow,
    collections::BTreeSet,
    fmt::{Display, Formatter},
};

use crate::error::RankGraphError;

/// Ranker ID
///
/// Opaque identity of a preference holder. The owning external entity (a user account, for
/// example) chooses the string; the engine only compares it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RankerId(String);

impl RankerId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        RankerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RankerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RankerId {
    fn from(id: &str) -> Self {
        RankerId(id.to_string())
    }
}

impl From<String> for RankerId {
    fn from(id: String) -> Self {
        RankerId(id)
    }
}

impl AsRef<str> for RankerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RankerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Item ID
///
/// Opaque identity of a rankable thing. The derived `Ord` is the stable total order used to
/// canonicalize unordered pairs and to break ranking ties.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId(id)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// [NodeKind] enumerates the node labels of the property graph.
#[derive(Debug, Default, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(repr = "u32")]
pub enum NodeKind {
    /// A preference holder.
    Ranker,
    /// A rankable thing, shared across rankers.
    #[default]
    Item,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// [EdgeKind] identifies what kind of relationship an edge represents. Every edge is tagged to
/// exactly one ranker: KNOWS and DOES_NOT_KNOW run from the ranker to an item, PREFERRED_TO and
/// PENDING_COMPARE run between two items of that ranker's subgraph.
#[derive(Debug, Default, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(repr = "u32")]
pub enum EdgeKind {
    /// The ranker is willing to judge the item.
    Knows,
    /// The ranker disclaimed knowledge of the item.
    DoesNotKnow,
    /// Source item is directly preferred over the sink item.
    #[default]
    PreferredTo,
    /// An unresolved comparison between two items. Unordered: traversals follow it in both
    /// directions.
    PendingCompare,
}

impl EdgeKind {
    /// Edge kinds that live between items (as opposed to ranker -> item edges).
    pub fn item_relations() -> EdgeKindSet {
        EdgeKind::PreferredTo | EdgeKind::PendingCompare
    }

    pub fn is_directed(&self) -> bool {
        !matches!(self, EdgeKind::PendingCompare)
    }
}

impl Display for EdgeKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let label = match self {
            EdgeKind::Knows => "KNOWS",
            EdgeKind::DoesNotKnow => "DOES_NOT_KNOW",
            EdgeKind::PreferredTo => "PREFERRED_TO",
            EdgeKind::PendingCompare => "PENDING_COMPARE",
        };
        write!(f, "{label}")
    }
}

impl TryFrom<&str> for EdgeKind {
    type Error = RankGraphError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "KNOWS" => Ok(EdgeKind::Knows),
            "DOES_NOT_KNOW" => Ok(EdgeKind::DoesNotKnow),
            "PREFERRED_TO" => Ok(EdgeKind::PreferredTo),
            "PENDING_COMPARE" => Ok(EdgeKind::PendingCompare),
            _ => Err(RankGraphError::Serialization(format!(
                "Unknown edge kind '{value}'"
            ))),
        }
    }
}

pub type EdgeKindSet = EnumSet<EdgeKind>;

/// An item registered with the store, plus the labels it was created with (for example `Movie`).
/// Labels let list and sort operations be restricted to one kind of item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemNode {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub labels: BTreeSet<String>,
}

impl ItemNode {
    pub fn new(id: ItemId) -> Self {
        ItemNode {
            id,
            labels: BTreeSet::new(),
        }
    }

    pub fn with_labels<I, S>(id: ItemId, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ItemNode {
            id,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// `None` matches every item.
    pub fn matches_label(&self, label: Option<&str>) -> bool {
        label.is_none_or(|label| self.labels.contains(label))
    }
}

/// An unordered pair of distinct items, stored low-then-high by [ItemId] order.
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemPair {
    low: ItemId,
    high: ItemId,
}

impl ItemPair {
    pub fn new(a: ItemId, b: ItemId) -> Self {
        if a <= b {
            ItemPair { low: a, high: b }
        } else {
            ItemPair { low: b, high: a }
        }
    }

    pub fn low(&self) -> &ItemId {
        &self.low
    }

    pub fn high(&self) -> &ItemId {
        &self.high
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        &self.low == item || &self.high == item
    }

    pub fn into_tuple(self) -> (ItemId, ItemId) {
        (self.low, self.high)
    }
}

impl Display for ItemPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}, {}}}", self.low, self.high)
    }
}

/// Tri-state answer to "does this ranker know this item".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowsState {
    Known,
    Unknown,
    Undefined,
}

impl KnowsState {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            KnowsState::Known => Some(true),
            KnowsState::Unknown => Some(false),
            KnowsState::Undefined => None,
        }
    }
}

impl Display for KnowsState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            KnowsState::Known => "known",
            KnowsState::Unknown => "unknown",
            KnowsState::Undefined => "undefined",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidReason {
    /// An item cannot be preferred to itself.
    Reflexive,
    /// The ranker does not know one or both items.
    UnknownItem,
    /// The reverse ordering is already implied; inserting would close a cycle.
    WouldCycle,
}

impl Display for InvalidReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            InvalidReason::Reflexive => "an item cannot be preferred to itself",
            InvalidReason::UnknownItem => "ranker does not know both items",
            InvalidReason::WouldCycle => "the opposite preference is already implied",
        };
        write!(f, "{msg}")
    }
}

/// Result of a single preference insertion. Invalid preferences are an ordinary outcome of
/// exploration, so they are reported as a value rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferenceOutcome {
    Created,
    Exists,
    Invalid(InvalidReason),
}

impl PreferenceOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, PreferenceOutcome::Created)
    }

    /// Converts [PreferenceOutcome::Invalid] into [RankGraphError::InvalidPreference] for callers
    /// that want to treat it as a hard failure.
    pub fn into_result(self) -> Result<PreferenceOutcome, RankGraphError> {
        match self {
            PreferenceOutcome::Invalid(reason) => {
                Err(RankGraphError::InvalidPreference(reason.to_string()))
            }
            outcome => Ok(outcome),
        }
    }
}

impl Display for PreferenceOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferenceOutcome::Created => write!(f, "Created"),
            PreferenceOutcome::Exists => write!(f, "Exists"),
            PreferenceOutcome::Invalid(_) => write!(f, "Invalid"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    Reflexive,
    UnknownItem,
    /// A preference or pending path already connects the pair in some direction.
    AlreadyRelated,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            RejectReason::Reflexive => "an item cannot be compared with itself",
            RejectReason::UnknownItem => "ranker does not know both items",
            RejectReason::AlreadyRelated => "pair is already ordered or queued",
        };
        write!(f, "{msg}")
    }
}

/// Result of trying to queue a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOutcome {
    Queued,
    Rejected(RejectReason),
}

impl CompareOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, CompareOutcome::Queued)
    }
}
