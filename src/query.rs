use serde::{Deserialize, Serialize};

use crate::{
    properties::{EdgeKindSet, ItemId, ItemNode},
    store::ItemRelation,
};

/// Filter based on item node properties
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemPred {
    // Return all items
    Any,
    // Return items who's id is contained in the predicate values
    Id(Vec<ItemId>),
    // Return items carrying the label
    Label(String),
}

impl ItemPred {
    pub fn match_item(&self, node: &ItemNode) -> bool {
        match self {
            ItemPred::Any => true,
            ItemPred::Id(id_vec) => id_vec.contains(&node.id),
            ItemPred::Label(label) => node.matches_label(Some(label)),
        }
    }
}

impl From<Option<&str>> for ItemPred {
    fn from(label: Option<&str>) -> Self {
        match label {
            Some(label) => ItemPred::Label(label.to_string()),
            None => ItemPred::Any,
        }
    }
}

/// Filter based on item relation properties. PENDING_COMPARE relations are unordered, so
/// `SourceIn` and `SinkIn` match either of their endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgePred {
    Any,
    SinkIn(Vec<ItemId>),
    SourceIn(Vec<ItemId>),
    NodeIn(Vec<ItemId>),
    Kind(EdgeKindSet),
    All(Vec<EdgePred>),
}

impl EdgePred {
    pub fn matches(&self, rel: &ItemRelation) -> bool {
        match self {
            EdgePred::Any => true,
            EdgePred::SinkIn(id_vec) if rel.kind.is_directed() => id_vec.contains(&rel.sink),
            EdgePred::SourceIn(id_vec) if rel.kind.is_directed() => id_vec.contains(&rel.source),
            EdgePred::SinkIn(id_vec) | EdgePred::SourceIn(id_vec) | EdgePred::NodeIn(id_vec) => {
                id_vec.contains(&rel.source) || id_vec.contains(&rel.sink)
            }
            EdgePred::Kind(kinds) => kinds.contains(rel.kind),
            EdgePred::All(preds) => preds.iter().all(|pred| pred.matches(rel)),
        }
    }
}
