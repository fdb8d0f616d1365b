//! # rankgraph
//!
//! A per-ranker preference graph engine: rankers state pairwise preferences over shared items, and
//! the engine keeps each ranker's preferences acyclic, drives a queue of comparisons still to be
//! made, and derives a total ranking from whatever partial order exists so far.
//!
//! ## Overview
//!
//! Every ranker owns an independent tagged subgraph of one shared property graph:
//!
//! - **KNOWS / DOES_NOT_KNOW** (ranker -> item): which items the ranker is willing to judge
//! - **PREFERRED_TO** (item -> item): a direct preference. The union of these edges is a DAG
//! - **PENDING_COMPARE** (item <-> item): an unresolved comparison waiting for the ranker
//!
//! Reachability over a filtered set of edge kinds is the core primitive. It rejects preferences that
//! would close a cycle, decides which pairs may be queued, and weights items for sorting.
//!
//! ## Architecture
//!
//! - **[`store`]**: [`store::GraphStore`], the shared graph with per-ranker locking and JSON snapshots
//! - **[`knowledge`]**: KNOWS/DOES_NOT_KNOW bookkeeping and the purge that goes with it
//! - **[`preference`]**: validated insertion and removal of PREFERRED_TO edges
//! - **[`queue`]**: the randomized comparison queue
//! - **[`ranking`]**: topological sort by transitive preference weight
//! - **[`engine`]**: [`engine::PreferenceEngine`], wiring the above and the lifecycle hooks
//! - **[`properties`]**: identifiers, node/edge kinds and operation outcomes
//! - **[`event`]**: [`event::GraphEvent`]s emitted for every committed mutation
//! - **[`config`]**: [`config::EngineConfig`] and its TOML provider
//!
//! ## Quick Start
//!
//! ```rust
//! use rankgraph::{
//!     config::EngineConfig,
//!     engine::PreferenceEngine,
//!     properties::{InvalidReason, ItemId, PreferenceOutcome, RankerId},
//!     store::GraphStore,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), rankgraph::RankGraphError> {
//! let engine = PreferenceEngine::new(EngineConfig::default(), Arc::new(GraphStore::new()))?;
//! let ranker = RankerId::from("123");
//! engine.on_ranker_created(&ranker)?;
//! let items: Vec<ItemId> = ["A", "B", "C"].into_iter().map(ItemId::from).collect();
//! for item in items.iter() {
//!     engine.on_item_created(item)?;
//! }
//! engine.knowledge().set_known(&ranker, &items)?;
//!
//! let prefs = engine.preferences();
//! assert!(prefs.insert_preference(&ranker, &items[0], &items[1])?.is_created());
//! assert!(prefs.insert_preference(&ranker, &items[1], &items[2])?.is_created());
//! // C > A would contradict A > B > C.
//! assert_eq!(
//!     prefs.insert_preference(&ranker, &items[2], &items[0])?,
//!     PreferenceOutcome::Invalid(InvalidReason::WouldCycle)
//! );
//!
//! assert_eq!(engine.ranking().topological_sort(&ranker, None)?, items);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! A [`store::GraphStore`] is shared behind an `Arc` and every operation locks what it needs: the
//! ranker registry, the item registry, and the ranker's own subgraph, always in that order. The
//! cycle check and the insert of a preference happen under one write lock, so concurrent callers
//! can never jointly create a cycle. Batch operations commit each element separately.
//!
//! ## Features
//!
//! - **default**: the library
//! - **bin**: the `rankgraph` CLI, operating on a JSON snapshot file

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod knowledge;
pub mod preference;
pub mod properties;
pub mod query;
pub mod queue;
pub mod ranking;
pub mod store;

pub use error::*;
