//! rankgraph CLI tool
//!
//! Command-line interface over a JSON store snapshot. Every invocation loads the snapshot, runs one
//! command, and writes the snapshot back if the command changed anything.
//!
//! ## Commands
//!
//! - `add-ranker`, `remove-ranker`, `add-item`, `remove-item`: lifecycle hooks
//! - `know`, `disclaim`, `revoke`, `undefined`: knowledge
//! - `prefer`, `unprefer`, `prefs`: preferences
//! - `compare`, `populate`, `compares`, `clear-queue`, `reset-queue`: comparison queue
//! - `sort`: ranking
//! - `check`: invariant check of the whole store

use clap::{Parser, Subcommand};
use rankgraph::{
    config::{ConfigProvider, EngineConfig, TomlConfigProvider},
    engine::PreferenceEngine,
    properties::{ItemId, RankerId},
    store::GraphStore,
    RankGraphError,
};
use std::{path::PathBuf, sync::Arc};

const DEFAULT_STORE: &str = "rankgraph.json";

#[derive(Parser)]
#[command(name = "rankgraph")]
#[command(author, version, about = "Record pairwise preferences and derive rankings", long_about = None)]
struct Cli {
    /// Store snapshot path. Defaults to the config's `snapshot_path`, then `rankgraph.json`
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print every graph event the command produced
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a ranker
    AddRanker { ranker: String },

    /// Delete a ranker and everything it recorded
    RemoveRanker { ranker: String },

    /// Register an item
    AddItem {
        item: String,

        /// Labels to tag the item with (repeatable)
        #[arg(short, long)]
        label: Vec<String>,
    },

    /// Delete an item from every ranker
    RemoveItem { item: String },

    /// Mark items as known to the ranker
    Know { ranker: String, items: Vec<String> },

    /// Mark items as not known to the ranker
    Disclaim { ranker: String, items: Vec<String> },

    /// Forget whether the ranker knows an item
    Revoke { ranker: String, item: String },

    /// Sample items the ranker has not classified yet
    Undefined {
        ranker: String,
        #[arg(short, long)]
        label: Option<String>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Record that the ranker prefers one item over another
    Prefer {
        ranker: String,
        preferred: String,
        nonpreferred: String,
    },

    /// Remove a direct preference
    Unprefer {
        ranker: String,
        preferred: String,
        nonpreferred: String,
    },

    /// List direct preferences
    Prefs {
        ranker: String,
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Queue a comparison between two items
    Compare {
        ranker: String,
        left: String,
        right: String,
    },

    /// Fill the comparison queue
    Populate {
        ranker: String,
        #[arg(short = 'n', long)]
        max: Option<usize>,
    },

    /// List queued comparisons
    Compares {
        ranker: String,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Drop every queued comparison
    ClearQueue { ranker: String },

    /// Clear, repopulate and list the comparison queue
    ResetQueue {
        ranker: String,
        #[arg(short = 'n', long)]
        max: Option<usize>,
    },

    /// Rank the ranker's known items
    Sort {
        ranker: String,
        #[arg(short, long)]
        label: Option<String>,
        /// Show each item's weight
        #[arg(short, long)]
        weights: bool,
    },

    /// Check the store's invariants
    Check,
}

fn items(ids: Vec<String>) -> Vec<ItemId> {
    ids.into_iter().map(ItemId::from).collect()
}

/// Runs one command. Returns whether the store changed.
fn run(engine: &PreferenceEngine, command: Commands) -> Result<bool, RankGraphError> {
    match command {
        Commands::AddRanker { ranker } => engine.on_ranker_created(&ranker.into())?,
        Commands::RemoveRanker { ranker } => engine.on_ranker_deleted(&ranker.into())?,
        Commands::AddItem { item, label } => {
            engine.on_item_created_with_labels(&item.into(), label)?
        }
        Commands::RemoveItem { item } => engine.on_item_deleted(&item.into())?,
        Commands::Know { ranker, items: ids } => {
            engine.knowledge().set_known(&ranker.into(), &items(ids))?
        }
        Commands::Disclaim { ranker, items: ids } => {
            engine.knowledge().set_unknown(&ranker.into(), &items(ids))?
        }
        Commands::Revoke { ranker, item } => {
            let previous = engine
                .knowledge()
                .revoke_knowledge(&ranker.into(), &item.into())?;
            println!("was {previous}");
        }
        Commands::Undefined {
            ranker,
            label,
            limit,
        } => {
            for item in engine.knowledge().list_undefined_items(
                &ranker.into(),
                label.as_deref(),
                limit,
            )? {
                println!("{item}");
            }
            return Ok(false);
        }
        Commands::Prefer {
            ranker,
            preferred,
            nonpreferred,
        } => {
            let outcome = engine.preferences().insert_preference(
                &ranker.into(),
                &preferred.into(),
                &nonpreferred.into(),
            )?;
            println!("{outcome}");
            return Ok(outcome.is_created());
        }
        Commands::Unprefer {
            ranker,
            preferred,
            nonpreferred,
        } => {
            return engine.preferences().delete_preference(
                &ranker.into(),
                &preferred.into(),
                &nonpreferred.into(),
            );
        }
        Commands::Prefs { ranker, label } => {
            for (preferred, nonpreferred) in engine
                .preferences()
                .get_direct_preferences(&ranker.into(), label.as_deref())?
            {
                println!("{preferred} > {nonpreferred}");
            }
            return Ok(false);
        }
        Commands::Compare {
            ranker,
            left,
            right,
        } => {
            let outcome =
                engine
                    .queue()
                    .insert_queued_compare(&ranker.into(), &left.into(), &right.into())?;
            println!("{outcome:?}");
            return Ok(outcome.is_queued());
        }
        Commands::Populate { ranker, max } => {
            let created = engine
                .queue()
                .populate_queued_compares(&ranker.into(), max)?;
            println!("queued {created}");
            return Ok(created > 0);
        }
        Commands::Compares { ranker, limit } => {
            for (left, right) in engine.queue().list_queued_compares(&ranker.into(), limit)? {
                println!("{left} ? {right}");
            }
            return Ok(false);
        }
        Commands::ClearQueue { ranker } => {
            let cleared = engine.queue().clear_queued_compares(&ranker.into())?;
            println!("cleared {cleared}");
            return Ok(cleared > 0);
        }
        Commands::ResetQueue { ranker, max } => {
            for (left, right) in engine.queue().reset_queued_compares(&ranker.into(), max)? {
                println!("{left} ? {right}");
            }
        }
        Commands::Sort {
            ranker,
            label,
            weights,
        } => {
            let ranker = RankerId::from(ranker);
            for (position, (item, weight)) in engine
                .ranking()
                .preference_weights(&ranker, label.as_deref())?
                .into_iter()
                .enumerate()
            {
                if weights {
                    println!("{:>4}. {item} ({weight})", position + 1);
                } else {
                    println!("{:>4}. {item}", position + 1);
                }
            }
            return Ok(false);
        }
        Commands::Check => {
            let errors = engine.store().built_in_test();
            for error in errors.iter() {
                println!("{error}");
            }
            if !errors.is_empty() {
                return Err(RankGraphError::StoreUnavailable(format!(
                    "{} invariant violations",
                    errors.len()
                )));
            }
            println!("ok");
            return Ok(false);
        }
    }
    Ok(true)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config.as_ref() {
        Some(path) => TomlConfigProvider::new(path.clone()).get_config()?,
        None => EngineConfig::default(),
    };
    let store_path = cli
        .store
        .clone()
        .or_else(|| config.snapshot_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));

    let store = if store_path.exists() {
        GraphStore::load_snapshot(&store_path)?
    } else {
        tracing::info!("No snapshot at {:?}, starting from an empty store", store_path);
        GraphStore::new()
    };
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = PreferenceEngine::new(config, Arc::new(store.with_event_sender(tx)))?;

    let changed = run(&engine, cli.command)?;

    while let Ok(event) = rx.try_recv() {
        if cli.verbose {
            println!("[Event] {event}");
        }
    }
    if changed {
        engine.store().save_snapshot(&store_path)?;
    }
    Ok(())
}
