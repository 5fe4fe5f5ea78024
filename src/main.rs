mod aliases;
mod catalog;
mod config;
mod error;
mod launch;
mod matcher;
mod merger;
mod model;
mod normalize;
mod oracle;
mod resolver;
mod sources;
mod state;

use crate::catalog::Catalog;
use crate::config::{load_config, Config, OracleConfig};
use crate::error::CatalogError;
use crate::matcher::FuzzyMatcher;
use crate::model::{MatchResult, Provenance};
use crate::oracle::{OllamaOracle, Oracle};
use crate::resolver::{clean_phrase, Resolver};
use crate::state::CatalogState;
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::warn;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog file to use instead of the configured one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Never consult the language model
    #[arg(long)]
    no_oracle: bool,

    /// Give up on a query after this many seconds
    #[arg(long)]
    deadline: Option<u64>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Re-scan installed applications and overwrite the catalog
    Scan,
    /// Show which application a phrase refers to
    Resolve {
        #[arg(required = true)]
        phrase: Vec<String>,
    },
    /// List catalog entries
    List {
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Resolve a phrase and start the application
    Open {
        #[arg(required = true)]
        phrase: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(path) = args.catalog {
        config.general.catalog_path = Some(path);
    }
    if args.no_oracle {
        config.oracle.enabled = false;
    }
    let deadline = args.deadline.map(|secs| Instant::now() + Duration::from_secs(secs));

    match args.command {
        Cmd::Scan => run_scan(config),
        Cmd::Resolve { phrase } => run_query(&open_state(config), &phrase.join(" "), deadline, false),
        Cmd::Open { phrase } => run_query(&open_state(config), &phrase.join(" "), deadline, true),
        Cmd::List { limit } => {
            let state = open_state(config);
            let catalog = state.snapshot();
            if catalog.is_empty() {
                println!("The catalog is empty. Run `lanceur scan` to build it.");
                return Ok(());
            }
            for name in catalog.list_entries(limit) {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn rebuild_failed(reason: &str) {
    eprintln!("Could not build the application catalog: {}.", reason);
    eprintln!("Nothing was changed. Check the log (RUST_LOG=warn) and retry with `lanceur scan`.");
}

/// Loads the catalog, falling back to an empty one when even a rebuild fails.
fn open_state(config: Config) -> CatalogState {
    match CatalogState::open(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            rebuild_failed(&e.to_string());
            CatalogState::new(config, Catalog::default())
        }
    }
}

fn run_scan(config: Config) -> Result<()> {
    let state = CatalogState::new(config, Catalog::default());
    let report = match state.rebuild() {
        Ok(report) => report,
        Err(CatalogError::RebuildFailed(reason)) => {
            rebuild_failed(&reason);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Sources:");
    for kind in Provenance::ALL {
        if let Some(count) = report.scan.counts.get(&kind) {
            println!("  {:<12} {:>6} candidates", kind.as_str(), count);
        }
    }
    for (kind, reason) in &report.scan.failures {
        println!("  {:<12} failed: {}", kind.as_str(), reason);
    }

    let merge = &report.merge;
    println!(
        "Merge: {} accepted, {} replaced, {} shadowed, {} rejected, {} pruned",
        merge.accepted,
        merge.replaced,
        merge.shadowed,
        merge.rejected_total(),
        merge.pruned
    );

    let catalog = state.snapshot();
    println!("Entries by provenance:");
    for (kind, count) in catalog.count_by_provenance() {
        println!("  {:<12} {:>6}", kind.as_str(), count);
    }
    println!("{} entries written to {}", catalog.len(), state.catalog_path.display());
    Ok(())
}

fn build_oracle(config: &OracleConfig) -> Option<OllamaOracle> {
    if !config.enabled {
        return None;
    }
    match OllamaOracle::new(config) {
        Ok(oracle) => Some(oracle),
        Err(e) => {
            warn!("Oracle disabled: {}", e);
            None
        }
    }
}

fn run_query(state: &CatalogState, phrase: &str, deadline: Option<Instant>, start: bool) -> Result<()> {
    let catalog = state.snapshot();
    let oracle = build_oracle(&state.config.oracle);
    let resolver = Resolver::new(
        &catalog,
        &state.config.matching,
        oracle.as_ref().map(|o| o as &dyn Oracle),
        &state.config.oracle,
    );

    let result = match deadline {
        Some(deadline) => resolver.resolve_before(phrase, deadline),
        None => resolver.resolve(phrase),
    };

    match result {
        MatchResult::Found { entry, stage } => {
            println!("{} [{}] via {}", entry.display_name, entry.key, stage);
            println!("  launch:  {}", entry.launch);
            println!("  process: {}", entry.process_name);
            if start {
                launch::launch(entry)?;
            }
        }
        MatchResult::NoMatch => {
            println!("No application matches {:?}", phrase);
            let suggestions = FuzzyMatcher::new().suggest(&clean_phrase(&phrase.to_lowercase()), &catalog, 5);
            if !suggestions.is_empty() {
                println!("Did you mean: {}", suggestions.join(", "));
            }
        }
    }
    Ok(())
}
