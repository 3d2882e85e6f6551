mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use photostate_core::{RelationType, ServerState, Views};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Photostate: browse a catalog snapshot and check search queries
#[derive(Parser)]
#[command(name = "photostate", version, about)]
struct Cli {
    /// Path to the server state snapshot (JSON)
    #[arg(long, default_value_t = default_state_path())]
    state: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalogs with their album, tag, person and search counts
    Catalogs,
    /// Show the album tree of a catalog
    Tree {
        /// Catalog ID
        catalog: String,
        /// Show the tag tree instead
        #[arg(long)]
        tags: bool,
    },
    /// Show a saved search and its query
    Search {
        /// Saved search ID
        id: String,
    },
    /// Inspect search queries
    Query {
        #[command(subcommand)]
        action: QueryAction,
    },
}

#[derive(Subcommand)]
enum QueryAction {
    /// Decode and validate a query JSON file
    Check {
        /// Path to the query file
        path: PathBuf,
    },
    /// List searchable fields with their modifiers and operators
    Fields {
        /// Relation scope (omit for media fields)
        #[arg(long, value_enum)]
        relation: Option<RelationArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RelationArg {
    Album,
    Tag,
    Person,
}

impl From<RelationArg> for RelationType {
    fn from(arg: RelationArg) -> Self {
        match arg {
            RelationArg::Album => RelationType::Album,
            RelationArg::Tag => RelationType::Tag,
            RelationArg::Person => RelationType::Person,
        }
    }
}

fn default_state_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".photostate")
        .join("state.json")
        .to_string_lossy()
        .to_string()
}

fn load_state(path: &str) -> Result<std::sync::Arc<ServerState>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state snapshot {path}"))?;
    ServerState::from_json(&json).with_context(|| format!("invalid state snapshot {path}"))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let views = Views::new();

    match cli.command {
        Commands::Catalogs => commands::catalogs::run(&views, &load_state(&cli.state)?)?,
        Commands::Tree { catalog, tags } => {
            commands::tree::run(&views, &load_state(&cli.state)?, &catalog, tags)?
        }
        Commands::Search { id } => commands::search::run(&views, &load_state(&cli.state)?, &id)?,
        Commands::Query { action } => match action {
            QueryAction::Check { path } => commands::query::check(&path)?,
            QueryAction::Fields { relation } => commands::query::fields(relation.map(Into::into)),
        },
    }

    Ok(())
}
