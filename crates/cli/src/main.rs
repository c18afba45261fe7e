//! Brico CLI - database migrations and catalog/search maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! brico-cli migrate
//!
//! # Rebuild the product search index
//! brico-cli reindex --batch-size 500
//!
//! # Apply index settings (ranking, synonyms, stop words) only
//! brico-cli configure-index --data-dir data/search
//!
//! # Assign missing product slugs, then verify none are left
//! brico-cli slugs backfill
//! brico-cli slugs check
//!
//! # Keep one product's document in step after a catalog write
//! brico-cli index upsert 42
//! brico-cli index delete 42
//! ```
//!
//! Configuration comes from the same environment variables as the
//! storefront server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "brico-cli")]
#[command(author, version, about = "Brico storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Rebuild the product search index from the catalog
    Reindex {
        /// Products per batch (default: `REINDEX_BATCH_SIZE`)
        #[arg(short, long)]
        batch_size: Option<u32>,
    },
    /// Apply search index settings without touching documents
    ConfigureIndex {
        /// Directory holding `synonyms.json` and `stopwords.json`
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Synonyms file, overriding the data directory
        #[arg(long)]
        synonyms: Option<PathBuf>,

        /// Stop words file, overriding the data directory
        #[arg(long)]
        stop_words: Option<PathBuf>,
    },
    /// Manage product slugs
    Slugs {
        #[command(subcommand)]
        action: SlugAction,
    },
    /// Maintain single product documents
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
}

#[derive(Subcommand)]
enum SlugAction {
    /// Assign a unique slug to every product without one
    Backfill {
        #[arg(short, long)]
        batch_size: Option<u32>,
    },
    /// Fail if any product has no slug
    Check {
        /// Maximum number of offenders to list
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Project a product and write it to the index
    Upsert { id: i32 },
    /// Remove a product's document
    Delete { id: i32 },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Reindex { batch_size } => commands::index::reindex(batch_size).await,
        Commands::ConfigureIndex {
            data_dir,
            synonyms,
            stop_words,
        } => commands::index::configure(data_dir, synonyms, stop_words).await,
        Commands::Slugs { action } => match action {
            SlugAction::Backfill { batch_size } => commands::slugs::backfill(batch_size).await,
            SlugAction::Check { limit } => commands::slugs::check(limit).await,
        },
        Commands::Index { action } => match action {
            IndexAction::Upsert { id } => commands::index::upsert(id).await,
            IndexAction::Delete { id } => commands::index::delete(id).await,
        },
    }
}
