//! # Federated Search CLI (`fsearch`)
//!
//! ## Usage
//!
//! ```bash
//! fsearch --config ./config/fsearch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fsearch init` | Create the SQLite database and run schema migrations |
//! | `fsearch load <source> <file>` | Load JSON records into a source's collection |
//! | `fsearch sources` | List sources with record counts |
//! | `fsearch search "<query>" --user <id>` | Run a federated search |
//! | `fsearch suggest <prefix>` | Autocomplete from search history |
//! | `fsearch popular` | Most frequent searches of the last 7 days |
//! | `fsearch history <user>` | A user's recent searches |
//! | `fsearch serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use federated_search::{config, load, migrate, search_cmd, server, sources};

/// Federated Search CLI: natural-language search across content sources.
///
/// All commands accept a `--config` flag pointing to a TOML configuration file.
#[derive(Parser)]
#[command(name = "fsearch", version, about = "Federated natural-language search")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Load a JSON array or JSON-lines file of records into a source.
    ///
    /// Records without an `id` are assigned a UUID. Existing records with the
    /// same id are replaced.
    Load {
        /// Source name: files, people, events, forumPosts, stories, videos,
        /// equipment, suppliers.
        source: String,
        /// Path to the JSON file.
        file: PathBuf,
    },

    /// List sources, their collections, and record counts.
    Sources,

    /// Run a search through the full pipeline.
    Search {
        /// The natural-language query.
        query: String,

        /// User the search is attributed to (cache and history key).
        #[arg(long, default_value = "cli")]
        user: String,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Suggest past queries starting with a prefix.
    Suggest {
        prefix: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Show the most frequent searches of the last 7 days.
    Popular {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show a user's most recent searches.
    History {
        user: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("federated_search=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load { source, file } => {
            load::run_load(&cfg, &source, &file).await?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Search { query, user, json } => {
            search_cmd::run_search(&cfg, &query, &user, json).await?;
        }
        Commands::Suggest { prefix, limit } => {
            search_cmd::run_suggest(&cfg, &prefix, limit).await?;
        }
        Commands::Popular { limit } => {
            search_cmd::run_popular(&cfg, limit).await?;
        }
        Commands::History { user, limit } => {
            search_cmd::run_history(&cfg, &user, limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
