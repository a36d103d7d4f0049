//! recall CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use recall_core::model::NewItem;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "recall", version, about = "Spaced-repetition vocabulary trainer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and example deck
    Init,

    /// Validate deck TOML files
    Validate {
        /// Path to a deck file or directory
        #[arg(long)]
        deck: PathBuf,
    },

    /// Import words from deck files
    Import {
        /// Path to a deck file or directory
        #[arg(long)]
        deck: PathBuf,

        /// Learner the words belong to
        #[arg(long)]
        owner: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Add a single word
    Add {
        #[arg(long)]
        owner: i64,

        /// Word in the language being learned
        #[arg(long)]
        original: String,

        /// Expected answer
        #[arg(long)]
        translation: String,

        /// Example sentence
        #[arg(long)]
        example: Option<String>,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        part_of_speech: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List all words with their mastery
    Words {
        #[arg(long)]
        owner: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete a word by id
    Delete {
        #[arg(long)]
        owner: i64,

        /// Word id, as shown by `recall words`
        #[arg(long)]
        id: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List words due for review
    Due {
        #[arg(long)]
        owner: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run an interactive review session
    Review {
        #[arg(long)]
        owner: i64,

        /// Words per session (default from config, at most 20)
        #[arg(long)]
        limit: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show learning statistics
    Stats {
        #[arg(long)]
        owner: i64,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Remove abandoned review sessions
    Cleanup {
        /// Maximum idle time in hours (default from config)
        #[arg(long)]
        older_than_hours: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recall=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { deck } => commands::validate::execute(deck),
        Commands::Import {
            deck,
            owner,
            config,
        } => commands::import::execute(deck, owner, config).await,
        Commands::Add {
            owner,
            original,
            translation,
            example,
            language,
            part_of_speech,
            config,
        } => {
            let word = NewItem {
                owner,
                original,
                translation,
                language,
                part_of_speech,
                example,
            };
            commands::add::execute(word, config).await
        }
        Commands::Words { owner, config } => commands::words::execute(owner, config).await,
        Commands::Delete { owner, id, config } => {
            commands::delete::execute(owner, id, config).await
        }
        Commands::Due { owner, config } => commands::due::execute(owner, config).await,
        Commands::Review {
            owner,
            limit,
            config,
        } => commands::review::execute(owner, limit, config).await,
        Commands::Stats { owner, config } => commands::stats::execute(owner, config).await,
        Commands::Cleanup {
            older_than_hours,
            config,
        } => commands::cleanup::execute(older_than_hours, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
