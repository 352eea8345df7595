pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "newswire")]
#[command(about = "Rate-limited news headlines and search from the terminal", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/newswire/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show top headlines for the configured country
    Headlines {
        /// Category filter (e.g. business, technology, science)
        #[arg(short, long)]
        category: Option<String>,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Search all articles
    Search {
        /// Search terms (default: category keywords)
        query: Option<String>,

        /// Oldest publication date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Newest publication date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Two-letter language code
        #[arg(short, long)]
        language: Option<String>,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Interactive session: type to search, `:help` for commands
    Browse,
}
