use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newswire::app::AppContext;
use newswire::cli::{commands, Cli, Commands};
use newswire::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Headlines { category, pages } => {
            commands::show_headlines(&ctx, category, pages).await?;
        }
        Commands::Search {
            query,
            from,
            to,
            language,
            pages,
        } => {
            commands::search(&ctx, query, from, to, language, pages).await?;
        }
        Commands::Browse => {
            commands::browse(&ctx).await?;
        }
    }

    Ok(())
}
