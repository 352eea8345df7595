use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::app::{AppContext, NewsError, Result};
use crate::domain::{non_blank, Article, Edition, PagingSnapshot, QueryParameters};
use crate::paging::{EverythingSource, HeadlinesSource, PageSource, PagingEngine};
use crate::query::QueryController;

pub async fn show_headlines(ctx: &AppContext, category: Option<String>, pages: u32) -> Result<()> {
    let source = HeadlinesSource::new(ctx.api.clone(), ctx.config.api.country.clone(), category)
        .limits(ctx.limits());
    let snapshot = load_pages(Arc::new(source), ctx.page_size(), pages).await?;

    if snapshot.is_empty() {
        println!("No headlines");
        return Ok(());
    }
    print_articles(&snapshot.items, 0);
    Ok(())
}

pub async fn search(
    ctx: &AppContext,
    query: Option<String>,
    from: Option<String>,
    to: Option<String>,
    language: Option<String>,
    pages: u32,
) -> Result<()> {
    let params = QueryParameters {
        query: query.unwrap_or_default(),
        date_from: non_blank(from),
        date_to: non_blank(to),
        language: non_blank(language).or_else(|| ctx.config.api.language.clone()),
        ..Default::default()
    };
    let source = EverythingSource::for_parameters(ctx.api.clone(), &params, ctx.limits());
    println!("Searching for {}", source.query());
    let snapshot = load_pages(Arc::new(source), ctx.page_size(), pages).await?;

    if snapshot.is_empty() {
        println!("No articles found");
        return Ok(());
    }
    print_articles(&snapshot.items, 0);
    Ok(())
}

/// Refresh, then append until `pages` pages are loaded or the stream ends.
async fn load_pages(source: Arc<dyn PageSource>, page_size: u32, pages: u32) -> Result<PagingSnapshot> {
    let engine = PagingEngine::new(source, page_size);
    engine.refresh().await;
    let mut snapshot = engine.settled().await;

    if let Some(e) = snapshot.refresh.error() {
        return Err(NewsError::Other(format!("Loading failed: {}", e)));
    }

    for _ in 1..pages.max(1) {
        if snapshot.end_of_stream {
            break;
        }
        engine.load_more().await;
        snapshot = engine.settled().await;
        if let Some(e) = snapshot.append.error() {
            eprintln!("Stopped after {} articles: {}", snapshot.len(), e);
            break;
        }
    }

    Ok(snapshot)
}

fn print_articles(items: &[Article], offset: usize) {
    for (i, article) in items.iter().enumerate().skip(offset) {
        let date = article
            .published()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "          ".to_string());
        let source = article.source_name().unwrap_or("-");

        println!("{:>3}. {} {} [{}]", i + 1, date, article.display_title(), source);
        if let Some(url) = article.key() {
            println!("     {}", url);
        }
    }
}

fn print_section(title: &str, snapshot: &PagingSnapshot) {
    println!("== {} ({} articles) ==", title, snapshot.len());
    if let Some(message) = snapshot.error_message() {
        println!("   error: {} (type :retry)", message);
    }
    print_articles(&snapshot.items, 0);
    if snapshot.end_of_stream && !snapshot.is_empty() {
        println!("   (end of results)");
    }
}

/// One line of input in a browse session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
    Query(String),
    Category(Option<String>),
    Language(Option<String>),
    From(Option<String>),
    To(Option<String>),
    Edition(Edition),
    More,
    Retry,
    Refresh,
    Help,
    Quit,
    Unknown(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_browse_command(line: &str) -> Option<BrowseCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(rest) = line.strip_prefix(':') else {
        return Some(BrowseCommand::Query(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, non_blank(Some(arg.trim().to_string()))),
        None => (rest, None),
    };

    let command = match name {
        "cat" | "category" => BrowseCommand::Category(arg),
        "lang" | "language" => BrowseCommand::Language(arg),
        "from" => BrowseCommand::From(arg),
        "to" => BrowseCommand::To(arg),
        "edition" => match arg.as_deref().map(str::parse::<Edition>) {
            Some(Ok(edition)) => BrowseCommand::Edition(edition),
            _ => BrowseCommand::Unknown(line.to_string()),
        },
        "more" | "m" => BrowseCommand::More,
        "retry" => BrowseCommand::Retry,
        "refresh" | "r" => BrowseCommand::Refresh,
        "help" | "h" => BrowseCommand::Help,
        "quit" | "q" => BrowseCommand::Quit,
        _ => BrowseCommand::Unknown(line.to_string()),
    };
    Some(command)
}

const BROWSE_HELP: &str = "\
  <text>                  search for <text> (empty text = category keywords)
  :cat <name>             category filter, no name clears it
  :lang <code>            language filter, no code clears it
  :from <date> / :to <date>  publication window (YYYY-MM-DD)
  :edition national|international
  :more                   load the next page of search results
  :retry                  retry the last failed load
  :refresh                reload from the first page
  :quit";

pub async fn browse(ctx: &AppContext) -> Result<()> {
    let controller = ctx.query_controller();
    let (headlines, everything) = controller.settled().await;
    print_section("Headlines", &headlines);
    print_section("Search", &everything);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_browse_command(&line) else {
            prompt();
            continue;
        };
        debug!("Browse command: {:?}", command);

        if !apply_browse_command(&controller, command).await {
            break;
        }
        prompt();
    }

    Ok(())
}

/// Run one command against the session; `false` ends it.
async fn apply_browse_command(controller: &QueryController, command: BrowseCommand) -> bool {
    let params = controller.parameters();

    match command {
        BrowseCommand::Query(query) => controller.set_query(query),
        BrowseCommand::Category(category) => controller.set_category(category),
        BrowseCommand::Language(language) => controller.set_language(language),
        BrowseCommand::From(from) => controller.set_date_window(from, params.date_to),
        BrowseCommand::To(to) => controller.set_date_window(params.date_from, to),
        BrowseCommand::Edition(edition) => controller.set_edition(edition),
        BrowseCommand::More => {
            let before = controller.everything().snapshot().len();
            controller.everything().load_more().await;
            let snapshot = controller.everything().settled().await;
            match snapshot.append.error() {
                Some(e) => println!("   error: {} (type :retry)", e),
                None if snapshot.len() == before => println!("   (no more results)"),
                None => print_articles(&snapshot.items, before),
            }
            return true;
        }
        BrowseCommand::Retry => {
            controller.headlines().retry().await;
            controller.everything().retry().await;
        }
        BrowseCommand::Refresh => {
            controller.headlines().refresh().await;
            controller.everything().refresh().await;
        }
        BrowseCommand::Help => {
            println!("{}", BROWSE_HELP);
            return true;
        }
        BrowseCommand::Quit => return false,
        BrowseCommand::Unknown(line) => {
            println!("Unknown command: {} (type :help)", line);
            return true;
        }
    }

    let (headlines, everything) = controller.settled().await;
    let current = controller.parameters();
    if current.category != params.category || current.edition != params.edition {
        print_section("Headlines", &headlines);
    }
    print_section("Search", &everything);
    true
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_sets_query() {
        assert_eq!(
            parse_browse_command("  banjir jakarta "),
            Some(BrowseCommand::Query("banjir jakarta".into()))
        );
        assert_eq!(parse_browse_command("   "), None);
    }

    #[test]
    fn test_filter_commands_take_optional_argument() {
        assert_eq!(
            parse_browse_command(":cat business"),
            Some(BrowseCommand::Category(Some("business".into())))
        );
        assert_eq!(parse_browse_command(":cat"), Some(BrowseCommand::Category(None)));
        assert_eq!(
            parse_browse_command(":from 2024-01-01"),
            Some(BrowseCommand::From(Some("2024-01-01".into())))
        );
        assert_eq!(parse_browse_command(":lang  "), Some(BrowseCommand::Language(None)));
    }

    #[test]
    fn test_edition_command() {
        assert_eq!(
            parse_browse_command(":edition national"),
            Some(BrowseCommand::Edition(Edition::National))
        );
        assert_eq!(
            parse_browse_command(":edition lunar"),
            Some(BrowseCommand::Unknown(":edition lunar".into()))
        );
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(parse_browse_command(":more"), Some(BrowseCommand::More));
        assert_eq!(parse_browse_command(":retry"), Some(BrowseCommand::Retry));
        assert_eq!(parse_browse_command(":refresh"), Some(BrowseCommand::Refresh));
        assert_eq!(parse_browse_command(":q"), Some(BrowseCommand::Quit));
        assert_eq!(
            parse_browse_command(":bogus"),
            Some(BrowseCommand::Unknown(":bogus".into()))
        );
    }
}
