use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cinescout::clients::{OmdbClient, TmdbClient, WikipediaClient, YoutubeClient};
use cinescout::config::Config;
use cinescout::scraper::{CrawlRunner, DelayPolicy, PageFetcher};
use cinescout::storage::{SharedMovieStore, SqliteMovieStore};

#[derive(Parser)]
#[command(name = "cinescout", version, about = "Movie metadata aggregation")]
struct Cli {
    /// Path to a TOML config file; environment variables apply on top
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one crawl pass over a configured target
    Crawl {
        /// Target id to crawl
        #[arg(short, long)]
        target: i64,
    },
    /// Manage scrape targets
    #[command(subcommand)]
    Target(TargetCommand),
    /// Look up one movie through OMDb (store fallback applies)
    Lookup {
        title: String,
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Search movies through TMDb (store fallback applies)
    Search {
        query: String,
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Find a trailer through YouTube (store fallback applies)
    Trailer {
        title: String,
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Trending movies through TMDb
    Trending {
        /// Trending window: day or week
        #[arg(short, long, default_value = "week")]
        window: String,
    },
    /// Film facts from the Wikipedia infobox
    Wiki { title: String },
}

#[derive(Subcommand)]
enum TargetCommand {
    /// Register a new scrape target
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        base_url: String,
        /// Scraping rules as a JSON object
        #[arg(short, long, default_value = "{}")]
        rules: String,
    },
    /// List configured targets
    List,
    /// Show recent crawl logs for a target
    Logs {
        target: i64,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid log level")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    init_logging(&config)?;

    let store: SharedMovieStore =
        Arc::new(SqliteMovieStore::new(&config.database.sqlite_path)?);

    match cli.command {
        Command::Crawl { target } => {
            let fetcher = PageFetcher::new(&config.scraper)?;
            let delay = DelayPolicy::from_config(&config.scraper);
            let runner = CrawlRunner::new(store, fetcher, delay, target)?;
            let report = runner.run().await;
            print_json(&report)?;
        }
        Command::Target(cmd) => match cmd {
            TargetCommand::Add { name, base_url, rules } => {
                let rules: serde_json::Value =
                    serde_json::from_str(&rules).context("rules must be valid JSON")?;
                let id = store.add_target(&name, &base_url, &rules)?;
                info!(id, name, "target registered");
                println!("registered target {id}");
            }
            TargetCommand::List => {
                let targets = store.list_targets()?;
                print_json(&targets)?;
            }
            TargetCommand::Logs { target, limit } => {
                let logs = store.logs_for_target(target, limit)?;
                print_json(&logs)?;
            }
        },
        Command::Lookup { title, year } => {
            let client = OmdbClient::new(&config.apis, Some(store))?;
            match client.search_movie(&title, year).await {
                Some(result) => print_json(&result)?,
                None => println!("no match for {title:?}"),
            }
        }
        Command::Search { query, year } => {
            let client = TmdbClient::new(&config.apis, Some(store))?;
            let results = client.search_movies(&query, year).await;
            print_json(&results)?;
        }
        Command::Trailer { title, year } => {
            let client = YoutubeClient::new(&config.apis, Some(store))?;
            match client.search_movie_trailer(&title, year).await {
                Some(result) => print_json(&result)?,
                None => println!("no trailer found for {title:?}"),
            }
        }
        Command::Trending { window } => {
            let client = TmdbClient::new(&config.apis, Some(store))?;
            let results = client.trending(&window).await;
            print_json(&results)?;
        }
        Command::Wiki { title } => {
            let client = WikipediaClient::new(&config.apis)?;
            match client.movie_infobox(&title).await {
                Some(result) => print_json(&result)?,
                None => println!("no infobox found for {title:?}"),
            }
        }
    }
    Ok(())
}
