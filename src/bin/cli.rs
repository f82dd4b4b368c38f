//! wbjobs CLI
//!
//! Local execution entry point, suitable for a scheduled job.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use wbjobs::{
    error::{AppError, Result},
    models::{Config, DescriptionFormat},
    pipeline,
    services::{FileRenderer, HttpRenderer, Renderer, feed::FeedReader},
    storage::{FeedStore, LocalStorage, load_seen_or_empty},
};

/// wbjobs - World Bank Group vacancies as RSS
#[derive(Parser, Debug)]
#[command(
    name = "wbjobs",
    version,
    about = "Scrape World Bank Group vacancies into an RSS feed"
)]
struct Cli {
    /// Directory holding the config, feed and seen ledger
    #[arg(short, long, default_value = ".")]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the careers page and write the feed
    Run {
        /// Publish every job, not only ones missing from the previous feed
        #[arg(long)]
        no_dedup: bool,

        /// Description format: summary or narrative
        #[arg(long)]
        format: Option<DescriptionFormat>,

        /// Feed output path, relative to the storage directory
        #[arg(short, long)]
        output: Option<String>,

        /// Page rendering backend
        #[arg(long, value_enum, default_value_t = RendererKind::Chrome)]
        renderer: RendererKind,

        /// Saved HTML snapshot for the file renderer
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Validate configuration
    Validate,

    /// Show the items of a published feed
    Inspect {
        /// Feed path (default: configured output path)
        path: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RendererKind {
    /// Headless Chrome
    Chrome,
    /// Plain HTTP GET
    Http,
    /// Saved HTML snapshot
    File,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn build_renderer(
    kind: RendererKind,
    html: Option<PathBuf>,
    config: &Config,
) -> Result<Box<dyn Renderer>> {
    match kind {
        #[cfg(feature = "browser")]
        RendererKind::Chrome => Ok(Box::new(wbjobs::services::ChromeRenderer::new())),
        #[cfg(not(feature = "browser"))]
        RendererKind::Chrome => Err(AppError::config(
            "built without the 'browser' feature; use --renderer http or file",
        )),
        RendererKind::Http => Ok(Box::new(HttpRenderer::new(&config.render)?)),
        RendererKind::File => {
            let path = html.ok_or_else(|| AppError::config("--renderer file requires --html"))?;
            Ok(Box::new(FileRenderer::new(path)))
        }
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("wbjobs starting...");

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    let mut config = Config::load_or_default(&config_path);
    let storage = LocalStorage::new(&cli.storage_dir);

    match cli.command {
        Command::Run {
            no_dedup,
            format,
            output,
            renderer,
            html,
        } => {
            if no_dedup {
                config.feed.dedup_enabled = false;
            }
            if let Some(format) = format {
                config.feed.description_format = format;
            }
            if let Some(output) = output {
                config.feed.output_path = output;
            }
            config.validate()?;

            let renderer = build_renderer(renderer, html, &config)?;
            let summary =
                pipeline::run_scraper(&config, renderer.as_ref(), &storage, Utc::now()).await?;

            if summary.accepted == 0 {
                log::warn!("No jobs scraped; check the site structure with --verbose");
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({})", config_path.display());
        }

        Command::Inspect { path } => {
            let key = path.unwrap_or_else(|| config.feed.output_path.clone());
            let bytes = storage.read_feed(&key).await?;
            if bytes.is_none() {
                log::info!("No feed found yet.");
                return Ok(());
            }

            let snapshot = FeedReader::read(bytes.as_deref())?;
            log::info!(
                "Feed: {} ({} items)",
                snapshot.channel_title.as_deref().unwrap_or("untitled"),
                snapshot.items.len()
            );
            for item in &snapshot.items {
                log::info!("  [{}] {} -> {}", item.guid, item.title, item.link);
            }

            let ledger = load_seen_or_empty(&storage, &config.feed.seen_path).await;
            log::info!("Seen ledger: {} links", ledger.len());
            if let Some(updated) = ledger.updated_at {
                log::info!("Last updated: {}", updated);
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
