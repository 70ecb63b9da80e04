use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vinyl_drop::config::{AppConfig, CliConfig, FileConfig};
use vinyl_drop::ingestion::{
    EnrichmentRun, IngestionOrchestrator, LogNotifier, RunContext,
};
use vinyl_drop::release_store::{ReleaseQuery, ReleaseStore, SortOrder, SqliteReleaseStore};
use vinyl_drop::runner::{build_source_runs, discogs_client};

/// How long `ingest` waits for in-flight release notifications before exiting.
const NOTIFICATION_GRACE: Duration = Duration::from_secs(10);

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

fn parse_sort(s: &str) -> Result<SortOrder> {
    SortOrder::parse(s).ok_or_else(|| {
        anyhow::anyhow!("Unknown sort order {:?} (date, artist, price, popularity)", s)
    })
}

#[derive(Parser, Debug)]
#[clap(version, about = "Collects new vinyl releases from Reddit and Discogs")]
struct CliArgs {
    /// Path to a TOML config file. Values in it override command line flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding releases.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// User-Agent sent to Reddit and Discogs.
    #[clap(long)]
    pub user_agent: Option<String>,

    #[clap(long)]
    pub http_timeout_sec: Option<u64>,

    #[clap(long, env = "DISCOGS_CONSUMER_KEY", hide_env_values = true)]
    pub discogs_consumer_key: Option<String>,

    #[clap(long, env = "DISCOGS_CONSUMER_SECRET", hide_env_values = true)]
    pub discogs_consumer_secret: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every configured source once and merge the results.
    Ingest {
        #[clap(long)]
        skip_discogs: bool,
    },
    /// Fill missing artwork, price and label of Reddit releases from Discogs.
    Enrich {
        #[clap(long)]
        limit: Option<usize>,
    },
    /// Print stored releases as JSON.
    List {
        #[clap(long)]
        genre: Option<String>,
        #[clap(long)]
        format: Option<String>,
        #[clap(long)]
        search: Option<String>,
        #[clap(long, value_parser = parse_sort, default_value = "date")]
        sort: SortOrder,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long, default_value_t = 0)]
        offset: usize,
    },
    /// Print store statistics as JSON.
    Stats,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            user_agent: self.user_agent.clone(),
            http_timeout_sec: self.http_timeout_sec,
            discogs_consumer_key: self.discogs_consumer_key.clone(),
            discogs_consumer_secret: self.discogs_consumer_secret.clone(),
        }
    }
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, stopping after the current record...");
                token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let db_path = config.releases_db_path();
    info!("Opening release database at {:?}...", db_path);
    let store: Arc<dyn ReleaseStore> = Arc::new(SqliteReleaseStore::new(&db_path)?);

    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());

    match cli_args.command {
        Command::Ingest { skip_discogs } => {
            let runs = build_source_runs(&config, skip_discogs)?;
            let ctx = RunContext::new(token, store).with_notifier(Arc::new(LogNotifier));
            let result = IngestionOrchestrator::new(ctx.clone()).run(&runs).await;
            ctx.finish_notifications(NOTIFICATION_GRACE).await;
            let report = result?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Enrich { limit } => {
            let Some(client) = discogs_client(&config)? else {
                bail!("Enrichment needs Discogs enabled with a consumer key and secret");
            };
            let limit = limit.unwrap_or(config.discogs.enrich_limit);
            let report = EnrichmentRun::new(RunContext::new(token, store), client)
                .run(limit)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::List {
            genre,
            format,
            search,
            sort,
            limit,
            offset,
        } => {
            let query = ReleaseQuery {
                genre,
                format,
                search,
                sort,
                limit,
                offset,
            };
            let page = store.query_releases(&query)?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Command::Stats => {
            let stats = store.release_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
