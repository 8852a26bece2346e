use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mixwheel_server::catalog::SqliteTrackCatalog;
use mixwheel_server::config::{AppConfig, CliConfig, FileConfig};
use mixwheel_server::gateway::MediaGatewayClient;
use mixwheel_server::interactions::SqliteInteractionStore;
use mixwheel_server::profiles::{spawn_rebuild_worker, ProfileBuilder, SqliteProfileStore};
use mixwheel_server::recommend::{EngineSettings, RecommendationEngine};
use mixwheel_server::server::{run_server, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite databases (catalog, interactions, profiles).
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Base URL of the media gateway service.
    #[clap(long)]
    pub gateway_url: Option<String>,

    /// Timeout in seconds for media gateway requests.
    #[clap(long, default_value_t = 8)]
    pub gateway_timeout_sec: u64,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to a TOML config file; its values override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        logging_level: cli_args.logging_level,
        gateway_url: cli_args.gateway_url,
        gateway_timeout_sec: cli_args.gateway_timeout_sec,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite databases in {:?}...", config.db_dir);
    let catalog = Arc::new(SqliteTrackCatalog::new(config.catalog_db_path())?);
    let interactions = Arc::new(SqliteInteractionStore::new(config.interactions_db_path())?);
    let profiles = Arc::new(SqliteProfileStore::new(config.profiles_db_path())?);

    info!("Media gateway configured at {}", config.gateway_url);
    let gateway = Arc::new(MediaGatewayClient::new(
        config.gateway_url.clone(),
        config.gateway_timeout_sec,
    )?);

    let builder = Arc::new(ProfileBuilder::new(
        interactions.clone(),
        catalog.clone(),
        profiles.clone(),
    ));

    let engine = Arc::new(RecommendationEngine::new(
        catalog.clone(),
        interactions.clone(),
        profiles.clone(),
        builder.clone(),
        gateway.clone(),
        gateway,
        EngineSettings {
            mmr_lambda: config.recommender.mmr_lambda,
            profile_stale_hours: config.recommender.profile_stale_hours,
        },
    ));

    info!("Building diversifier vocabulary...");
    let tokens = engine.rebuild_vocabulary()?;
    info!("Vocabulary ready, {} tokens", tokens);

    let rebuild_queue = spawn_rebuild_worker(builder);

    // Periodic vocabulary refresh picks up tracks added by probing.
    {
        let engine = engine.clone();
        let interval_hours = config.recommender.vocabulary_refresh_hours;
        tokio::spawn(async move {
            let interval = Duration::from_secs(interval_hours * 60 * 60);
            let mut ticker = tokio::time::interval(interval);

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match engine.rebuild_vocabulary() {
                    Ok(tokens) => info!("Refreshed vocabulary, {} tokens", tokens),
                    Err(e) => error!("Failed to refresh vocabulary: {:#}", e),
                }
            }
        });
    }

    info!("Ready to serve at port {}!", config.port);
    run_server(
        catalog,
        interactions,
        profiles,
        engine,
        rebuild_queue,
        config.logging_level,
        config.port,
        config.recommender.explore_probability,
    )
    .await
}
