mod file_config;

pub use file_config::{FileConfig, RecommenderConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub gateway_url: Option<String>,
    pub gateway_timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub gateway_url: String,
    pub gateway_timeout_sec: u64,

    // Recommender settings (with defaults)
    pub recommender: RecommenderSettings,
}

#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    pub explore_probability: f64,
    pub mmr_lambda: f64,
    pub profile_stale_hours: i64,
    pub vocabulary_refresh_hours: u64,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            explore_probability: 0.15,
            mmr_lambda: 0.8,
            profile_stale_hours: 24,
            vocabulary_refresh_hours: 6,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let gateway_url = file
            .gateway_url
            .or_else(|| cli.gateway_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("gateway_url must be specified via --gateway-url or in config file")
            })?;

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let gateway_timeout_sec = file.gateway_timeout_sec.unwrap_or(cli.gateway_timeout_sec);

        // Recommender settings - merge file config with defaults
        let rec_file = file.recommender.unwrap_or_default();
        let defaults = RecommenderSettings::default();
        let recommender = RecommenderSettings {
            explore_probability: rec_file
                .explore_probability
                .unwrap_or(defaults.explore_probability)
                .clamp(0.0, 1.0),
            mmr_lambda: rec_file
                .mmr_lambda
                .unwrap_or(defaults.mmr_lambda)
                .clamp(0.0, 1.0),
            profile_stale_hours: rec_file
                .profile_stale_hours
                .unwrap_or(defaults.profile_stale_hours)
                .max(1),
            vocabulary_refresh_hours: rec_file
                .vocabulary_refresh_hours
                .unwrap_or(defaults.vocabulary_refresh_hours)
                .max(1),
        };

        Ok(Self {
            db_dir,
            port,
            logging_level,
            gateway_url,
            gateway_timeout_sec,
            recommender,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn interactions_db_path(&self) -> PathBuf {
        self.db_dir.join("interactions.db")
    }

    pub fn profiles_db_path(&self) -> PathBuf {
        self.db_dir.join("profiles.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
