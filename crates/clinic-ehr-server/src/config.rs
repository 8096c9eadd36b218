//! Server configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional `ehr.toml`
//! (or the file named by `EHR_CONFIG`), then `EHR__*` environment variables
//! such as `EHR__BIND_ADDR` or `EHR__GOOGLE__CLIENT_ID`. A `.env` file is
//! loaded into the environment first when present.

use std::path::PathBuf;

use clinic_ehr_core::RetentionPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "ehr.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub backup_dir: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_level: String,
    pub log_json: bool,
    #[serde(default)]
    pub retention: RetentionPolicy,
    pub google: GoogleConfig,
}

/// OAuth client and endpoints for Google Calendar.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl GoogleConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.redirect_uri.is_empty()
    }
}

impl ServerConfig {
    /// Load from the default locations.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let file = std::env::var("EHR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&file)
    }

    /// Load with `file` as the optional config file.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("EHR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let retention = RetentionPolicy::default();
        Config::builder()
            .set_default("bind_addr", "127.0.0.1:8080")?
            .set_default("database_path", "clinic.db")?
            .set_default("backup_dir", "backups")?
            .set_default("log_level", "info")?
            .set_default("log_json", false)?
            .set_default("retention.daily", retention.daily as i64)?
            .set_default("retention.weekly", retention.weekly as i64)?
            .set_default("retention.monthly", retention.monthly as i64)?
            .set_default("retention.yearly", retention.yearly as i64)?
            .set_default("google.auth_url", "https://accounts.google.com/o/oauth2/v2/auth")?
            .set_default("google.token_url", "https://oauth2.googleapis.com/token")?
            .set_default("google.api_base_url", "https://www.googleapis.com/calendar/v3")
    }
}
