//! CLI Configuration
//!
//! Loaded from an optional file, `config/default`, `config/local`, then
//! `PACTLINE__*` environment variables (e.g. `PACTLINE__LOGGING__LEVEL=debug`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PactlineConfig {
    /// JSON file holding agreements, ledger and clock
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Named identity that administers the payment token allow-list
    #[serde(default = "default_admin_label")]
    pub admin_label: String,

    /// Named identity whose account holds escrowed payments
    #[serde(default = "default_custody_label")]
    pub custody_label: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PactlineConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            admin_label: default_admin_label(),
            custody_label: default_custody_label(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_state_file() -> PathBuf {
    PathBuf::from("pactline-state.json")
}

fn default_admin_label() -> String {
    "admin".to_string()
}

fn default_custody_label() -> String {
    "custody".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl PactlineConfig {
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        // An explicit file overrides the default locations
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PACTLINE")
                .separator("__")
                .try_parsing(true),
        );

        let config: PactlineConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
