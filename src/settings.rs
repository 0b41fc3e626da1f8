//! Process settings.
//!
//! Loaded in order: built-in defaults, an optional `brewstock.toml` in the
//! working directory, then `BREWSTOCK_*` environment variables.

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// SQLite file holding the state document.
    pub database_path: PathBuf,

    /// JSON dump used when the database is still empty.
    pub seed_path: Option<PathBuf>,

    /// `env_logger` filter, overridden by `RUST_LOG`.
    pub log_filter: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(Some("brewstock"), Environment::with_prefix("BREWSTOCK"))
    }

    fn from_sources(file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("database_path", "brewstock.db")?
            .set_default("log_filter", "info")?;
        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }
        builder.add_source(env.try_parsing(true)).build()?.try_deserialize()
    }
}
