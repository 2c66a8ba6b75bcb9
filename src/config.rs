//! Environment-variable configuration for both loops.
//!
//! All settings come from `GPSC_*` environment variables. Each loop validates
//! only the variables it needs, so a partially configured process can still
//! run one of the two loops.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const ENV_USER: &str = "GPSC_USER";
pub const ENV_CLIENT_ID: &str = "GPSC_CLIENTID";
pub const ENV_CLIENT_SECRET: &str = "GPSC_CLIENTSECRET";
pub const ENV_MEDIA_FOLDER: &str = "GPSC_MEDIAFOLDERPATH";
pub const ENV_ALBUMS: &str = "GPSC_ALBUMSTOSYNC";
pub const ENV_LEDGER_PATH: &str = "GPSC_SYNCEDIDSFILEPATH";
pub const ENV_SYNC_MINUTES: &str = "GPSC_TIMEBETWEENMINUTES";
pub const ENV_TOKEN_STORE: &str = "GPSC_CONFIGPATH";

/// External postcard tool invoked by the dispatch loop.
pub const DEFAULT_DISPATCH_COMMAND: &str = "postcards";
/// Config file path passed to the tool's `--config` flag.
pub const DEFAULT_DISPATCH_CONFIG: &str = "/config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing or blank environment variable(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("{var} must be an integer number of minutes, got '{value}'")]
    InvalidInterval { var: &'static str, value: String },
}

/// Settings for the sync loop.
pub struct SyncConfig {
    pub user: String,
    pub client_id: String,
    pub client_secret: String,
    pub media_folder: PathBuf,
    pub albums: Vec<String>,
    pub ledger_path: PathBuf,
    pub token_store: PathBuf,
    pub sync_interval: Duration,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("user", &self.user)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("media_folder", &self.media_folder)
            .field("albums", &self.albums)
            .field("ledger_path", &self.ledger_path)
            .field("token_store", &self.token_store)
            .field("sync_interval", &self.sync_interval)
            .finish()
    }
}

/// Settings for the dispatch loop.
#[derive(Debug)]
pub struct DispatchConfig {
    pub media_folder: PathBuf,
    /// Tool binary name; overridable in tests.
    pub command: String,
    pub tool_config: PathBuf,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Fetch an environment variable, treating blank values as absent.
fn non_blank(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Option<String> {
    lookup(var).filter(|v| !v.trim().is_empty())
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup so tests don't race on the
    /// process environment.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut require = |var| {
            let value = non_blank(lookup, var);
            if value.is_none() {
                missing.push(var);
            }
            value.unwrap_or_default()
        };

        let user = require(ENV_USER);
        let client_id = require(ENV_CLIENT_ID);
        let client_secret = require(ENV_CLIENT_SECRET);
        let media_folder = require(ENV_MEDIA_FOLDER);
        let albums_raw = require(ENV_ALBUMS);
        let ledger_path = require(ENV_LEDGER_PATH);
        let minutes_raw = require(ENV_SYNC_MINUTES);
        let token_store = require(ENV_TOKEN_STORE);

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let minutes: u64 = minutes_raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidInterval {
                var: ENV_SYNC_MINUTES,
                value: minutes_raw.clone(),
            })?;

        let albums = albums_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            user,
            client_id,
            client_secret,
            media_folder: expand_tilde(&media_folder),
            albums,
            ledger_path: expand_tilde(&ledger_path),
            token_store: expand_tilde(&token_store),
            sync_interval: Duration::from_secs(minutes * 60),
        })
    }
}

impl DispatchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let media_folder = non_blank(lookup, ENV_MEDIA_FOLDER)
            .ok_or(ConfigError::Missing(vec![ENV_MEDIA_FOLDER]))?;
        Ok(Self {
            media_folder: expand_tilde(&media_folder),
            command: DEFAULT_DISPATCH_COMMAND.to_string(),
            tool_config: PathBuf::from(DEFAULT_DISPATCH_CONFIG),
        })
    }
}
