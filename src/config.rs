//! Loader configuration file support
//!
//! Handles parsing of `.statcast-load.toml` configuration files and
//! environment variable overrides. Every setting has a default, so the
//! file is optional. Credentials are never part of the configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::acquisition::{DEFAULT_REGISTER_URL, DEFAULT_SAVANT_URL};
use crate::database::postgres::DEFAULT_PORT;
use crate::database::{ConnectionParams, ExistsPolicy};
use crate::staging::DEFAULT_SAMPLE_SIZE;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".statcast-load.toml";

/// Default staging artifact path
pub const DEFAULT_STAGING_FILE: &str = ".statcast.csv";

/// Environment variable for the database host
pub const ENV_HOST: &str = "STATCAST_LOAD_HOST";

/// Environment variable for the database port
pub const ENV_PORT: &str = "STATCAST_LOAD_PORT";

/// Environment variable for the target database name
pub const ENV_DATABASE: &str = "STATCAST_LOAD_DATABASE";

/// Environment variable for the staging artifact path
pub const ENV_STAGING_FILE: &str = "STATCAST_LOAD_STAGING_FILE";

/// Error type for configuration handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written
    #[error("Failed to access config {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// The configuration could not be rendered as TOML
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Server and database names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Database used to issue `CREATE DATABASE`
    #[serde(default = "default_admin_database")]
    pub admin_database: String,

    /// Database that receives the loaded tables
    #[serde(default = "default_target_database")]
    pub target_database: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_admin_database() -> String {
    "postgres".to_string()
}

fn default_target_database() -> String {
    "statcast".to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_database: default_admin_database(),
            target_database: default_target_database(),
        }
    }
}

/// Acquisition range and provider endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionSection {
    /// First day of the range; the range always ends at the current date
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    #[serde(default = "default_staging_file")]
    pub staging_file: PathBuf,

    #[serde(default = "default_savant_url")]
    pub savant_url: String,

    #[serde(default = "default_register_url")]
    pub register_url: String,
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2008, 1, 1).unwrap_or_default()
}

fn default_staging_file() -> PathBuf {
    PathBuf::from(DEFAULT_STAGING_FILE)
}

fn default_savant_url() -> String {
    DEFAULT_SAVANT_URL.to_string()
}

fn default_register_url() -> String {
    DEFAULT_REGISTER_URL.to_string()
}

impl Default for AcquisitionSection {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            staging_file: default_staging_file(),
            savant_url: default_savant_url(),
            register_url: default_register_url(),
        }
    }
}

/// Target tables and the policy applied at each creation site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_table")]
    pub table: String,

    /// Policy for the primary table created from the staging sample
    #[serde(default)]
    pub table_exists: ExistsPolicy,

    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Columns holding identifiers to reconcile
    #[serde(default = "default_identifier_columns")]
    pub identifier_columns: Vec<String>,

    #[serde(default = "default_namespace")]
    pub identity_namespace: String,

    #[serde(default = "default_identity_table")]
    pub identity_table: String,

    /// Policy for the identity table written by reconciliation
    #[serde(default = "default_identity_table_exists")]
    pub identity_table_exists: ExistsPolicy,
}

fn default_namespace() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "statcast_pitch".to_string()
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

fn default_identifier_columns() -> Vec<String> {
    vec!["batter".to_string(), "pitcher".to_string()]
}

fn default_identity_table() -> String {
    "player_ids".to_string()
}

fn default_identity_table_exists() -> ExistsPolicy {
    ExistsPolicy::Replace
}

impl Default for LoadSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            table: default_table(),
            table_exists: ExistsPolicy::default(),
            sample_size: default_sample_size(),
            identifier_columns: default_identifier_columns(),
            identity_namespace: default_namespace(),
            identity_table: default_identity_table(),
            identity_table_exists: default_identity_table_exists(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.statcast-load.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoaderConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub acquisition: AcquisitionSection,

    #[serde(default)]
    pub load: LoadSection,
}

impl LoaderConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a directory
    ///
    /// Looks for `.statcast-load.toml` in `dir` and falls back to defaults
    /// if it is absent. Environment overrides are applied last.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        Self::load_file(&dir.join(CONFIG_FILENAME))
    }

    /// Load configuration from an explicit file path, defaults if absent
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
                path: path.to_path_buf(),
                error,
            })?;
            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = dir.join(CONFIG_FILENAME);
        let content = self.to_toml()?;
        std::fs::write(&path, content).map_err(|error| ConfigError::Io { path, error })
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.database.host = host;
        }

        if let Some(port) = lookup(ENV_PORT)
            && let Ok(port) = port.parse()
        {
            self.database.port = port;
        }

        if let Some(database) = lookup(ENV_DATABASE) {
            self.database.target_database = database;
        }

        if let Some(path) = lookup(ENV_STAGING_FILE) {
            self.acquisition.staging_file = PathBuf::from(path);
        }
    }

    /// Connection parameters for the administrative database
    pub fn admin_params(&self, credentials: &Credentials) -> ConnectionParams {
        self.params_for(&self.database.admin_database, credentials)
    }

    /// Connection parameters for the target database
    pub fn target_params(&self, credentials: &Credentials) -> ConnectionParams {
        self.params_for(&self.database.target_database, credentials)
    }

    fn params_for(&self, database: &str, credentials: &Credentials) -> ConnectionParams {
        ConnectionParams::new(
            &self.database.host,
            self.database.port,
            database,
            &credentials.user,
            &credentials.password,
        )
    }
}

/// User name and password collected at process start
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Statcast loader configuration
# Credentials are prompted for at start-up and never read from this file.

[database]
host = "localhost"
port = 5432
# Database used to create the target database
admin_database = "postgres"
target_database = "statcast"

[acquisition]
start_date = "2008-01-01"
staging_file = ".statcast.csv"
savant_url = "https://baseballsavant.mlb.com/statcast_search/csv"
register_url = "https://raw.githubusercontent.com/chadwickbureau/register/master/data"

[load]
namespace = "public"
table = "statcast_pitch"
# What to do when the table exists: "fail", "replace" or "append-if-compatible"
table_exists = "fail"
sample_size = 10000
identifier_columns = ["batter", "pitcher"]
identity_namespace = "public"
identity_table = "player_ids"
identity_table_exists = "replace"
"#
}
