//! Configuration management for the Neo4j MCP Server
//!
//! Connection settings are resolved lazily, the first time a tool needs the
//! database. Each value comes from a command-line override when present and
//! otherwise from the environment. A `.env` file can seed the environment
//! at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ConfigError;

/// Environment variable names
pub mod env {
    pub const URI: &str = "NEO4J_URI";
    pub const USERNAME: &str = "NEO4J_USERNAME";
    pub const PASSWORD: &str = "NEO4J_PASSWORD";
    pub const DATABASE: &str = "NEO4J_DATABASE";
}

/// Settings needed to build the Neo4j client
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Bolt endpoint, e.g. `neo4j://localhost:7687`
    pub uri: String,

    pub username: String,

    pub password: String,

    /// Database to scope sessions to; `None` uses the server default
    pub database: Option<String>,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl ConnectionSettings {
    /// Build settings from a variable lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let require = |name: &str| {
            get(name).ok_or_else(|| ConfigError::MissingEnvVar {
                var: name.to_string(),
            })
        };

        Ok(Self {
            uri: require(env::URI)?,
            username: require(env::USERNAME)?,
            password: require(env::PASSWORD)?,
            database: get(env::DATABASE),
        })
    }

    /// Build settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

/// Values supplied on the command line, taking precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub uri: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl SettingsOverrides {
    fn get(&self, name: &str) -> Option<String> {
        match name {
            env::URI => self.uri.clone(),
            env::USERNAME => self.username.clone(),
            env::PASSWORD => self.password.clone(),
            env::DATABASE => self.database.clone(),
            _ => None,
        }
    }
}

/// Deferred source of connection settings, consulted on first connection
pub type SettingsSource = Arc<dyn Fn() -> Result<ConnectionSettings, ConfigError> + Send + Sync>;

/// Settings source that reads overrides first, then the process environment
pub fn layered_source(overrides: SettingsOverrides) -> SettingsSource {
    Arc::new(move || {
        ConnectionSettings::from_lookup(|name| {
            overrides.get(name).or_else(|| std::env::var(name).ok())
        })
    })
}

/// Load a dotenv file into the process environment.
///
/// With no `path`, `.env` is searched for from the working directory upward
/// and its absence is not an error. Variables already set are never
/// overridden. Returns the file that was loaded.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(file) => Ok(Some(file)),
        Err(e) if path.is_none() && e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::EnvFile {
            path: path.map_or_else(|| ".env".to_string(), |p| p.display().to_string()),
            message: e.to_string(),
        }),
    }
}
