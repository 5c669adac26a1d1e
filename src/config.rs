//! Backend selection and connection settings
//!
//! Settings are read once at start, either from the environment with
//! `DatabaseConfig::from_env` or from CLI flags, and turned into a backend
//! with `connect`.

use crate::database::{Backend, Database, DatabaseResult, Neo4jDatabase};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const ENV_PROVIDER: &str = "DATABASE_PROVIDER";
pub const ENV_URI: &str = "DB_URI";
pub const ENV_USERNAME: &str = "DB_USERNAME";
pub const ENV_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DATABASE: &str = "DB_NAME";
pub const ENV_KUZU_PATH: &str = "KUZU_DB_PATH";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown database provider '{0}' (expected NEO4J or KUZU)")]
    UnknownProvider(String),
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEO4J" => Ok(Backend::Neo4j),
            "KUZU" => Ok(Backend::Kuzu),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Neo4j server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// HTTP base URL
    pub uri: String,
    pub username: String,
    pub password: String,
    /// Database name on the server
    pub database: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
        }
    }
}

/// Embedded Kuzu settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KuzuConfig {
    /// Database directory
    pub path: PathBuf,
}

impl Default for KuzuConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./demo_db"),
        }
    }
}

/// Which backend to use and how to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub provider: Backend,
    pub neo4j: Neo4jConfig,
    pub kuzu: KuzuConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            provider: Backend::Neo4j,
            neo4j: Neo4jConfig::default(),
            kuzu: KuzuConfig::default(),
        }
    }
}

impl DatabaseConfig {
    /// Read settings from the process environment; unset variables keep their defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(provider) = lookup(ENV_PROVIDER) {
            config.provider = provider.parse()?;
        }
        if let Some(uri) = lookup(ENV_URI) {
            config.neo4j.uri = uri;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            config.neo4j.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            config.neo4j.password = password;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            config.neo4j.database = database;
        }
        if let Some(path) = lookup(ENV_KUZU_PATH) {
            config.kuzu.path = PathBuf::from(path);
        }
        Ok(config)
    }
}

/// Build the configured backend adapter
pub fn connect(config: &DatabaseConfig) -> DatabaseResult<Arc<dyn Database>> {
    match config.provider {
        Backend::Neo4j => Ok(Arc::new(Neo4jDatabase::new(config.neo4j.clone())?)),
        #[cfg(feature = "kuzu")]
        Backend::Kuzu => Ok(Arc::new(crate::database::KuzuDatabase::open(&config.kuzu)?)),
        #[cfg(not(feature = "kuzu"))]
        Backend::Kuzu => Err(crate::database::DatabaseError::Unsupported(
            "Kuzu support is not compiled in (enable the `kuzu` feature)".to_string(),
        )),
    }
}
