use std::net::{AddrParseError, SocketAddr};

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "finledger", about = "finledger - income and expense ledger with date-range statements")]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(short, long, default_value = "finledger.toml")]
    pub config: String,

    /// HTTP port, takes precedence over `[server] port`
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Tracing filter, takes precedence over `[logging] level`
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// SQLite database file; switches the storage backend to sqlite
    #[arg(short, long)]
    pub database: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// Database file, used by the sqlite backend. `:memory:` is accepted.
    #[serde(default = "default_database_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    /// Insert two sample operations when the store starts out empty.
    #[serde(default)]
    pub sample_data: bool,
}

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        json: false,
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_path() -> String {
    "finledger.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackendKind::default(),
            path: default_database_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: default_server(),
            logging: default_logging(),
            storage: StorageConfig::default(),
            seed: SeedConfig::default(),
        }
    }
}

impl Config {
    pub fn load(cli: &CliArgs) -> Self {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: ignoring unreadable config {}: {}", cli.config, e);
                Config::default()
            }),
            Err(_) => Config::default(),
        };

        // Flags win over the file.
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(ref path) = cli.database {
            config.storage.backend = StorageBackendKind::Sqlite;
            config.storage.path = path.clone();
        }

        config
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
