use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with a browser UI (`index.html` plus assets), served at `/` and `/ui`
    #[serde(default)]
    pub static_dir: Option<String>,
    /// Allow cross-origin reads of the query API
    #[serde(default)]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            cors: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_host")]
    pub host: String,
    #[serde(default = "default_bus_port")]
    pub port: u16,
    /// MQTT client id; a random one is generated when unset
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_topic_filter")]
    pub topic_filter: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Messages buffered between the bus listener and the ingestion task
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: default_bus_host(),
            port: default_bus_port(),
            client_id: None,
            topic_filter: default_topic_filter(),
            keep_alive_seconds: default_keep_alive(),
            reconnect_delay_ms: default_reconnect_delay(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Rows returned by `GET /logs/:table`
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            recent_limit: default_recent_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BroadcastConfig {
    /// Events queued per observer before new events are dropped for it
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            observer_buffer: default_observer_buffer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_bus_host() -> String {
    "localhost".to_string()
}

fn default_bus_port() -> u16 {
    1883
}

fn default_topic_filter() -> String {
    "#".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_database_path() -> String {
    "./data/database.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_recent_limit() -> u32 {
    300
}

fn default_observer_buffer() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Load configuration from an optional TOML file overlaid with `LOGHUB__*` environment variables
///
/// A missing file is not an error: every field has a built-in default.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("LOGHUB")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.host.is_empty() {
        anyhow::bail!("server.host cannot be empty");
    }
    if cfg.server.port == 0 {
        anyhow::bail!("server.port must be non-zero");
    }

    if cfg.bus.host.is_empty() {
        anyhow::bail!("bus.host cannot be empty");
    }
    if cfg.bus.topic_filter.is_empty() {
        anyhow::bail!("bus.topic_filter cannot be empty");
    }
    if cfg.bus.queue_capacity == 0 {
        anyhow::bail!("bus.queue_capacity must be at least 1");
    }

    if cfg.storage.max_connections == 0 {
        anyhow::bail!("storage.max_connections must be at least 1");
    }
    if cfg.storage.recent_limit == 0 {
        anyhow::bail!("storage.recent_limit must be at least 1");
    }

    if cfg.broadcast.observer_buffer == 0 {
        anyhow::bail!("broadcast.observer_buffer must be at least 1");
    }

    match cfg.logging.format.as_str() {
        "pretty" | "json" => {}
        other => anyhow::bail!("Invalid logging.format '{}': expected 'pretty' or 'json'", other),
    }

    Ok(())
}
