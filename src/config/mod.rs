use anyhow::{Context, Result};
use serde::Deserialize;

/// Complete roadwatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RoadwatchConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Vehicle agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Device/user identity stamped on every aggregated record
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    #[serde(default = "default_accelerometer_file")]
    pub accelerometer_file: String,
    #[serde(default = "default_gps_file")]
    pub gps_file: String,
    #[serde(default = "default_parking_file")]
    pub parking_file: String,
    /// Base URL of the store service
    #[serde(default = "default_store_url")]
    pub store_url: String,
    /// Records per uplink batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Sampling cadence: one batch is delivered per tick
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Extra delivery attempts after the first failure
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_user_id() -> i64 {
    1
}

fn default_accelerometer_file() -> String {
    "data/accelerometer.csv".to_string()
}

fn default_gps_file() -> String {
    "data/gps.csv".to_string()
}

fn default_parking_file() -> String {
    "data/parking.csv".to_string()
}

fn default_store_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_batch_size() -> usize {
    25
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            accelerometer_file: default_accelerometer_file(),
            gps_file: default_gps_file(),
            parking_file: default_parking_file(),
            store_url: default_store_url(),
            batch_size: default_batch_size(),
            tick_interval_ms: default_tick_interval_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Store service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Buffered records per subscription channel before a slow subscriber
    /// is considered lagged and dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_db_path() -> String {
    "roadwatch.db".to_string()
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for RoadwatchConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<RoadwatchConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: RoadwatchConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path))?;
    Ok(config)
}
