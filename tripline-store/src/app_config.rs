use serde::Deserialize;
use std::env;

use tripline_core::pricing::FareMultipliers;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub context: ContextConfig,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub fares: FareMultipliers,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Redis URL for the distributed context backend; empty/absent keeps
    /// the in-process store.
    pub redis_url: Option<String>,
    /// Per-conversation idle TTL. None would leak memory under sustained
    /// load, so the default keeps conversations for a day.
    #[serde(default = "default_context_ttl")]
    pub ttl_seconds: u64,
}

fn default_context_ttl() -> u64 {
    86_400
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_timeout_seconds() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_ms() -> u64 {
    500
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of TRIPLINE)
            // Eg.. `TRIPLINE__SERVER__PORT=8080` would set the server port
            .add_source(config::Environment::with_prefix("TRIPLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
