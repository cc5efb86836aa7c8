use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://public-api.travitia.xyz/idle/";
pub const DEFAULT_OUTAGE_KEY: &str = "travapi:520";
pub const SOURCE_URL: &str = "https://github.com/maxx0911/idleapi.tio";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub bot: BotConfig,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub outage: OutageConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BotConfig {
    pub token: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub developer_id: u64,
    #[serde(default)]
    pub bans: Vec<u64>,
    #[serde(default = "default_api_cooldown_secs")]
    pub api_cooldown_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub token: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutageStoreKind {
    #[default]
    Memory,
    Database,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutageConfig {
    #[serde(default)]
    pub store: OutageStoreKind,
    #[serde(default = "default_outage_key")]
    pub key: String,
    #[serde(default = "default_outage_window_secs")]
    pub window_secs: u64,
}

impl Default for OutageConfig {
    fn default() -> Self {
        Self {
            store: OutageStoreKind::default(),
            key: default_outage_key(),
            window_secs: default_outage_window_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InteractionConfig {
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_dismissal_timeout_secs")]
    pub dismissal_timeout_secs: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: default_navigation_timeout_secs(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            dismissal_timeout_secs: default_dismissal_timeout_secs(),
        }
    }
}

impl OutageConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Loads `idleapi/config.toml`, then applies `IDLEAPI__SECTION__KEY` environment overrides.
    pub fn new() -> anyhow::Result<Self> {
        let s = config::Config::builder()
            .add_source(config::File::with_name("idleapi/config").required(false))
            .add_source(
                config::Environment::with_prefix("IDLEAPI")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("bot.bans")
                    .try_parsing(true),
            )
            .build()?;

        Ok(s.try_deserialize()?)
    }
}

fn default_prefix() -> String {
    "< ".to_string()
}

fn default_api_cooldown_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_outage_key() -> String {
    DEFAULT_OUTAGE_KEY.to_string()
}

fn default_outage_window_secs() -> u64 {
    3600
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_confirmation_timeout_secs() -> u64 {
    20
}

fn default_dismissal_timeout_secs() -> u64 {
    30
}
