use crate::scrapers::types::SearchParams;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/scout.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub immoweb: Option<SourceConfig>,
    #[serde(default)]
    pub immovlan: Option<SourceConfig>,
    #[serde(default)]
    pub realo: Option<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub store_dir: PathBuf,
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
}

impl GeneralConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_frequency_minutes")]
    pub frequency_minutes: u64,
    /// Send one known listing when a poll finds nothing new
    #[serde(default)]
    pub test_send: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            frequency_minutes: default_frequency_minutes(),
            test_send: false,
        }
    }
}

impl BotConfig {
    pub fn frequency(&self) -> Duration {
        Duration::from_secs(self.frequency_minutes * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

/// One listing provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub search_url: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Overrides `[bot].test_send` for this source
    #[serde(default)]
    pub test_send: Option<bool>,
    #[serde(default)]
    pub search: SearchParams,
}

impl SourceConfig {
    pub fn test_send(&self, bot: &BotConfig) -> bool {
        self.test_send.unwrap_or(bot.test_send)
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot.frequency_minutes == 0 {
            bail!("bot.frequency_minutes must be greater than 0");
        }

        let sources = [
            ("immoweb", &self.immoweb),
            ("immovlan", &self.immovlan),
            ("realo", &self.realo),
        ];
        for (name, source) in sources {
            let Some(source) = source.as_ref().filter(|s| s.enabled) else {
                continue;
            };
            if source.search_url.trim().is_empty() {
                bail!("{}.search_url must not be empty", name);
            }
            if source.max_pages == 0 {
                bail!("{}.max_pages must be greater than 0", name);
            }
        }

        if let Some(realo) = self.realo.as_ref().filter(|s| s.enabled) {
            match realo.search.get("postalCodes") {
                Some(toml::Value::Array(codes)) if !codes.is_empty() => {}
                _ => bail!("realo.search.postalCodes must list at least one postal code"),
            }
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_wait_timeout_secs() -> u64 {
    5
}

fn default_frequency_minutes() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_max_pages() -> u32 {
    1
}
