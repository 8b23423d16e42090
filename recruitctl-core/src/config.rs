//! Centralized configuration for recruitctl
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. `~/.recruitctl/config.toml` (optional)
//! 3. Environment variables (`DATABASE_URL`, `DISCORD_BOT_TOKEN`, ...)
//!
//! CLI flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RecruitError, Result};

/// Template written by `recruitctl config init`
pub const CONFIG_TEMPLATE: &str = r#"# recruitctl configuration
# Environment variables override every value in this file.

[database]
# url = "postgres://localhost/recruitctl"   # DATABASE_URL
max_connections = 5

[server]
bind = "127.0.0.1:3030"                     # RECRUITCTL_BIND
cors_permissive = false

[discord]
# bot_token = "..."                         # DISCORD_BOT_TOKEN
# guild_id = "123456789012345678"           # DISCORD_GUILD_ID
poll_interval_secs = 15

[webhook]
# url = "https://hooks.example.com/..."     # AUTOMATION_WEBHOOK_URL
# dev_url = "https://hooks.example.com/..." # AUTOMATION_WEBHOOK_URL_DEV
environment = "development"                 # APP_ENV

[worker]
poll_interval_secs = 10
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecruitConfig {
    pub database: DatabaseConfig,
    pub server: ServerSection,
    pub discord: DiscordConfig,
    pub webhook: WebhookConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3030".to_string(),
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub bot_token: Option<String>,
    pub guild_id: Option<String>,
    pub poll_interval_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            guild_id: None,
            poll_interval_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub dev_url: Option<String>,
    pub environment: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            dev_url: None,
            environment: "development".to_string(),
        }
    }
}

impl WebhookConfig {
    /// Pick the webhook target for the current environment.
    ///
    /// Production always uses `url`. Other environments prefer `dev_url`
    /// and fall back to `url` so a single-URL setup keeps working.
    pub fn target_url(&self) -> Option<&str> {
        if self.environment.eq_ignore_ascii_case("production") {
            self.url.as_deref()
        } else {
            self.dev_url.as_deref().or(self.url.as_deref())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub poll_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}

impl RecruitConfig {
    /// Load from the default path, then apply environment overrides.
    ///
    /// A missing config file is not an error.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|source| RecruitError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.apply_env_with(|key| env::var(key).ok());
        Ok(config)
    }

    /// Config file path: ~/.recruitctl/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".recruitctl/config.toml")
    }

    /// Apply environment overrides through a lookup function (testable without touching process env).
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(bind) = non_empty("RECRUITCTL_BIND") {
            self.server.bind = bind;
        }
        if let Some(token) = non_empty("DISCORD_BOT_TOKEN") {
            self.discord.bot_token = Some(token);
        }
        if let Some(guild) = non_empty("DISCORD_GUILD_ID") {
            self.discord.guild_id = Some(guild);
        }
        if let Some(url) = non_empty("AUTOMATION_WEBHOOK_URL") {
            self.webhook.url = Some(url);
        }
        if let Some(url) = non_empty("AUTOMATION_WEBHOOK_URL_DEV") {
            self.webhook.dev_url = Some(url);
        }
        if let Some(app_env) = non_empty("APP_ENV") {
            self.webhook.environment = app_env;
        }
    }

    /// Database URL or an actionable error.
    pub fn database_url(&self) -> Result<&str> {
        self.database.url.as_deref().ok_or_else(|| {
            RecruitError::config(
                "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or [database].url in config",
            )
        })
    }
}
