//! Bot configuration
//!
//! Settings come from the environment (see [`BotConfig::from_env`]) or from
//! the builder. Everything a module would otherwise look up globally, such as
//! the config directory or the bot owner, lives here and is handed to the bot
//! explicitly.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::Error;
use crate::logging::LogConfig;
use crate::platform::UserId;
use crate::ratelimit::RateLimitConfig;

/// Main bot configuration
#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BotConfig {
    /// Prefix of text commands
    #[validate(length(min = 1, max = 16))]
    pub prefix: String,

    /// Platform token, never serialized
    #[serde(skip_serializing)]
    pub token: String,

    /// Directory holding `config.json` and module config files
    pub config_dir: PathBuf,

    /// Bot owner; asked from the platform when unset
    pub owner_id: Option<UserId>,

    /// IANA timezone used to display dates
    #[validate(custom(function = "validate_timezone"))]
    pub timezone: String,

    /// strftime pattern used to display dates
    #[validate(custom(function = "validate_date_format"))]
    pub date_format: String,

    /// Lifetime of transient reply embeds
    #[serde(with = "humantime_serde")]
    pub delete_after: Duration,

    /// Logging outputs
    pub log: LogConfig,

    /// Client-side rate limiting
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,
}

impl BotConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(|e| Error::Validation(e.to_string()))?;
        Ok(())
    }

    /// Load configuration from environment variables
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BOT_TOKEN` | required |
    /// | `BOT_PREFIX` | `!` |
    /// | `CONFIG_DIR` | `config` |
    /// | `BOT_OWNER_ID` | asked from the platform |
    /// | `TZ` | `UTC`, also when not an IANA name |
    /// | `DATE_FORMAT` | `%Y-%m-%d %H:%M:%S %Z` |
    /// | `LOG_FILE` | `bot.log` |
    /// | `LOG_LEVEL` | `info` |
    /// | `FILE_LOG_LEVEL` | `info` |
    ///
    /// # Errors
    ///
    /// Returns an error if `BOT_TOKEN` is missing or a value is malformed.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .context("No bot token provided. Please set the BOT_TOKEN environment variable.")?;

        let owner_id = std::env::var("BOT_OWNER_ID")
            .ok()
            .map(|id| id.parse())
            .transpose()
            .context("Invalid BOT_OWNER_ID value")?;

        let defaults = Self::default();
        let log = LogConfig {
            console_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log.console_level),
            file_level: std::env::var("FILE_LOG_LEVEL").unwrap_or(defaults.log.file_level),
            file_path: std::env::var("LOG_FILE")
                .map(PathBuf::from)
                .ok()
                .or(defaults.log.file_path),
        };

        let config = Self {
            prefix: std::env::var("BOT_PREFIX").unwrap_or(defaults.prefix),
            token,
            config_dir: std::env::var("CONFIG_DIR").map_or(defaults.config_dir, PathBuf::from),
            owner_id,
            timezone: std::env::var("TZ")
                .ok()
                .filter(|tz| crate::time::parse_timezone(tz).is_some())
                .unwrap_or(defaults.timezone),
            date_format: std::env::var("DATE_FORMAT").unwrap_or(defaults.date_format),
            log,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            token: String::new(),
            config_dir: PathBuf::from("config"),
            owner_id: None,
            timezone: "UTC".to_string(),
            date_format: crate::time::DEFAULT_DATE_FORMAT.to_string(),
            delete_after: Duration::from_secs(5),
            log: LogConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("prefix", &self.prefix)
            .field("token", &"[REDACTED]")
            .field("config_dir", &self.config_dir)
            .field("owner_id", &self.owner_id)
            .field("timezone", &self.timezone)
            .field("date_format", &self.date_format)
            .field("delete_after", &self.delete_after)
            .field("log", &self.log)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// Builder for `BotConfig`
#[derive(Default)]
pub struct BotConfigBuilder {
    prefix: Option<String>,
    token: Option<String>,
    config_dir: Option<PathBuf>,
    owner_id: Option<UserId>,
    timezone: Option<String>,
    date_format: Option<String>,
    delete_after: Option<Duration>,
    log: Option<LogConfig>,
    rate_limit: Option<RateLimitConfig>,
}

impl BotConfigBuilder {
    /// Set the command prefix
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the platform token
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the config directory
    #[must_use]
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Set the bot owner
    #[must_use]
    pub fn owner_id(mut self, owner: UserId) -> Self {
        self.owner_id = Some(owner);
        self
    }

    /// Set the display timezone
    #[must_use]
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Set the strftime pattern for dates
    #[must_use]
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Set how long transient replies stay
    #[must_use]
    pub fn delete_after(mut self, after: Duration) -> Self {
        self.delete_after = Some(after);
        self
    }

    /// Set logging outputs
    #[must_use]
    pub fn log(mut self, log: LogConfig) -> Self {
        self.log = Some(log);
        self
    }

    /// Set rate limiting
    #[must_use]
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<BotConfig> {
        let defaults = BotConfig::default();
        let config = BotConfig {
            prefix: self.prefix.unwrap_or(defaults.prefix),
            token: self.token.unwrap_or_default(),
            config_dir: self.config_dir.unwrap_or(defaults.config_dir),
            owner_id: self.owner_id,
            timezone: self.timezone.unwrap_or(defaults.timezone),
            date_format: self.date_format.unwrap_or(defaults.date_format),
            delete_after: self.delete_after.unwrap_or(defaults.delete_after),
            log: self.log.unwrap_or_default(),
            rate_limit: self.rate_limit.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Validate timezone name
fn validate_timezone(timezone: &str) -> Result<(), ValidationError> {
    if crate::time::parse_timezone(timezone).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_timezone"))
    }
}

fn validate_date_format(format: &str) -> Result<(), ValidationError> {
    if crate::time::is_valid_format(format) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_date_format"))
    }
}
