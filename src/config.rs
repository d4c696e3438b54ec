//! Configuration types for the reminder daemon.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NudgeConfig {
    /// Tick, lead and escalation settings.
    pub watch: WatchConfig,
    /// Persistent store settings.
    pub storage: StorageConfig,
    /// Message language settings.
    pub locale: LocaleConfig,
    /// Telegram Bot API settings.
    pub telegram: TelegramConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Deadline watching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between watcher ticks.
    pub tick_interval_secs: u64,
    /// Minutes before the deadline at which non-reporters are warned.
    pub warn_lead_mins: u32,
    /// Minutes between escalation reminders.
    pub escalation_interval_mins: u32,
    /// Reminders sent per missed deadline before giving up.
    pub max_reminders: u32,
    /// Evaluate in UTC when a group's time zone is invalid.
    ///
    /// When disabled such ticks are skipped until the zone is fixed.
    pub utc_fallback: bool,
    /// Days on which standups are expected.
    pub working_days: Vec<Weekday>,
    /// Seconds between polls of the store for newly tracked groups.
    pub feed_poll_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            warn_lead_mins: 10,
            escalation_interval_mins: 30,
            max_reminders: 3,
            utc_fallback: true,
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            feed_poll_secs: 60,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path (None = `data_dir()/standups.db`).
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured database path, or the platform default.
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(crate::app_dirs::database_file)
    }
}

/// Localization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Language used when a group has none or an unknown one.
    pub default_language: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_owned(),
        }
    }
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token. Empty runs in dry-run mode and only logs messages.
    pub bot_token: String,
    /// API base URL.
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base_url: "https://api.telegram.org".to_owned(),
            request_timeout_secs: 15,
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Also write a daily-rotated log file under `data_dir()/logs/`.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            file: false,
        }
    }
}

impl NudgeConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// parsed values are unusable.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::error::NudgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::NudgeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }

    /// Reject values the watcher cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`NudgeError::Config`](crate::error::NudgeError::Config) naming the bad field.
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |field: &str| {
            Err(crate::error::NudgeError::Config(format!(
                "`{field}` must be greater than zero"
            )))
        };
        if self.watch.tick_interval_secs == 0 {
            return invalid("watch.tick_interval_secs");
        }
        // A zero lead would put the warning in the same minute as the
        // missed-deadline notice.
        if self.watch.warn_lead_mins == 0 {
            return invalid("watch.warn_lead_mins");
        }
        if self.watch.escalation_interval_mins == 0 {
            return invalid("watch.escalation_interval_mins");
        }
        if self.watch.feed_poll_secs == 0 {
            return invalid("watch.feed_poll_secs");
        }
        Ok(())
    }
}
