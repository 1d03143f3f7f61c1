use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fmt, fs};

use chrono::NaiveTime;
use chrono_tz::Tz;
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alerts::{Locale, DEFAULT_POLL_INTERVAL};
use crate::markets::profiles::{builtin_profiles, find_profile, merge_profiles};
use crate::markets::yahoo::DEFAULT_CHART_URL;
use crate::markets::{IndexProfile, SessionClock};
use crate::notifiers::DEFAULT_TELEGRAM_URL;
use crate::retrieve::RetryPolicy;

const CONFIG_DEFAULT_NAME: &str = "index_alert_bot.conf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required value {0} is not set")]
    MissingValue(&'static str),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown index profile '{0}'")]
    UnknownIndex(String),

    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    FileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Hourly stock index alerts relayed to a Telegram chat", version)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    #[clap(long, env = "BOT_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "TELEGRAM_TOKEN", hide_env_values = true, help = "Telegram bot token.")]
    pub telegram_token: Option<String>,

    #[clap(long, env = "TELEGRAM_CHAT_ID", help = "Chat that receives the alerts.")]
    pub telegram_chat_id: Option<String>,

    #[clap(long, env = "TWELVE_DATA_API_KEY", hide_env_values = true, help = "Optional market data API key.")]
    pub data_api_key: Option<String>,

    #[clap(long, env = "BOT_INDICES", value_delimiter = ',', help = "Comma separated index profiles (sp500, nasdaq, dow).")]
    pub indices: Option<Vec<String>>,

    #[clap(long, env = "BOT_LOCALE", help = "Language of alert text (en, pt).")]
    pub locale: Option<String>,

    #[clap(long, env = "BOT_SESSION_OPEN", help = "Session window opening, HH:MM.")]
    pub session_open: Option<String>,

    #[clap(long, env = "BOT_SESSION_CLOSE", help = "Session window close, HH:MM (inclusive).")]
    pub session_close: Option<String>,

    #[clap(long, env = "BOT_SESSION_TZ", help = "IANA zone of the session window and hour buckets.")]
    pub session_timezone: Option<String>,

    #[clap(long, env = "BOT_POLL_INTERVAL_SECS", help = "Seconds to sleep after each tick.")]
    pub poll_interval_secs: Option<u64>,

    #[clap(long, env = "BOT_HTTP_TIMEOUT_SECS", help = "Timeout of every HTTP call in seconds.")]
    pub http_timeout_secs: Option<u64>,

    #[clap(long, env = "BOT_SEND_MAX_RETRIES", help = "Delivery retries after the first attempt.")]
    pub send_max_retries: Option<u32>,

    #[clap(long, env = "BOT_SEND_INITIAL_DELAY_SECS", help = "Delay before the first delivery retry.")]
    pub send_initial_delay_secs: Option<f64>,

    #[clap(long, env = "BOT_SEND_BACKOFF_FACTOR", help = "Delay multiplier between delivery retries.")]
    pub send_backoff_factor: Option<f64>,

    #[clap(long, env = "BOT_MARKET_DATA_URL", help = "Chart endpoint base URL.")]
    pub market_data_url: Option<String>,

    #[clap(long, env = "BOT_TELEGRAM_API_URL", help = "Telegram Bot API base URL.")]
    pub telegram_api_url: Option<String>,

    #[clap(long, env = "BOT_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "BOT_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "BOT_ANNOUNCE", help = "Send a startup message to the chat.")]
    pub announce: Option<bool>,

    /// Extra or replacement index profiles; only settable from the config file.
    #[clap(skip)]
    #[serde(default)]
    pub profiles: Option<Vec<IndexProfile>>,
}

impl BotConfig {
    /// Built-in defaults, the lowest precedence layer.
    pub fn defaults() -> Self {
        BotConfig {
            indices: Some(vec!["sp500".to_string()]),
            locale: Some("en".to_string()),
            session_open: Some("14:30".to_string()),
            session_close: Some("21:00".to_string()),
            session_timezone: Some("UTC".to_string()),
            poll_interval_secs: Some(DEFAULT_POLL_INTERVAL.as_secs()),
            http_timeout_secs: Some(10),
            send_max_retries: Some(3),
            send_initial_delay_secs: Some(2.0),
            send_backoff_factor: Some(2.0),
            market_data_url: Some(DEFAULT_CHART_URL.to_string()),
            telegram_api_url: Some(DEFAULT_TELEGRAM_URL.to_string()),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            announce: Some(false),
            ..Default::default()
        }
    }

    // Merge two BotConfig structs, where 'other' overrides 'self' for Some values
    pub fn merge(self, other: BotConfig) -> BotConfig {
        BotConfig {
            config_path: other.config_path.or(self.config_path),
            telegram_token: other.telegram_token.or(self.telegram_token),
            telegram_chat_id: other.telegram_chat_id.or(self.telegram_chat_id),
            data_api_key: other.data_api_key.or(self.data_api_key),
            indices: other.indices.or(self.indices),
            locale: other.locale.or(self.locale),
            session_open: other.session_open.or(self.session_open),
            session_close: other.session_close.or(self.session_close),
            session_timezone: other.session_timezone.or(self.session_timezone),
            poll_interval_secs: other.poll_interval_secs.or(self.poll_interval_secs),
            http_timeout_secs: other.http_timeout_secs.or(self.http_timeout_secs),
            send_max_retries: other.send_max_retries.or(self.send_max_retries),
            send_initial_delay_secs: other.send_initial_delay_secs.or(self.send_initial_delay_secs),
            send_backoff_factor: other.send_backoff_factor.or(self.send_backoff_factor),
            market_data_url: other.market_data_url.or(self.market_data_url),
            telegram_api_url: other.telegram_api_url.or(self.telegram_api_url),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            announce: other.announce.or(self.announce),
            profiles: other.profiles.or(self.profiles),
        }
    }

    /// Reads a JSON config file.
    pub fn from_file(path: &Path) -> Result<BotConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str::<BotConfig>(&text).map_err(|source| ConfigError::FileParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validates the merged values into typed settings.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let telegram_token = required(&self.telegram_token, "TELEGRAM_TOKEN")?;
        let telegram_chat_id = required(&self.telegram_chat_id, "TELEGRAM_CHAT_ID")?;
        let data_api_key = self.data_api_key.clone().filter(|k| !k.trim().is_empty());

        let open = parse_time(&self.session_open, "session_open", "14:30")?;
        let close = parse_time(&self.session_close, "session_close", "21:00")?;
        let tz_name = self.session_timezone.as_deref().unwrap_or("UTC");
        let tz: Tz = tz_name.parse().map_err(|e| ConfigError::InvalidValue {
            field: "session_timezone",
            value: tz_name.to_string(),
            reason: format!("{}", e),
        })?;

        let locale_name = self.locale.as_deref().unwrap_or("en");
        let locale: Locale = locale_name.parse().map_err(|reason| ConfigError::InvalidValue {
            field: "locale",
            value: locale_name.to_string(),
            reason,
        })?;

        let table = merge_profiles(builtin_profiles(), self.profiles.clone().unwrap_or_default());
        let mut profiles: Vec<IndexProfile> = Vec::new();
        for key in self.indices.clone().unwrap_or_else(|| vec!["sp500".to_string()]) {
            if key.trim().is_empty() {
                continue;
            }
            let profile = find_profile(&table, &key).ok_or_else(|| ConfigError::UnknownIndex(key.clone()))?;
            if !profiles.iter().any(|p| p.key == profile.key) {
                profiles.push(profile.clone());
            }
        }
        if profiles.is_empty() {
            return Err(ConfigError::MissingValue("BOT_INDICES"));
        }

        let poll_secs = self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL.as_secs());
        if poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_secs",
                value: poll_secs.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let initial_delay = self.send_initial_delay_secs.unwrap_or(2.0);
        if !initial_delay.is_finite() || initial_delay < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "send_initial_delay_secs",
                value: initial_delay.to_string(),
                reason: "must be a non-negative number".to_string(),
            });
        }
        let backoff = self.send_backoff_factor.unwrap_or(2.0);
        if !backoff.is_finite() || backoff < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "send_backoff_factor",
                value: backoff.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(ResolvedConfig {
            telegram_token,
            telegram_chat_id,
            data_api_key,
            profiles,
            locale,
            session: SessionClock::new(open, close, tz),
            poll_interval: Duration::from_secs(poll_secs),
            http_timeout: Duration::from_secs(self.http_timeout_secs.unwrap_or(10).max(1)),
            retry: RetryPolicy::new(
                self.send_max_retries.unwrap_or(3),
                Duration::from_secs_f64(initial_delay),
                backoff,
            ),
            market_data_url: self.market_data_url.clone().unwrap_or_else(|| DEFAULT_CHART_URL.to_string()),
            telegram_api_url: self.telegram_api_url.clone().unwrap_or_else(|| DEFAULT_TELEGRAM_URL.to_string()),
            log_dir: self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: self.log_level.clone().unwrap_or_else(|| "info".to_string()),
            announce: self.announce.unwrap_or(false),
        })
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingValue(name))
}

fn parse_time(value: &Option<String>, field: &'static str, default: &str) -> Result<NaiveTime, ConfigError> {
    let raw = value.as_deref().unwrap_or(default);
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| ConfigError::InvalidValue {
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Layers defaults, the config file and CLI/env values, in that order.
///
/// `.env` is loaded first so its entries are visible to clap's `env` lookups. A
/// missing default config file is fine; an explicitly named one must exist.
pub fn load_config() -> Result<BotConfig, ConfigError> {
    dotenvy::dotenv().ok();
    let cli = BotConfig::parse();
    layer_config(cli)
}

/// The layering of [`load_config`] for an already parsed CLI layer.
pub fn layer_config(cli: BotConfig) -> Result<BotConfig, ConfigError> {
    let mut current = BotConfig::defaults();

    match &cli.config_path {
        Some(path) => current = current.merge(BotConfig::from_file(path)?),
        None => {
            let default_path = PathBuf::from(CONFIG_DEFAULT_NAME);
            if default_path.exists() {
                current = current.merge(BotConfig::from_file(&default_path)?);
            }
        }
    }

    Ok(current.merge(cli))
}

/// Validated settings for the bot.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub data_api_key: Option<String>,
    pub profiles: Vec<IndexProfile>,
    pub locale: Locale,
    pub session: SessionClock,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub market_data_url: String,
    pub telegram_api_url: String,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub announce: bool,
}

impl fmt::Display for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.profiles.iter().map(|p| p.key.as_str()).collect();
        write!(
            f,
            "ResolvedConfig
    Indices: {},
    Locale: {:?},
    Session: {}-{} {},
    Poll interval: {}s,
    HTTP timeout: {}s,
    Send retries: {} (initial {:.1}s, x{}),
    Market data: {},
    Chat id: {},
    Data API key: {},
    Log dir: {},
    Log level: {}
",
            keys.join(","),
            self.locale,
            self.session.open().format("%H:%M"),
            self.session.close().format("%H:%M"),
            self.session.timezone().name(),
            self.poll_interval.as_secs(),
            self.http_timeout.as_secs(),
            self.retry.max_retries,
            self.retry.initial_delay.as_secs_f64(),
            self.retry.backoff_factor,
            self.market_data_url,
            self.telegram_chat_id,
            if self.data_api_key.is_some() { "set" } else { "not set" },
            self.log_dir.display(),
            self.log_level
        )
    }
}
