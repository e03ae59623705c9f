use std::{
    env,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::Error,
    poll::{PollSettings, DEFAULT_LIMIT, DEFAULT_TIMEOUT},
    retry::RetryPolicy,
    Result,
};

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyAMA0";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Typed configuration for the relay bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_allowed_users: Vec<i64>,

    // Device. `None` means debug mode (no port opened).
    pub serial_port: Option<PathBuf>,
    pub serial_baud_rate: u32,

    // Polling
    pub poll_limit: u8,
    pub poll_timeout: Duration,
    pub retry_max_attempts: u32,
    pub retry_base_delay: Duration,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

/// Values given on the command line; each one wins over the environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub serial_port: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_allowed_users: Option<String>,
}

impl Config {
    pub fn load_with(overrides: ConfigOverrides) -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(overrides, |key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (process env in production).
    pub fn from_lookup(
        overrides: ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let telegram_bot_token = overrides
            .telegram_bot_token
            .or_else(|| lookup("TELEGRAM_BOT_TOKEN"))
            .unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let users_raw = overrides
            .telegram_allowed_users
            .or_else(|| lookup("TELEGRAM_ALLOWED_USERS"))
            .unwrap_or_default();
        let telegram_allowed_users = parse_allowed_users(&users_raw)?;

        // An explicitly empty port selects debug mode.
        let serial_port = overrides
            .serial_port
            .or_else(|| lookup("RELAY_SERIAL_PORT"))
            .unwrap_or_else(|| DEFAULT_SERIAL_PORT.to_string());
        let serial_port = non_empty(serial_port).map(PathBuf::from);
        let serial_baud_rate =
            parse_env(&lookup, "RELAY_SERIAL_BAUD")?.unwrap_or(DEFAULT_BAUD_RATE);

        let poll_limit = parse_env::<u8>(&lookup, "POLL_LIMIT")?
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, 100);
        let poll_timeout = parse_env(&lookup, "POLL_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let default_retry = RetryPolicy::default();
        let retry_max_attempts =
            parse_env(&lookup, "RETRY_MAX_ATTEMPTS")?.unwrap_or(default_retry.max_retries);
        let retry_base_delay = parse_env(&lookup, "RETRY_BASE_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(default_retry.base_delay);

        let audit_log_path = lookup("AUDIT_LOG_PATH")
            .and_then(non_empty)
            .map(PathBuf::from);
        let audit_log_json = lookup("AUDIT_LOG_JSON").map_or(true, |s| parse_bool(&s));

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            serial_port,
            serial_baud_rate,
            poll_limit,
            poll_timeout,
            retry_max_attempts,
            retry_base_delay,
            audit_log_path,
            audit_log_json,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max_attempts,
            base_delay: self.retry_base_delay,
            ..RetryPolicy::default()
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            limit: self.poll_limit,
            timeout: self.poll_timeout,
            retry: self.retry_policy(),
        }
    }
}

/// Parse `id0[,id1[...]]`. Empty entries are skipped; anything else that is
/// not an integer is a config error.
pub fn parse_allowed_users(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|e| Error::Config(format!("could not parse user id {s:?}: {e}")))
        })
        .collect()
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| Error::Config(format!("invalid {key}={raw:?}: {e}")))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return &val[1..val.len() - 1];
    }
    val
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
