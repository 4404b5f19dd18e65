use std::{env, fs, path::Path, str::FromStr, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
/// BCM numbering.
pub const DEFAULT_PIN: u8 = 17;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POLL_DELAY_SECS: u64 = 5;

/// Typed configuration, passed explicitly into the transport, the GPIO
/// adapter and the dispatcher.
#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub api_base_url: String,

    pub pin_number: u8,

    // Polling
    pub poll_timeout: Duration,
    pub poll_delay: Duration,
    pub allowed_updates: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("pin_number", &self.pin_number)
            .field("poll_timeout", &self.poll_timeout)
            .field("poll_delay", &self.poll_delay)
            .field("allowed_updates", &self.allowed_updates)
            .finish()
    }
}

impl Config {
    /// Load from `.env` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let api_base_url = lookup("TELEGRAM_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let pin_number = parse_var(&lookup, "PLANTBOT_PIN")?.unwrap_or(DEFAULT_PIN);

        let poll_timeout = Duration::from_secs(
            parse_var(&lookup, "PLANTBOT_POLL_TIMEOUT_SECS")?.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS),
        );
        let poll_delay = Duration::from_secs(
            parse_var(&lookup, "PLANTBOT_POLL_DELAY_SECS")?.unwrap_or(DEFAULT_POLL_DELAY_SECS),
        );

        let allowed_updates =
            parse_csv(lookup("PLANTBOT_ALLOWED_UPDATES")).unwrap_or_else(|| vec!["message".into()]);

        Ok(Self {
            telegram_bot_token: telegram_bot_token.trim().to_string(),
            api_base_url,
            pin_number,
            poll_timeout,
            poll_delay,
            allowed_updates,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| Error::Config(format!("{key}={raw:?} is invalid: {e}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
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

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_csv(v: Option<String>) -> Option<Vec<String>> {
    let out = v?
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
