//! Runtime configuration from environment variables

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::services::aggregator::DEFAULT_MAX_MONTHS;
use crate::services::formatter::Locale;
use crate::types::{BrokerstatError, Result};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub token: Option<String>,
    pub locale: Locale,
    pub max_months: usize,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            locale: Locale::default(),
            max_months: DEFAULT_MAX_MONTHS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Read `BROKERSTAT_*` variables. The token falls back to
    /// `~/.brokerstat/token` when the variable is unset.
    pub fn load() -> Result<Self> {
        Self::load_with(&[])
    }

    /// Like [`Config::load`], with `overrides` replacing the matching
    /// variables before they are validated.
    pub fn load_with(overrides: &[(&str, String)]) -> Result<Self> {
        Self::from_lookup(
            |key| override_or(overrides, key, |k| env::var(k).ok()),
            default_token_path().as_deref(),
        )
    }

    pub fn from_lookup<F>(lookup: F, token_file: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("BROKERSTAT_API_URL").unwrap_or_else(|| {
            info!("BROKERSTAT_API_URL not set, using default: {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        let token = lookup("BROKERSTAT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .or_else(|| token_file.and_then(read_token));

        Ok(Self {
            api_url,
            token,
            locale: parse_or(&lookup, "BROKERSTAT_LOCALE", Locale::default())?,
            max_months: parse_or(&lookup, "BROKERSTAT_MAX_MONTHS", DEFAULT_MAX_MONTHS)?,
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "BROKERSTAT_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        })
    }
}

fn override_or<F>(overrides: &[(&str, String)], key: &str, fallback: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    overrides
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.clone())
        .or_else(|| fallback(key))
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            BrokerstatError::Config(format!("invalid {}='{}': {}", key, raw, e))
        }),
    }
}

fn default_token_path() -> Option<PathBuf> {
    let home = directories::BaseDirs::new()?.home_dir().to_path_buf();
    Some(home.join(".brokerstat").join("token"))
}

fn read_token(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(s) => Some(s.trim().to_string()).filter(|t| !t.is_empty()),
        Err(e) => {
            info!("No token file at {}: {e}", path.display());
            None
        }
    }
}
