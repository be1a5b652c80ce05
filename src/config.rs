use std::{collections::HashMap, time::Duration};

use thiserror::Error;
use url::Url;

use crate::providers::tiktok::DEFAULT_RESOLVER_URL;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_YT_DLP_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub allowed_origins: Vec<String>,
    pub upstream_timeout: Duration,
    pub yt_dlp_bin: String,
    pub yt_dlp_timeout: Duration,
    pub tiktok_resolver_url: Url,
    pub tiktok_enabled: bool,
    pub instagram_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = match read("APP_ADDR") {
            Some(addr) => addr,
            None => {
                let port = read_parsed::<u16>(&read, "PORT")?.unwrap_or(DEFAULT_PORT);
                format!("0.0.0.0:{port}")
            }
        };

        let allowed_origins: Vec<String> = read("ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let tiktok_resolver_url = match read("TIKTOK_RESOLVER_URL") {
            Some(value) => Url::parse(&value)
                .map_err(|error| ConfigError::invalid("TIKTOK_RESOLVER_URL", &value, error))?,
            None => Url::parse(DEFAULT_RESOLVER_URL).map_err(|error| {
                ConfigError::invalid("TIKTOK_RESOLVER_URL", DEFAULT_RESOLVER_URL, error)
            })?,
        };

        Ok(Self {
            bind_addr,
            allowed_origins,
            upstream_timeout: read_seconds(
                &read,
                "UPSTREAM_TIMEOUT_SECONDS",
                DEFAULT_UPSTREAM_TIMEOUT_SECONDS,
            )?,
            yt_dlp_bin: read("YT_DLP_BIN").unwrap_or_else(|| "yt-dlp".to_string()),
            yt_dlp_timeout: read_seconds(
                &read,
                "YT_DLP_TIMEOUT_SECONDS",
                DEFAULT_YT_DLP_TIMEOUT_SECONDS,
            )?,
            tiktok_resolver_url,
            tiktok_enabled: read_bool(&read, "TIKTOK_ENABLED")?.unwrap_or(true),
            instagram_enabled: read_bool(&read, "INSTAGRAM_ENABLED")?.unwrap_or(true),
        })
    }
}

fn read_parsed<T>(
    read: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    read(name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|error| ConfigError::invalid(name, &value, error))
        })
        .transpose()
}

fn read_seconds(
    read: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match read_parsed::<u64>(read, name)? {
        Some(0) => Err(ConfigError::invalid(name, "0", "must be greater than zero")),
        Some(seconds) => Ok(Duration::from_secs(seconds)),
        None => Ok(Duration::from_secs(default)),
    }
}

fn read_bool(
    read: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let Some(value) = read(name) else {
        return Ok(None);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::invalid(name, &value, "expected a boolean")),
    }
}

pub fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    Config::from_lookup(|name| vars.get(name).cloned())
}
