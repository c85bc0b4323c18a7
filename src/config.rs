// src/config.rs
use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};

use crate::validation::PollLimits;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub backend_timeout: Duration,
    pub seed_demo_polls: bool,
    pub limits: PollLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3030,
            database_url: None,
            database_max_connections: 5,
            backend_timeout: Duration::from_millis(5000),
            seed_demo_polls: true,
            limits: PollLimits::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys fall back to the
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let limits = defaults.limits;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if database_url.is_none() {
            info!("DATABASE_URL not set, polls are kept in memory");
        }

        Ok(Self {
            port: try_load(&lookup, "PORT", defaults.port)?,
            database_url,
            database_max_connections: try_load(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            backend_timeout: Duration::from_millis(try_load(
                &lookup,
                "BACKEND_TIMEOUT_MS",
                defaults.backend_timeout.as_millis() as u64,
            )?),
            seed_demo_polls: try_load(&lookup, "SEED_DEMO_POLLS", defaults.seed_demo_polls)?,
            limits: PollLimits {
                title_min: try_load(&lookup, "POLL_TITLE_MIN", limits.title_min)?,
                title_max: try_load(&lookup, "POLL_TITLE_MAX", limits.title_max)?,
                description_max: try_load(&lookup, "POLL_DESCRIPTION_MAX", limits.description_max)?,
                option_min: try_load(&lookup, "POLL_OPTION_MIN", limits.option_min)?,
                option_max: try_load(&lookup, "POLL_OPTION_MAX", limits.option_max)?,
                min_options: try_load(&lookup, "POLL_MIN_OPTIONS", limits.min_options)?,
                max_options: try_load(&lookup, "POLL_MAX_OPTIONS", limits.max_options)?,
            },
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key: key.to_string(),
                message: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
