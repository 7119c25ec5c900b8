use std::{fmt::Display, num::NonZeroU32, str::FromStr, time::Duration};

use anyhow::{Context, anyhow};
use tracing::info;

use crate::claim::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub id_length: usize,
    pub retry: RetryPolicy,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://pressroom.db")?,
            port: try_load("PORT", "3000")?,
            max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            idle_timeout: Duration::from_millis(try_load("DB_IDLE_TIMEOUT_MS", "10000")?),
            id_length: try_load("ID_LENGTH", "10")?,
            retry: RetryPolicy {
                max_attempts: try_load::<NonZeroU32>("ID_MAX_ATTEMPTS", "10")?.get(),
                backoff_base: Duration::from_millis(try_load("ID_BACKOFF_BASE_MS", "2")?),
                deadline: Duration::from_millis(try_load("ID_DEADLINE_MS", "5000")?),
            },
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    raw.parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value {raw:?}"))
}
