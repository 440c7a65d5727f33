use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    /// Allowed CORS origin; `None` allows any origin.
    pub client_url: Option<String>,
    pub notifier: NotifierConfig,
    pub query_timeout_ms: u64,
    pub report_cache: ReportCacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub interval_secs: u64,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match var("DATABASE_BACKEND")
            .unwrap_or_else(|| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let url = var("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./salesboard.db?mode=rwc".to_string());

        let client_url = var("CLIENT_URL").filter(|v| !v.trim().is_empty());

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url,
                max_connections: parse_var(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            api_server: ServerConfig {
                host: var("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: parse_var(&var, "API_PORT", 5000)?,
            },
            client_url,
            notifier: NotifierConfig {
                interval_secs: parse_var(&var, "NOTIFIER_INTERVAL_SECS", 30)?,
                channel_capacity: parse_var(&var, "NOTIFIER_CHANNEL_CAPACITY", 16)?,
            },
            query_timeout_ms: parse_var(&var, "QUERY_TIMEOUT_MS", 10_000)?,
            report_cache: ReportCacheConfig {
                max_entries: parse_var(&var, "REPORT_CACHE_MAX_ENTRIES", 1000)?,
                ttl_secs: parse_var(&var, "REPORT_CACHE_TTL_SECS", 300)?,
            },
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn notifier_interval(&self) -> Duration {
        Duration::from_secs(self.notifier.interval_secs.max(1))
    }
}

fn parse_var<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        None => Ok(default),
    }
}
