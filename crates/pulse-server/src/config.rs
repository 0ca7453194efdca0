use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use pulse_gateway::SessionConfig;
use pulse_notify::{DEFAULT_PUSH_URL, PushConfig};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub push: PushConfig,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("PULSE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PULSE_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let push_defaults = PushConfig::default();

        Ok(Self {
            host: var("PULSE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(var("PULSE_PORT"), "PULSE_PORT", 8080)?,
            db_path: var("PULSE_DB_PATH").unwrap_or_else(|| "pulse.db".into()).into(),
            jwt_secret,
            cors_origins: var("PULSE_CORS_ORIGINS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            push: PushConfig {
                endpoint: var("PULSE_PUSH_URL").unwrap_or_else(|| DEFAULT_PUSH_URL.into()),
                timeout: Duration::from_secs(parse_or(var("PULSE_PUSH_TIMEOUT_SECS"), "PULSE_PUSH_TIMEOUT_SECS", 4)?),
                max_workers: parse_or(var("PULSE_PUSH_WORKERS"), "PULSE_PUSH_WORKERS", push_defaults.max_workers)?,
                title: var("PULSE_PUSH_TITLE").unwrap_or(push_defaults.title),
            },
            session: SessionConfig::default(),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v.parse().with_context(|| format!("invalid {key}: {v:?}")),
        None => Ok(default),
    }
}
