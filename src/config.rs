use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Origin the browser sees, used to build OAuth redirect urls.
    pub public_url: String,
    pub client_secrets: PathBuf,
    pub session_idle: time::Duration,
    pub load_timeout: Duration,
}

impl Config {
    /// Reads the environment, after `.env` when one is present.
    pub fn from_env() -> anyhow::Result<Config> {
        let database_url = dotenv::var("DATABASE_URL")
            .map_err(|_| anyhow!("DATABASE_URL environment variable not set"))?;

        let count = |name: &str, default| parse_count(name, dotenv::var(name).ok(), default);
        let session_idle_minutes = i64::try_from(count("FINDME_SESSION_IDLE_MINUTES", 120)?)
            .context("FINDME_SESSION_IDLE_MINUTES is too large")?;
        let load_timeout_secs = count("FINDME_LOAD_TIMEOUT_SECS", 10)?;

        Ok(Config {
            database_url,
            bind_addr: dotenv::var("FINDME_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            public_url: dotenv::var("FINDME_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_owned())
                .trim_end_matches('/')
                .to_owned(),
            client_secrets: dotenv::var("FINDME_CLIENT_SECRETS")
                .unwrap_or_else(|_| "client_secret.json".to_owned())
                .into(),
            session_idle: time::Duration::minutes(session_idle_minutes),
            load_timeout: Duration::from_secs(load_timeout_secs),
        })
    }

    pub fn for_database(database_url: &str) -> Config {
        Config {
            database_url: database_url.to_owned(),
            bind_addr: "127.0.0.1:0".to_owned(),
            public_url: "http://localhost:8080".to_owned(),
            client_secrets: "client_secret.json".into(),
            session_idle: time::Duration::minutes(120),
            load_timeout: Duration::from_secs(10),
        }
    }
}

fn parse_count(name: &str, raw: Option<String>, default: u64) -> anyhow::Result<u64> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{name} must be a non-negative whole number, got {raw:?}")),
        None => Ok(default),
    }
}
