pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod index;
pub mod inflight;
pub mod models;
pub mod profiles;
pub mod res;
pub mod session;
pub mod swipe;
pub mod vacancies;

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{extract::FromRef, routing::get, Router};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::warn;

pub use appresult::{AppError, AppResult};
pub use config::Config;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub clients: auth::Clients,
    pub identity: auth::Identity,
    pub tx: broadcast::Sender<chat::ChatMessage>,
    pub auth_tx: broadcast::Sender<auth::AuthEvent>,
    pub in_flight: inflight::InFlight,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, clients: auth::Clients, identity: auth::Identity, config: Config) -> AppState {
        AppState {
            db_pool,
            clients,
            identity,
            tx: broadcast::channel(256).0,
            auth_tx: broadcast::channel(64).0,
            in_flight: inflight::InFlight::default(),
            config: Arc::new(config),
        }
    }
}

/// Every route of the service, still waiting for its state and session layer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index::index))
        .route("/dashboard", get(dashboard::dashboard))

        .merge(auth::router())
        .merge(swipe::router())
        .merge(chat::router())
        .merge(vacancies::router())
        .merge(profiles::router())
}

/// Runs a page load under `limit`. `Ok(None)` means it ran out of time.
pub async fn load_within<T, E>(
    limit: Duration,
    what: &str,
    load: impl Future<Output = Result<T, E>>,
) -> Result<Option<T>, E> {
    match tokio::time::timeout(limit, load).await {
        Ok(loaded) => loaded.map(Some),
        Err(_) => {
            warn!(%what, timeout_ms = limit.as_millis() as u64, "load timed out");
            Ok(None)
        }
    }
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> anyhow::Result<String>;
    fn get_obj_field(&self, field: &str) -> anyhow::Result<&Value>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> anyhow::Result<String> {
        Ok(
            self.get(field)
            .ok_or_else(|| anyhow!("expected {field} in {self}"))?
            .as_str()
            .ok_or_else(|| anyhow!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> anyhow::Result<&Value> {
        self.get(field)
        .ok_or_else(|| anyhow!("expected {field} in {self}"))
    }
}

/// A user facing notification attached to a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Notice {
        Notice { level: NoticeLevel::Success, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Notice {
        Notice { level: NoticeLevel::Error, text: text.into() }
    }
}
