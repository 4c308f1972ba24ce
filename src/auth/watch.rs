//! Keeps browser tabs in step with the account the session currently holds.
//!
//! Every sign-in, sign-out and token refresh is published once on the auth
//! broadcast channel. A tab keeps a [`TabIdentity`] with the user it last saw
//! and turns visibility checks and published changes into a [`TabAction`].

use axum::{
    debug_handler,
    extract::{ws::Message, Query, State, WebSocketUpgrade},
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_sessions::Session;
use tracing::{debug, info};

use crate::{
    session::{self, USER_ID},
    AppResult, AppState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn(String),
    SignedOut,
    TokenRefreshed(String),
}

#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub browser_id: String,
    pub change: AuthChange,
}

pub fn publish(auth_tx: &broadcast::Sender<AuthEvent>, browser_id: String, change: AuthChange) {
    debug!(%browser_id, ?change, "auth change");
    // nobody listening is fine
    let _ = auth_tx.send(AuthEvent { browser_id, change });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TabAction {
    Stay,
    /// Sign the browser out, then go to `to`.
    SignOut { to: String },
    Redirect { to: String },
    Reload { to: String },
}

#[derive(Debug, Default)]
pub struct TabIdentity {
    known: Option<String>,
}

impl TabIdentity {
    pub fn new(known: Option<String>) -> TabIdentity {
        TabIdentity { known }
    }

    pub fn known(&self) -> Option<&str> {
        self.known.as_deref()
    }

    /// The tab became visible and the session now holds `current`.
    pub fn on_visible(&mut self, current: Option<&str>) -> TabAction {
        if let (Some(known), Some(current)) = (self.known.as_deref(), current) {
            if known != current {
                return TabAction::SignOut { to: "/login".to_owned() };
            }
        }
        if self.known.is_some() && current.is_none() {
            return TabAction::Redirect { to: "/login".to_owned() };
        }

        self.known = current.map(str::to_owned);
        TabAction::Stay
    }

    pub fn on_change(&mut self, change: &AuthChange) -> TabAction {
        match change {
            AuthChange::SignedOut => match self.known.take() {
                Some(_) => TabAction::Redirect { to: "/login".to_owned() },
                None => TabAction::Stay,
            },
            AuthChange::SignedIn(user) | AuthChange::TokenRefreshed(user) => {
                if self.known.as_ref().is_some_and(|known| known != user) {
                    return TabAction::Reload { to: "/dashboard".to_owned() };
                }
                self.known = Some(user.clone());
                TabAction::Stay
            }
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct WatchQuery {
    known: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn session_check(
    Query(WatchQuery { known }): Query<WatchQuery>,
    State(auth_tx): State<broadcast::Sender<AuthEvent>>,
    session: Session,
) -> AppResult<Json<TabAction>> {
    let current = session.get::<String>(USER_ID).await?;
    let mut tab = TabIdentity::new(known.filter(|k| !k.is_empty()));

    let action = tab.on_visible(current.as_deref());
    if let TabAction::SignOut { .. } = action {
        info!(known = ?tab.known(), ?current, "session switched in another tab");
        let browser = session::browser_id(&session).await?;
        session::sign_out(&session).await?;
        publish(&auth_tx, browser, AuthChange::SignedOut);
    }

    Ok(Json(action))
}

#[debug_handler(state = AppState)]
pub(crate) async fn session_ws(
    Query(WatchQuery { known }): Query<WatchQuery>,
    State(auth_tx): State<broadcast::Sender<AuthEvent>>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let browser = session::browser_id(&session).await?;
    let known = match known.filter(|k| !k.is_empty()) {
        Some(known) => Some(known),
        None => session.get::<String>(USER_ID).await?,
    };

    Ok(ws.on_upgrade(async move |stream| {
        let mut rx = auth_tx.subscribe();
        let (mut sender, mut receiver) = stream.split();
        let mut tab = TabIdentity::new(known);

        let mut watch_task = tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if event.browser_id != browser {
                    continue;
                }

                let action = tab.on_change(&event.change);
                if action == TabAction::Stay {
                    continue;
                }
                let Ok(text) = serde_json::to_string(&action) else {
                    break;
                };
                let _ = sender.send(Message::Text(text.into())).await;
                break;
            }
        });

        // drain until the tab goes away
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                if let Message::Close(_) = msg {
                    break;
                }
            }
        });

        tokio::select! {
            _ = &mut watch_task => recv_task.abort(),
            _ = &mut recv_task => watch_task.abort(),
        };
    }))
}
