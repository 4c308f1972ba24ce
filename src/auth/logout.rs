use axum::{debug_handler, extract::{Query, State}, response::Redirect};
use serde::Deserialize;
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{session, AppResult, AppState};

use super::{safe_return, watch::{publish, AuthChange, AuthEvent}};

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    State(auth_tx): State<broadcast::Sender<AuthEvent>>,
    session: Session
) -> AppResult<Redirect> {
    let browser = session::browser_id(&session).await?;
    session::sign_out(&session).await?;
    publish(&auth_tx, browser, AuthChange::SignedOut);

    Ok(Redirect::to(&safe_return(return_url, "/login")))
}
