use axum::{debug_handler, response::Redirect};
use tower_sessions::Session;

use crate::{session::USER_ID, AppResult};

#[debug_handler]
pub async fn index(session: Session) -> AppResult<Redirect> {
    if session.get::<String>(USER_ID).await?.is_some() {
        return Ok(Redirect::to("/dashboard"));
    }

    Ok(Redirect::to("/login"))
}
