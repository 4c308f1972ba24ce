use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::{auth::SignedIn, inflight, load_within, AppResult, AppState, Notice};

use super::store::{self, Conversation, MessageView};

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub conversations: Vec<Conversation>,
    pub timed_out: bool,
}

#[derive(Debug, Serialize)]
pub struct Partner {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub partner: Partner,
    pub messages: Vec<MessageView>,
    pub timed_out: bool,
}

#[derive(Deserialize)]
pub(crate) struct SendMessage {
    message: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn conversations(
    State(state): State<AppState>,
    SignedIn { user_id, .. }: SignedIn,
) -> AppResult<Json<ConversationList>> {
    let loaded = load_within(
        state.config.load_timeout,
        "conversation list",
        store::conversations(&state.db_pool, &user_id),
    ).await?;

    Ok(Json(ConversationList {
        timed_out: loaded.is_none(),
        conversations: loaded.unwrap_or_default(),
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn conversation(
    Path(partner_id): Path<String>,
    State(state): State<AppState>,
    SignedIn { user_id, .. }: SignedIn,
) -> AppResult<Json<ConversationView>> {
    let loaded = load_within(state.config.load_timeout, "conversation", async {
        let name = store::partner_name(&state.db_pool, &partner_id).await?;
        let messages = store::between(&state.db_pool, &user_id, &partner_id).await?;
        Ok::<_, sqlx::Error>((name, messages))
    }).await?;

    let Some((name, messages)) = loaded else {
        return Ok(Json(ConversationView {
            partner: Partner { id: partner_id, name: String::new() },
            messages: Vec::new(),
            timed_out: true,
        }));
    };

    store::mark_read(&state.db_pool, &user_id, &partner_id).await?;

    Ok(Json(ConversationView {
        partner: Partner { id: partner_id, name },
        messages: messages.into_iter().map(MessageView::from).collect(),
        timed_out: false,
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    Path(partner_id): Path<String>,
    State(state): State<AppState>,
    SignedIn { user_id, .. }: SignedIn,

    Json(SendMessage { message }): Json<SendMessage>,
) -> AppResult<Response> {
    let text = message.trim();
    if text.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "notice": Notice::error("Message cannot be empty") })),
        ).into_response());
    }

    let Some(_ticket) = state.in_flight.try_begin(format!("chat:{user_id}")) else {
        debug!(%user_id, "message send already in flight, dropped");
        return Ok(inflight::dropped());
    };

    let sent = store::send(&state.db_pool, &state.tx, &user_id, &partner_id, text).await?;
    info!(%user_id, %partner_id, "message sent");

    Ok((StatusCode::CREATED, Json(MessageView::from(sent))).into_response())
}
