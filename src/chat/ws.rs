use axum::{
    debug_handler,
    extract::{ws::Message, Path, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::auth::SignedIn;

use super::store::{self, ChatMessage, MessageView};

/// Pushes the partner's new messages to this user and sends whatever text
/// frames the user writes.
#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(
    Path(partner_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<ChatMessage>>,
    SignedIn { user_id, .. }: SignedIn,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |stream| {
        let mut rx = tx.subscribe();
        let (mut sender, mut receiver) = stream.split();

        let me = user_id.clone();
        let partner = partner_id.clone();
        let broadcast_task = tokio::spawn(async move {
            loop {
                let msg = match rx.recv().await {
                    Ok(msg) => msg,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(%me, skipped, "chat feed lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if msg.receiver_id != me || msg.sender_id != partner {
                    continue;
                }

                let Ok(payload) = serde_json::to_string(&MessageView::from(msg)) else {
                    continue;
                };
                if sender.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue
            };
            let text = text.as_str().trim();
            if text.is_empty() {
                continue;
            }

            if let Err(err) = store::send(&db_pool, &tx, &user_id, &partner_id, text).await {
                warn!(%user_id, error = %err, "message from socket not stored");
            }
        }

        broadcast_task.abort();
        let _ = broadcast_task.await;
    })
}
