mod page;
pub mod store;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use store::{ChatMessage, Conversation, MessageView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", get(page::conversations))
        .route("/chat/{partner}", get(page::conversation).post(page::send))
        .route("/chat/{partner}/ws", get(ws::chat_ws))
}
