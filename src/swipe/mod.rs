pub mod candidates;
pub mod cursor;
pub mod gesture;
pub mod matcher;
mod page;
pub mod recorder;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use page::{Deck, DeckView, SwipeResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/swipe", get(page::deck).post(page::swipe))
        .route("/swipe/reset", post(page::reset))
}
