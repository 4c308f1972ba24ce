mod page;
pub mod store;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(page::profile).post(page::update))
        .route("/profile/complete", post(page::complete))
}
