pub mod form;
mod page;
pub mod store;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vacancies", get(page::list).post(page::create))
        .route("/vacancies/{id}", get(page::show).post(page::update).delete(page::delete))
        .route("/vacancies/{id}/toggle", post(page::toggle))
}
