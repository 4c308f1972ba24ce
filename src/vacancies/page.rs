use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::json;
use tracing::{debug, info};

use crate::{
    auth::CurrentActor,
    inflight::{self, InFlight},
    models::Actor,
    res, AppResult, AppState, Notice,
};

use super::{form::VacancyForm, store};

/// The company behind a request, or the response refusing everyone else.
fn company_id(actor: &Actor) -> Result<&str, Response> {
    match actor {
        Actor::Company(company) => Ok(&company.id),
        Actor::JobSeeker(_) => Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "companies_only", "notice": Notice::error("Only companies can manage vacancies") })),
        ).into_response()),
    }
}

fn invalid(text: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "notice": Notice::error(text) }))).into_response()
}

#[debug_handler(state = AppState)]
pub(crate) async fn list(
    State(state): State<AppState>,
    CurrentActor { actor, .. }: CurrentActor,
) -> AppResult<Response> {
    let company_id = match company_id(&actor) {
        Ok(id) => id,
        Err(refused) => return Ok(refused),
    };

    let vacancies = store::own(&state.db_pool, company_id).await?;
    Ok(Json(json!({ "vacancies": vacancies })).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn show(
    Path(vacancy_id): Path<String>,
    State(state): State<AppState>,
    CurrentActor { actor, .. }: CurrentActor,
) -> AppResult<Response> {
    let company_id = match company_id(&actor) {
        Ok(id) => id,
        Err(refused) => return Ok(refused),
    };

    match store::find_own(&state.db_pool, company_id, &vacancy_id).await? {
        Some(vacancy) => Ok(Json(vacancy).into_response()),
        None => Ok(res::sorry("vacancy")),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(state): State<AppState>,
    State(in_flight): State<InFlight>,
    CurrentActor { actor, .. }: CurrentActor,

    Form(form): Form<VacancyForm>,
) -> AppResult<Response> {
    let company_id = match company_id(&actor) {
        Ok(id) => id,
        Err(refused) => return Ok(refused),
    };
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(text) => return Ok(invalid(text)),
    };

    let Some(_ticket) = in_flight.try_begin(format!("vacancy:{company_id}")) else {
        debug!(%company_id, "vacancy form already in flight, dropped");
        return Ok(inflight::dropped());
    };

    let vacancy = store::create(&state.db_pool, company_id, &fields).await?;
    info!(%company_id, vacancy_id = %vacancy.id, "vacancy posted");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "vacancy": vacancy, "notice": Notice::success("Job vacancy created successfully") })),
    ).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    Path(vacancy_id): Path<String>,
    State(state): State<AppState>,
    State(in_flight): State<InFlight>,
    CurrentActor { actor, .. }: CurrentActor,

    Form(form): Form<VacancyForm>,
) -> AppResult<Response> {
    let company_id = match company_id(&actor) {
        Ok(id) => id,
        Err(refused) => return Ok(refused),
    };
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(text) => return Ok(invalid(text)),
    };

    let Some(_ticket) = in_flight.try_begin(format!("vacancy:{company_id}")) else {
        debug!(%company_id, "vacancy form already in flight, dropped");
        return Ok(inflight::dropped());
    };

    match store::update(&state.db_pool, company_id, &vacancy_id, &fields).await? {
        Some(vacancy) => Ok(Json(json!({
            "vacancy": vacancy,
            "notice": Notice::success("Job vacancy updated successfully"),
        })).into_response()),
        None => Ok(res::sorry("vacancy")),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn toggle(
    Path(vacancy_id): Path<String>,
    State(state): State<AppState>,
    CurrentActor { actor, .. }: CurrentActor,
) -> AppResult<Response> {
    let company_id = match company_id(&actor) {
        Ok(id) => id,
        Err(refused) => return Ok(refused),
    };

    let Some(vacancy) = store::toggle(&state.db_pool, company_id, &vacancy_id).await? else {
        return Ok(res::sorry("vacancy"));
    };

    let text = if vacancy.is_active { "Vacancy activated" } else { "Vacancy deactivated" };
    Ok(Json(json!({ "vacancy": vacancy, "notice": Notice::success(text) })).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete(
    Path(vacancy_id): Path<String>,
    State(state): State<AppState>,
    CurrentActor { actor, .. }: CurrentActor,
) -> AppResult<Response> {
    let company_id = match company_id(&actor) {
        Ok(id) => id,
        Err(refused) => return Ok(refused),
    };

    if !store::delete(&state.db_pool, company_id, &vacancy_id).await? {
        return Ok(res::sorry("vacancy"));
    }

    info!(%company_id, %vacancy_id, "vacancy deleted");
    Ok(Json(json!({ "deleted": true, "notice": Notice::success("Job vacancy deleted successfully") })).into_response())
}
