use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::{
    auth::{provision_actor, CurrentActor, SignedIn},
    models::{non_blank, Actor, ActorKind},
    AppResult, AppState, Notice,
};

use super::store::{self, ProfileForm};

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    State(db_pool): State<SqlitePool>,
    SignedIn { user_id, .. }: SignedIn,
) -> AppResult<Response> {
    let actor = Actor::find(&db_pool, &user_id).await?;
    Ok(Json(json!({ "actor": actor })).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    State(db_pool): State<SqlitePool>,
    CurrentActor { actor, .. }: CurrentActor,

    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    store::update(&db_pool, &actor, form).await?;
    let actor = Actor::find(&db_pool, actor.id()).await?;

    Ok(Json(json!({ "actor": actor, "notice": Notice::success("Profile updated successfully") })).into_response())
}

#[derive(Deserialize)]
pub(crate) struct CompleteForm {
    user_type: String,
    email: Option<String>,
    #[serde(flatten)]
    profile: ProfileForm,
}

#[debug_handler(state = AppState)]
pub(crate) async fn complete(
    State(db_pool): State<SqlitePool>,
    SignedIn { user_id, .. }: SignedIn,

    Form(CompleteForm { user_type, email, profile }): Form<CompleteForm>,
) -> AppResult<Response> {
    let Some(kind) = ActorKind::parse(&user_type) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "notice": Notice::error("Please choose job seeker or company") })),
        ).into_response());
    };

    let email = non_blank(email);
    let name = profile.name_for(kind);
    if !provision_actor(&db_pool, kind, &user_id, email.as_deref(), name.as_deref()).await? {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({ "error": "profile_exists", "redirect": "/dashboard" })),
        ).into_response());
    }
    info!(%user_id, kind = kind.as_str(), "profile completed");

    let Some(actor) = Actor::find(&db_pool, &user_id).await? else {
        return Err(anyhow::anyhow!("profile {user_id} missing right after creation").into());
    };
    store::update(&db_pool, &actor, profile).await?;
    let actor = Actor::find(&db_pool, &user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "actor": actor, "redirect": "/dashboard" })),
    ).into_response())
}
