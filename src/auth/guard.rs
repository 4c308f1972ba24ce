use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::json;
use tokio::sync::broadcast;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::{
    models::Actor,
    session::{self, now_unix, EXPIRES_AT, REFRESH_TOKEN, USER_ID},
    AppError, AppState,
};

use super::{
    watch::{publish, AuthChange, AuthEvent},
    Identity,
};

/// Why a protected request has no usable user.
#[derive(Debug)]
pub enum SessionFault {
    /// Nobody signed in.
    Missing,
    /// The stored session was rejected and has been signed out.
    Invalid(String),
    Failed(AppError),
}

impl<E> From<E> for SessionFault
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        SessionFault::Failed(AppError(err.into()))
    }
}

const REDIRECT_TARGET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

pub fn login_redirect(path: &str) -> String {
    if path == "/" || path.is_empty() {
        return "/login".to_owned();
    }
    format!("/login?redirectTo={}", utf8_percent_encode(path, REDIRECT_TARGET))
}

/// Signs the browser out after its session was found to be invalid.
pub async fn force_sign_out(
    session: &Session,
    auth_tx: &broadcast::Sender<AuthEvent>,
    reason: impl Into<String>,
) -> SessionFault {
    let reason = reason.into();
    info!(%reason, "session expired or invalid, signing out");

    let browser = match session::browser_id(session).await {
        Ok(browser) => browser,
        Err(err) => return err.into(),
    };
    if let Err(err) = session::sign_out(session).await {
        return err.into();
    }
    publish(auth_tx, browser, AuthChange::SignedOut);

    SessionFault::Invalid(reason)
}

/// The signed-in user of this session, refreshing an expired id token first.
pub async fn resolve_user(
    session: &Session,
    identity: &Identity,
    auth_tx: &broadcast::Sender<AuthEvent>,
) -> Result<String, SessionFault> {
    let Some(user_id) = session.get::<String>(USER_ID).await? else {
        return Err(SessionFault::Missing);
    };

    let expires_at = session.get::<i64>(EXPIRES_AT).await?.unwrap_or(0);
    if expires_at > now_unix() {
        return Ok(user_id);
    }

    let Some(refresh_token) = session.get::<String>(REFRESH_TOKEN).await? else {
        return Err(force_sign_out(session, auth_tx, "refresh_token_not_found").await);
    };

    match identity.refresh(&refresh_token).await {
        Ok(tokens) => {
            session::store_tokens(session, &tokens).await?;
            let browser = session::browser_id(session).await?;
            publish(auth_tx, browser, AuthChange::TokenRefreshed(tokens.user_id.clone()));
            Ok(tokens.user_id)
        }
        Err(err) if err.is_session_error() => Err(force_sign_out(session, auth_tx, err.to_string()).await),
        Err(err) => Err(err.into()),
    }
}

/// A request made by a signed-in user.
pub struct SignedIn {
    pub user_id: String,
    pub session: Session,
}

impl FromRequestParts<AppState> for SignedIn {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match resolve_user(&session, &state.identity, &state.auth_tx).await {
            Ok(user_id) => Ok(SignedIn { user_id, session }),
            Err(SessionFault::Missing) => {
                let path = parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
                Err(Redirect::to(&login_redirect(path)).into_response())
            }
            Err(SessionFault::Invalid(_)) => Err(Redirect::to("/login").into_response()),
            Err(SessionFault::Failed(err)) => Err(err.into_response()),
        }
    }
}

/// A signed-in user whose job seeker or company profile exists.
pub struct CurrentActor {
    pub actor: Actor,
    pub session: Session,
}

pub fn profile_incomplete() -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "error": "profile_incomplete",
            "redirect": "/profile",
            "notice": { "level": "error", "text": "Please complete your profile to continue" },
        })),
    )
        .into_response()
}

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let SignedIn { user_id, session } = SignedIn::from_request_parts(parts, state).await?;

        match Actor::find(&state.db_pool, &user_id).await {
            Ok(Some(actor)) => Ok(CurrentActor { actor, session }),
            Ok(None) => {
                warn!(%user_id, "signed in without a profile");
                Err(profile_incomplete())
            }
            Err(err) => Err(AppError::from(err).into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode as Status, routing::post, Router};
    use serde_json::json;

    use super::*;
    use crate::session::{store_tokens, test_session, AuthTokens};

    #[test]
    fn login_redirect_keeps_the_target() {
        assert_eq!(login_redirect("/"), "/login");
        assert_eq!(login_redirect("/chat/abc"), "/login?redirectTo=/chat/abc");
        assert_eq!(login_redirect("/swipe?x=1"), "/login?redirectTo=/swipe%3Fx%3D1");
        assert_eq!(login_redirect("/chat/a b&c"), "/login?redirectTo=/chat/a%20b%26c");
        assert_eq!(login_redirect("/chat/é"), "/login?redirectTo=/chat/%C3%A9");
    }

    async fn identity_answering(status: Status, body: serde_json::Value) -> Identity {
        let app = Router::new().route(
            "/token",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Identity::from_json(&json!({
            "firebase": { "apikey": "k", "token_url": format!("http://{addr}/token") }
        })).unwrap()
    }

    async fn expired_session() -> Session {
        let session = test_session();
        store_tokens(&session, &AuthTokens {
            user_id: "u1".to_owned(),
            id_token: "old".to_owned(),
            refresh_token: "stale".to_owned(),
            expires_in: -10,
        }).await.unwrap();
        session.insert("swipe_session_u1_job_seeker", json!({ "current_index": 2, "timestamp": 0 })).await.unwrap();
        session
    }

    #[tokio::test]
    async fn missing_user_is_no_session() {
        let identity = Identity::from_json(&json!({ "firebase": { "apikey": "k" } })).unwrap();
        let (auth_tx, _) = broadcast::channel(4);

        let fault = resolve_user(&test_session(), &identity, &auth_tx).await.unwrap_err();
        assert!(matches!(fault, SessionFault::Missing));
    }

    #[tokio::test]
    async fn fresh_token_needs_no_provider() {
        // unroutable provider, must not be called
        let identity = Identity::from_json(&json!({
            "firebase": { "apikey": "k", "token_url": "http://127.0.0.1:9/token" }
        })).unwrap();
        let (auth_tx, _) = broadcast::channel(4);
        let session = test_session();
        store_tokens(&session, &AuthTokens {
            user_id: "u1".to_owned(),
            id_token: "id".to_owned(),
            refresh_token: "r".to_owned(),
            expires_in: 3600,
        }).await.unwrap();

        assert_eq!(resolve_user(&session, &identity, &auth_tx).await.unwrap(), "u1");
    }

    #[tokio::test]
    async fn rejected_refresh_signs_out_and_clears_state() {
        let identity = identity_answering(
            Status::BAD_REQUEST,
            json!({ "error": { "code": 400, "message": "INVALID_REFRESH_TOKEN" } }),
        ).await;
        let (auth_tx, mut auth_rx) = broadcast::channel(4);
        let session = expired_session().await;

        let fault = resolve_user(&session, &identity, &auth_tx).await.unwrap_err();

        assert!(matches!(fault, SessionFault::Invalid(ref reason) if reason.contains("INVALID_REFRESH_TOKEN")));
        assert_eq!(session.get::<String>(USER_ID).await.unwrap(), None);
        assert_eq!(session.get::<String>(REFRESH_TOKEN).await.unwrap(), None);
        assert_eq!(session.get::<serde_json::Value>("swipe_session_u1_job_seeker").await.unwrap(), None);
        assert!(matches!(auth_rx.recv().await.unwrap().change, AuthChange::SignedOut));
    }

    #[tokio::test]
    async fn refresh_replaces_tokens() {
        let identity = identity_answering(
            Status::OK,
            json!({ "user_id": "u1", "id_token": "new", "refresh_token": "r2", "expires_in": "3600" }),
        ).await;
        let (auth_tx, mut auth_rx) = broadcast::channel(4);
        let session = expired_session().await;

        assert_eq!(resolve_user(&session, &identity, &auth_tx).await.unwrap(), "u1");
        assert_eq!(session.get::<String>(REFRESH_TOKEN).await.unwrap().as_deref(), Some("r2"));
        assert!(session.get::<i64>(EXPIRES_AT).await.unwrap().unwrap() > now_unix());
        assert!(matches!(auth_rx.recv().await.unwrap().change, AuthChange::TokenRefreshed(ref user) if user == "u1"));
    }

    #[tokio::test]
    async fn provider_outage_is_not_a_sign_out() {
        let identity = identity_answering(
            Status::INTERNAL_SERVER_ERROR,
            json!({ "error": { "code": 500, "message": "BACKEND_ERROR" } }),
        ).await;
        let (auth_tx, _) = broadcast::channel(4);
        let session = expired_session().await;

        let fault = resolve_user(&session, &identity, &auth_tx).await.unwrap_err();
        assert!(matches!(fault, SessionFault::Failed(_)));
        assert_eq!(session.get::<String>(USER_ID).await.unwrap().as_deref(), Some("u1"));
    }
}
