use anyhow::anyhow;
use axum::{debug_handler, extract::{Path, Query, State}, response::Redirect};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, warn};

use crate::{
    models::ActorKind,
    session::{self, CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_TYPE},
    AppState,
};

use super::{clients::ClientProvider, provision_actor, safe_return, watch::{publish, AuthChange}};

#[derive(Deserialize)]
pub struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "userType")]
    pub user_type: Option<String>,
}

/// Completes a provider sign-in. Any failure before the account session is
/// established lands on the auth error page.
#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(query): Query<LockinQuery>,
    State(state): State<AppState>,
    session: Session,
) -> Redirect {
    match complete(provider, query, &state, &session).await {
        Ok(return_url) => Redirect::to(&return_url),
        Err(err) => {
            warn!(%provider, error = %err, "sign-in completion failed");
            Redirect::to("/auth/auth-code-error")
        }
    }
}

async fn complete(
    provider: ClientProvider,
    LockinQuery { state, code, user_type }: LockinQuery,
    app: &AppState,
    session: &Session,
) -> anyhow::Result<String> {
    let state = CsrfToken::new(state.ok_or_else(|| anyhow!("OAuth: without state"))?);
    let code = AuthorizationCode::new(code.ok_or_else(|| anyhow!("OAuth: without code"))?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err(anyhow!("no csrf_state"));
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err(anyhow!("csrf tokens don't match"));
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err(anyhow!("no pkce_verifier"));
    };

    let client = app.clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let account = app.identity
        .sign_in_with_idp(provider, access_token, &format!("{}/", app.config.public_url))
        .await?;
    let user_id = account.tokens.user_id.clone();

    let browser = session::browser_id(session).await?;
    let return_url = session.remove::<String>(RETURN_URL).await?;
    let stored_type = session.remove::<String>(USER_TYPE).await?;
    session::sign_in(session, &account.tokens).await?;
    publish(&app.auth_tx, browser, AuthChange::SignedIn(user_id.clone()));

    info!(%user_id, %provider, "welcome");

    let kind = user_type.or(stored_type).as_deref().and_then(ActorKind::parse);
    if let Some(kind) = kind {
        let created = provision_actor(
            &app.db_pool,
            kind,
            &user_id,
            account.email.as_deref(),
            account.display_name.as_deref(),
        ).await;
        if let Err(err) = created {
            error!(%user_id, error = %err, "profile creation during sign-in failed");
        }
    }

    Ok(safe_return(return_url, "/dashboard"))
}
