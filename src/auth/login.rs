use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use oauth2::{CsrfToken, PkceCodeChallenge, Scope};
use pulldown_cmark_escape::escape_html;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::{
    include_res,
    models::ActorKind,
    session::{self, CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_TYPE},
    AppResult, AppState, Notice,
};

use super::{clients::ClientProvider, safe_return, watch::{publish, AuthChange, AuthEvent}, Clients, Identity};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    #[serde(rename = "redirectTo")]
    pub(crate) redirect_to: Option<String>,
    #[serde(rename = "userType")]
    pub(crate) user_type: Option<String>,
}

fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    // writing into a String cannot fail
    let _ = escape_html(&mut out, raw);
    out
}

#[debug_handler]
pub(crate) async fn login_page(
    Query(LoginQuery { redirect_to, .. }): Query<LoginQuery>,
) -> impl IntoResponse {
    let redirect_to = safe_return(redirect_to, "/dashboard");
    Html(
        include_res!(str, "/pages/login.html")
            .replace("{redirect_to}", &escape_attr(&redirect_to))
    )
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    Path(provider): Path<ClientProvider>,
    Query(LoginQuery { redirect_to, user_type }): Query<LoginQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client(provider)?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (authorize_url, csrf_state) = client.authorize_url(CsrfToken::new_random)
        .add_scopes(provider.scopes().iter().map(|scope| Scope::new((*scope).to_owned())))
        .set_pkce_challenge(pkce_code_challenge)
        .url();

    session::browser_id(&session).await?;
    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    session.insert(RETURN_URL, safe_return(redirect_to, "/dashboard")).await?;
    match user_type.as_deref().and_then(ActorKind::parse) {
        Some(kind) => session.insert(USER_TYPE, kind.as_str()).await?,
        None => {
            session.remove_value(USER_TYPE).await?;
        }
    }

    Ok(Redirect::to(authorize_url.as_str()).into_response())
}

#[derive(Deserialize)]
pub(crate) struct CredentialForm {
    email: String,
    password: String,
    redirect_to: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn credential_login(
    State(identity): State<Identity>,
    State(auth_tx): State<broadcast::Sender<AuthEvent>>,
    session: Session,

    Form(CredentialForm { email, password, redirect_to }): Form<CredentialForm>,
) -> AppResult<Response> {
    let account = match identity.sign_in_with_password(email.trim(), &password).await {
        Ok(account) => account,
        Err(err) => {
            warn!(error = %err, "credential sign-in failed");
            if let super::IdentityError::Transport(_) = err {
                return Err(err.into());
            }
            return Ok((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "notice": Notice::error(err.user_message()) })),
            ).into_response());
        }
    };

    let browser = session::browser_id(&session).await?;
    session::sign_in(&session, &account.tokens).await?;
    publish(&auth_tx, browser, AuthChange::SignedIn(account.tokens.user_id.clone()));

    info!(user_id = %account.tokens.user_id, "welcome back");
    Ok(Redirect::to(&safe_return(redirect_to, "/dashboard")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_target_is_escaped_into_the_page() {
        assert_eq!(escape_attr(r#"/chat?a=1&b="x""#), "/chat?a=1&amp;b=&quot;x&quot;");
        assert_eq!(escape_attr("/x<script>"), "/x&lt;script&gt;");
    }
}
