use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;
use tracing::{error, warn};

use crate::{include_res, models::ActorKind, session, AppResult, AppState, Notice};

use super::{provision_actor, watch::{publish, AuthChange, AuthEvent}, Identity, IdentityError};

#[derive(Debug, Deserialize)]
pub(crate) struct SignupForm {
    user_type: String,
    email: String,
    password: String,
    confirm_password: String,
    name: Option<String>,
    company_name: Option<String>,
}

/// A form that passed validation, with the name that goes on the profile.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ValidSignup {
    kind: ActorKind,
    name: String,
}

pub(crate) fn validate(form: &SignupForm) -> Result<ValidSignup, &'static str> {
    let kind = ActorKind::parse(&form.user_type).ok_or("Please choose job seeker or company")?;

    if form.password != form.confirm_password {
        return Err("Passwords do not match");
    }
    if form.password.chars().count() < 6 {
        return Err("Password must be at least 6 characters");
    }
    if form.email.trim().is_empty() {
        return Err("Please enter your email");
    }

    let name = match kind {
        ActorKind::JobSeeker => form.name.as_deref(),
        ActorKind::Company => form.company_name.as_deref(),
    }
    .map(str::trim)
    .filter(|name| !name.is_empty());

    match (kind, name) {
        (_, Some(name)) => Ok(ValidSignup { kind, name: name.to_owned() }),
        (ActorKind::JobSeeker, None) => Err("Please enter your full name"),
        (ActorKind::Company, None) => Err("Please enter your company name"),
    }
}

fn rejected(text: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "notice": Notice::error(text) }))).into_response()
}

#[debug_handler]
pub(crate) async fn signup_page() -> impl IntoResponse {
    Html(include_res!(str, "/pages/signup.html"))
}

#[debug_handler(state = AppState)]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    State(identity): State<Identity>,
    State(auth_tx): State<broadcast::Sender<AuthEvent>>,
    session: Session,

    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    let ValidSignup { kind, name } = match validate(&form) {
        Ok(valid) => valid,
        Err(text) => return Ok(rejected(text)),
    };

    let email = form.email.trim();
    let account = match identity.sign_up(email, &form.password).await {
        Ok(account) => account,
        Err(IdentityError::Transport(err)) => return Err(err.into()),
        Err(err) => {
            warn!(error = %err, "sign-up rejected");
            return Ok(rejected(err.user_message()));
        }
    };
    let user_id = account.tokens.user_id.clone();

    let browser = session::browser_id(&session).await?;
    session::sign_in(&session, &account.tokens).await?;
    publish(&auth_tx, browser, AuthChange::SignedIn(user_id.clone()));

    if let Err(err) = provision_actor(&db_pool, kind, &user_id, Some(email), Some(&name)).await {
        error!(%user_id, error = %err, "profile creation failed");
        return Ok(rejected("Profile creation failed. Please try again."));
    }

    Ok(Redirect::to("/dashboard").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(user_type: &str, password: &str, confirm: &str, name: Option<&str>, company: Option<&str>) -> SignupForm {
        SignupForm {
            user_type: user_type.to_owned(),
            email: "ada@example.com".to_owned(),
            password: password.to_owned(),
            confirm_password: confirm.to_owned(),
            name: name.map(str::to_owned),
            company_name: company.map(str::to_owned),
        }
    }

    #[test]
    fn passwords_must_match_and_be_long_enough() {
        assert_eq!(validate(&form("job_seeker", "secret1", "secret2", Some("Ada"), None)), Err("Passwords do not match"));
        assert_eq!(validate(&form("job_seeker", "12345", "12345", Some("Ada"), None)), Err("Password must be at least 6 characters"));
    }

    #[test]
    fn each_kind_needs_its_own_name() {
        assert_eq!(validate(&form("job_seeker", "secret1", "secret1", None, Some("Acme"))), Err("Please enter your full name"));
        assert_eq!(validate(&form("company", "secret1", "secret1", Some("Ada"), Some("  "))), Err("Please enter your company name"));
        assert_eq!(
            validate(&form("company", "secret1", "secret1", None, Some(" Acme "))),
            Ok(ValidSignup { kind: ActorKind::Company, name: "Acme".to_owned() })
        );
    }

    #[test]
    fn unknown_user_type_is_rejected() {
        assert!(validate(&form("recruiter", "secret1", "secret1", Some("Ada"), None)).is_err());
    }
}
