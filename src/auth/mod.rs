use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tracing::info;

use crate::{models::{Actor, ActorKind}, res, AppState};

mod clients;
mod guard;
mod identity;
mod lockin;
mod login;
mod logout;
mod signup;
mod watch;

pub use clients::{ClientProvider, Clients};
pub use guard::{force_sign_out, login_redirect, profile_incomplete, resolve_user, CurrentActor, SessionFault, SignedIn};
pub use identity::{is_session_error, Identity, IdentityError, SignedInAccount};
pub use watch::{publish, AuthChange, AuthEvent, TabAction, TabIdentity};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::credential_login))
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/signup", get(signup::signup_page).post(signup::signup))
        .route("/logout", get(logout::logout))
        .route("/auth/auth-code-error", get(res::auth_code_error))
        .route("/session/check", get(watch::session_check))
        .route("/session/ws", get(watch::session_ws))
}

/// Only same-site paths are followed after sign-in.
pub(crate) fn safe_return(url: Option<String>, default: &str) -> String {
    match url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => url,
        _ => default.to_owned(),
    }
}

/// The name a new profile starts with when the person gave none.
pub fn fallback_name(kind: ActorKind, name: Option<&str>, email: Option<&str>) -> String {
    name.map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| email.and_then(|email| email.split('@').next()).filter(|local| !local.is_empty()))
        .map(str::to_owned)
        .unwrap_or_else(|| match kind {
            ActorKind::JobSeeker => "User".to_owned(),
            ActorKind::Company => "Company".to_owned(),
        })
}

/// Creates the job seeker or company row for `user_id` unless the account
/// already has one. Returns whether a row was created.
pub async fn provision_actor(
    db_pool: &SqlitePool,
    kind: ActorKind,
    user_id: &str,
    email: Option<&str>,
    name: Option<&str>,
) -> Result<bool, sqlx::Error> {
    if Actor::find(db_pool, user_id).await?.is_some() {
        return Ok(false);
    }

    let name = fallback_name(kind, name, email);
    let email = email.unwrap_or_default();

    info!(%user_id, kind = kind.as_str(), %name, "creating profile");
    let result = match kind {
        ActorKind::JobSeeker => sqlx::query("INSERT INTO job_seekers (id,name,email) VALUES (?,?,?) ON CONFLICT(id) DO NOTHING")
            .bind(user_id)
            .bind(&name)
            .bind(email)
            .execute(db_pool)
            .await?,
        ActorKind::Company => sqlx::query("INSERT INTO companies (id,company_name,email,subscription_status) VALUES (?,?,?,'trial') ON CONFLICT(id) DO NOTHING")
            .bind(user_id)
            .bind(&name)
            .bind(email)
            .execute(db_pool)
            .await?,
    };

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_name_prefers_given_then_email() {
        assert_eq!(fallback_name(ActorKind::JobSeeker, Some(" Ada "), Some("x@y.z")), "Ada");
        assert_eq!(fallback_name(ActorKind::JobSeeker, Some(""), Some("ada@y.z")), "ada");
        assert_eq!(fallback_name(ActorKind::JobSeeker, None, None), "User");
        assert_eq!(fallback_name(ActorKind::Company, None, Some("@y.z")), "Company");
    }

    #[test]
    fn safe_return_rejects_offsite_targets() {
        assert_eq!(safe_return(Some("/swipe".to_owned()), "/dashboard"), "/swipe");
        assert_eq!(safe_return(Some("//evil.example".to_owned()), "/dashboard"), "/dashboard");
        assert_eq!(safe_return(Some("https://evil.example".to_owned()), "/dashboard"), "/dashboard");
        assert_eq!(safe_return(None, "/dashboard"), "/dashboard");
    }

    #[tokio::test]
    async fn provisioning_happens_once() {
        let db_pool = crate::db::test_pool().await;

        assert!(provision_actor(&db_pool, ActorKind::Company, "c1", Some("hr@acme.io"), None).await.unwrap());
        assert!(!provision_actor(&db_pool, ActorKind::Company, "c1", Some("hr@acme.io"), Some("Acme")).await.unwrap());
        // an existing company is never turned into a job seeker
        assert!(!provision_actor(&db_pool, ActorKind::JobSeeker, "c1", None, None).await.unwrap());

        let Some(Actor::Company(company)) = Actor::find(&db_pool, "c1").await.unwrap() else {
            panic!("expected a company");
        };
        assert_eq!(company.company_name, "hr");
        assert_eq!(company.subscription_status, "trial");
    }
}
