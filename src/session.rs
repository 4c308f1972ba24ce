use tower_sessions::Session;
use uuid::Uuid;

pub const USER_ID: &str = "user_id";
pub const ID_TOKEN: &str = "id_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
/// Unix seconds after which the id token must be refreshed.
pub const EXPIRES_AT: &str = "expires_at";

pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";
pub const USER_TYPE: &str = "user_type";

/// Survives sign-in and sign-out so tabs of one browser can be told apart from others.
pub const BROWSER_ID: &str = "browser_id";

pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub async fn browser_id(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(id) = session.get::<String>(BROWSER_ID).await? {
        return Ok(id);
    }

    let id = Uuid::now_v7().to_string();
    session.insert(BROWSER_ID, &id).await?;
    Ok(id)
}

/// Tokens handed out by the identity provider for one signed-in user.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub user_id: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Stores a fresh sign-in under a new session id, keeping the browser id.
pub async fn sign_in(session: &Session, tokens: &AuthTokens) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    store_tokens(session, tokens).await
}

pub async fn store_tokens(session: &Session, tokens: &AuthTokens) -> Result<(), tower_sessions::session::Error> {
    session.insert(USER_ID, &tokens.user_id).await?;
    session.insert(ID_TOKEN, &tokens.id_token).await?;
    session.insert(REFRESH_TOKEN, &tokens.refresh_token).await?;
    session.insert(EXPIRES_AT, now_unix() + tokens.expires_in).await?;
    Ok(())
}

/// Drops every auth artifact and swipe progress; only the browser id is kept.
pub async fn sign_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    let browser = session.get::<String>(BROWSER_ID).await?;
    session.clear().await;
    if let Some(browser) = browser {
        session.insert(BROWSER_ID, browser).await?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_session() -> Session {
    use std::sync::Arc;

    Session::new(None, Arc::new(tower_sessions::MemoryStore::default()), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_out_keeps_only_browser_id() {
        let session = test_session();
        let browser = browser_id(&session).await.unwrap();
        store_tokens(&session, &AuthTokens {
            user_id: "u1".to_owned(),
            id_token: "id".to_owned(),
            refresh_token: "refresh".to_owned(),
            expires_in: 3600,
        }).await.unwrap();
        session.insert("swipe_session_u1_company", 3).await.unwrap();

        sign_out(&session).await.unwrap();

        assert_eq!(session.get::<String>(USER_ID).await.unwrap(), None);
        assert_eq!(session.get::<String>(REFRESH_TOKEN).await.unwrap(), None);
        assert_eq!(session.get::<i64>("swipe_session_u1_company").await.unwrap(), None);
        assert_eq!(browser_id(&session).await.unwrap(), browser);
    }
}
