//! Client for the hosted identity provider (Firebase Identity Toolkit and the
//! Secure Token API). Accounts, passwords and refresh tokens live there; this
//! service only keeps the tokens it is handed in the session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::form_urlencoded;

use crate::{session::AuthTokens, GetField};

use super::clients::ClientProvider;

const TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Messages that mean the stored session can never be refreshed again.
const SESSION_ERRORS: &[&str] = &[
    "INVALID_REFRESH_TOKEN",
    "TOKEN_EXPIRED",
    "USER_DISABLED",
    "USER_NOT_FOUND",
    "INVALID_ID_TOKEN",
    "Invalid Refresh Token",
    "refresh_token_not_found",
    "invalid_grant",
];

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("malformed identity response: {0}")]
    Malformed(String),
}

pub fn is_session_error(message: &str) -> bool {
    SESSION_ERRORS.iter().any(|marker| message.contains(marker))
}

impl IdentityError {
    pub fn is_session_error(&self) -> bool {
        match self {
            IdentityError::Rejected { message, .. } => is_session_error(message),
            _ => false,
        }
    }

    /// What a person filling in the login or signup form gets to read.
    pub fn user_message(&self) -> &'static str {
        let IdentityError::Rejected { message, .. } = self else {
            return "Authentication service unavailable. Please try again.";
        };
        let code = message.split(':').next().unwrap_or_default().trim();
        match code {
            "EMAIL_EXISTS" => "An account with this email already exists",
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "Invalid email or password",
            "INVALID_EMAIL" => "Please enter a valid email address",
            "WEAK_PASSWORD" => "Password must be at least 6 characters",
            "USER_DISABLED" => "This account has been disabled",
            "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.",
            _ => "Authentication failed",
        }
    }
}

/// A completed sign-in together with what the provider knows about the person.
#[derive(Debug, Clone)]
pub struct SignedInAccount {
    pub tokens: AuthTokens,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone)]
pub struct Identity {
    http: reqwest::Client,
    api_key: String,
    toolkit_url: String,
    token_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: String,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

impl Identity {
    /// Reads the `firebase` section of the secrets file. `toolkit_url` and
    /// `token_url` may override the hosted endpoints.
    pub fn from_json(json: &Value) -> anyhow::Result<Identity> {
        let firebase = json.get_obj_field("firebase")?;
        Ok(Identity {
            http: reqwest::ClientBuilder::new()
                .redirect(reqwest::redirect::Policy::none())
                .build()?,
            api_key: firebase.get_str_field("apikey")?,
            toolkit_url: firebase.get_str_field("toolkit_url").unwrap_or_else(|_| TOOLKIT_URL.to_owned()),
            token_url: firebase.get_str_field("token_url").unwrap_or_else(|_| TOKEN_URL.to_owned()),
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignedInAccount, IdentityError> {
        self.password_call("accounts:signUp", email, password).await
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignedInAccount, IdentityError> {
        self.password_call("accounts:signInWithPassword", email, password).await
    }

    /// Trades an OAuth access token from `provider` for an account session.
    pub async fn sign_in_with_idp(
        &self,
        provider: ClientProvider,
        access_token: &str,
        request_uri: &str,
    ) -> Result<SignedInAccount, IdentityError> {
        let body = self.post(
            "accounts:signInWithIdp",
            &IdpRequest {
                post_body: idp_post_body(provider, access_token),
                request_uri: request_uri.to_owned(),
                return_idp_credential: true,
                return_secure_token: true,
            },
        ).await?;
        account_from(&body)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, IdentityError> {
        let response = self.http.post(&self.token_url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;
        let body = checked(response).await?;

        let RefreshResponse { user_id, id_token, refresh_token, expires_in } = serde_json::from_value(body)
            .map_err(|err| IdentityError::Malformed(err.to_string()))?;
        Ok(AuthTokens {
            user_id,
            id_token,
            refresh_token,
            expires_in: parse_expiry(&expires_in)?,
        })
    }

    async fn password_call(&self, method: &str, email: &str, password: &str) -> Result<SignedInAccount, IdentityError> {
        let body = self.post(method, &PasswordRequest { email, password, return_secure_token: true }).await?;
        account_from(&body)
    }

    async fn post(&self, method: &str, request: &impl Serialize) -> Result<Value, IdentityError> {
        debug!(method, "identity call");
        let response = self.http.post(format!("{}/{method}", self.toolkit_url))
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;
        checked(response).await
    }
}

async fn checked(response: reqwest::Response) -> Result<Value, IdentityError> {
    let status = response.status();
    let body: Value = response.json().await?;
    if status.is_success() {
        return Ok(body);
    }

    let message = body.get("error")
        .and_then(|err| err.get("message").or(Some(err)))
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_owned();
    Err(IdentityError::Rejected { status: status.as_u16(), message })
}

fn account_from(body: &Value) -> Result<SignedInAccount, IdentityError> {
    let field = |name: &str| body.get_str_field(name).map_err(|err| IdentityError::Malformed(err.to_string()));

    Ok(SignedInAccount {
        tokens: AuthTokens {
            user_id: field("localId")?,
            id_token: field("idToken")?,
            refresh_token: field("refreshToken")?,
            expires_in: parse_expiry(&field("expiresIn")?)?,
        },
        email: body.get_str_field("email").ok(),
        display_name: body.get_str_field("displayName").ok().or_else(|| body.get_str_field("fullName").ok()),
    })
}

fn parse_expiry(raw: &str) -> Result<i64, IdentityError> {
    raw.parse::<i64>()
        .map_err(|_| IdentityError::Malformed(format!("expiresIn {raw:?} is not a number")))
}

fn idp_post_body(provider: ClientProvider, access_token: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("access_token", access_token)
        .append_pair("providerId", provider.id())
        .finish()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn session_errors_are_recognized() {
        assert!(is_session_error("INVALID_REFRESH_TOKEN"));
        assert!(is_session_error("AuthApiError: Invalid Refresh Token: Refresh Token Not Found"));
        assert!(is_session_error("invalid_grant"));
        assert!(!is_session_error("INVALID_PASSWORD"));

        let network = IdentityError::Malformed("oops".to_owned());
        assert!(!network.is_session_error());
    }

    #[test]
    fn rejected_codes_map_to_form_messages() {
        let rejected = |message: &str| IdentityError::Rejected { status: 400, message: message.to_owned() };

        assert_eq!(rejected("EMAIL_EXISTS").user_message(), "An account with this email already exists");
        assert_eq!(
            rejected("WEAK_PASSWORD : Password should be at least 6 characters").user_message(),
            "Password must be at least 6 characters"
        );
        assert_eq!(rejected("INVALID_LOGIN_CREDENTIALS").user_message(), "Invalid email or password");
    }

    #[test]
    fn account_parses_sign_in_payload() {
        let account = account_from(&json!({
            "localId": "u1",
            "idToken": "id",
            "refreshToken": "r",
            "expiresIn": "3600",
            "email": "ada@example.com",
            "displayName": "Ada",
        })).unwrap();

        assert_eq!(account.tokens.user_id, "u1");
        assert_eq!(account.tokens.expires_in, 3600);
        assert_eq!(account.display_name.as_deref(), Some("Ada"));

        assert!(matches!(account_from(&json!({ "localId": "u1" })), Err(IdentityError::Malformed(_))));
    }

    #[test]
    fn idp_token_is_form_encoded() {
        assert_eq!(
            idp_post_body(ClientProvider::Google, "ya29.a&b=c/d e"),
            "access_token=ya29.a%26b%3Dc%2Fd+e&providerId=google.com"
        );
        assert_eq!(idp_post_body(ClientProvider::Github, "gho_1"), "access_token=gho_1&providerId=github.com");
    }

    #[test]
    fn endpoints_can_be_overridden() {
        let identity = Identity::from_json(&json!({
            "firebase": { "apikey": "k", "token_url": "http://127.0.0.1:9/token" }
        })).unwrap();

        assert_eq!(identity.token_url, "http://127.0.0.1:9/token");
        assert_eq!(identity.toolkit_url, TOOLKIT_URL);
    }
}
