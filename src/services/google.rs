//! Google sign-in: ID token verification, the authorization-code exchange and account linking.

use std::time::SystemTime;

use futures::future::BoxFuture;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::GoogleSettings,
    dao::{models::UserEntity, store::TrivaiStore},
    error::ServiceError,
    services::auth_service::normalize_email,
};

const TOKEN_INFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const VALID_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Failure talking to Google.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// Google answered and refused the token or code.
    #[error("{0}")]
    Rejected(String),
    /// Google could not be reached or answered something unexpected.
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for GoogleError {
    fn from(err: reqwest::Error) -> Self {
        GoogleError::Transport(err.to_string())
    }
}

/// Claims of a verified ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Result of the authorization-code exchange.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenExchange {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
}

/// Parameters of the authorization-code exchange.
#[derive(Debug, Clone)]
pub struct CodeExchange {
    pub code: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Subset of the OpenID userinfo document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleProfile {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Identity extracted from a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleUserInfo {
    pub email: String,
    pub name: String,
    pub picture: String,
    pub google_id: String,
}

/// Google endpoints used by the sign-in flows.
pub trait GoogleClient: Send + Sync {
    /// Trade an authorization code for tokens.
    fn exchange_code(
        &self,
        request: CodeExchange,
    ) -> BoxFuture<'static, Result<TokenExchange, GoogleError>>;

    /// Fetch the profile behind an access token.
    fn fetch_user_info(
        &self,
        access_token: String,
    ) -> BoxFuture<'static, Result<GoogleProfile, GoogleError>>;

    /// Validate an ID token's signature, expiry and audience.
    fn verify_id_token(
        &self,
        id_token: String,
        client_id: String,
    ) -> BoxFuture<'static, Result<IdTokenClaims, GoogleError>>;
}

/// [`GoogleClient`] backed by Google's public HTTPS endpoints.
#[derive(Clone, Default)]
pub struct ReqwestGoogleClient {
    client: reqwest::Client,
}

impl ReqwestGoogleClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl GoogleClient for ReqwestGoogleClient {
    fn exchange_code(
        &self,
        request: CodeExchange,
    ) -> BoxFuture<'static, Result<TokenExchange, GoogleError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .post(TOKEN_URL)
                .form(&[
                    ("code", request.code.as_str()),
                    ("client_id", request.client_id.as_str()),
                    ("client_secret", request.client_secret.as_str()),
                    ("redirect_uri", request.redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(GoogleError::Transport(format!(
                    "token exchange failed ({status}): {body}"
                )));
            }
            Ok(response.json::<TokenExchange>().await?)
        })
    }

    fn fetch_user_info(
        &self,
        access_token: String,
    ) -> BoxFuture<'static, Result<GoogleProfile, GoogleError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .get(USER_INFO_URL)
                .bearer_auth(access_token)
                .send()
                .await?
                .error_for_status()?;
            Ok(response.json::<GoogleProfile>().await?)
        })
    }

    fn verify_id_token(
        &self,
        id_token: String,
        client_id: String,
    ) -> BoxFuture<'static, Result<IdTokenClaims, GoogleError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let response = client
                .get(TOKEN_INFO_URL)
                .query(&[("id_token", id_token.as_str())])
                .send()
                .await?;

            let status = response.status();
            if status.is_client_error() {
                return Err(GoogleError::Rejected("Token is invalid or expired".into()));
            }
            if !status.is_success() {
                return Err(GoogleError::Transport(format!(
                    "token verification returned {status}"
                )));
            }

            let claims = response.json::<IdTokenClaims>().await?;
            if claims.aud != client_id {
                return Err(GoogleError::Rejected(format!(
                    "Token has wrong audience {}, expected {client_id}",
                    claims.aud
                )));
            }
            Ok(claims)
        })
    }
}

/// Verify `id_token` against every configured client id in order.
pub async fn verify_google_token(
    settings: &GoogleSettings,
    client: &dyn GoogleClient,
    id_token: &str,
) -> Result<GoogleUserInfo, ServiceError> {
    if settings.client_ids.is_empty() {
        return Err(ServiceError::NotConfigured(
            "Google sign-in is not configured on the server".into(),
        ));
    }

    let mut last_error = None;
    for client_id in &settings.client_ids {
        match client
            .verify_id_token(id_token.to_owned(), client_id.clone())
            .await
        {
            Ok(claims) => match user_info_from_claims(claims) {
                Ok(info) => return Ok(info),
                Err(err) => last_error = Some(err),
            },
            Err(err @ GoogleError::Rejected(_)) => {
                debug!(client_id, error = %err, "google token rejected for client id");
                last_error = Some(err);
            }
            Err(err @ GoogleError::Transport(_)) => {
                last_error = Some(err);
                break;
            }
        }
    }

    match last_error {
        Some(GoogleError::Rejected(message)) => Err(ServiceError::Unauthorized(format!(
            "Invalid Google token: {message}"
        ))),
        Some(GoogleError::Transport(message)) => Err(ServiceError::InvalidInput(format!(
            "Error verifying Google token: {message}"
        ))),
        None => Err(ServiceError::InvalidInput(
            "Error verifying Google token: Unknown error".into(),
        )),
    }
}

fn user_info_from_claims(claims: IdTokenClaims) -> Result<GoogleUserInfo, GoogleError> {
    if !VALID_ISSUERS.contains(&claims.iss.as_str()) {
        return Err(GoogleError::Rejected("Wrong issuer for Google token.".into()));
    }
    let email = claims
        .email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| GoogleError::Rejected("Token carries no email".into()))?;

    Ok(GoogleUserInfo {
        email,
        name: claims.name.unwrap_or_default(),
        picture: claims.picture.unwrap_or_default(),
        google_id: claims.sub,
    })
}

/// Find the account for a Google identity, linking or creating one as needed.
pub async fn get_or_create_user_from_google(
    store: &dyn TrivaiStore,
    info: &GoogleUserInfo,
) -> Result<UserEntity, ServiceError> {
    if let Some(user) = store.find_user_by_google_id(info.google_id.clone()).await? {
        return Ok(user);
    }

    let email = normalize_email(&info.email);
    if let Some(mut user) = store.find_user_by_email(email.clone()).await? {
        user.google_id = Some(info.google_id.clone());
        if user.full_name.is_none() && !info.name.is_empty() {
            user.full_name = Some(info.name.clone());
        }
        if user.avatar_url.is_none() && !info.picture.is_empty() {
            user.avatar_url = Some(info.picture.clone());
        }
        user.updated_at = SystemTime::now();
        store.update_user(user.clone()).await?;
        info!(user_id = %user.id, "linked google account to existing user");
        return Ok(user);
    }

    let username = unique_username(store, local_part(&email)).await?;
    let now = SystemTime::now();
    let user = UserEntity {
        id: Uuid::new_v4(),
        email,
        username,
        hashed_password: None,
        google_id: Some(info.google_id.clone()),
        full_name: Some(info.name.clone()).filter(|name| !name.is_empty()),
        avatar_url: Some(info.picture.clone()).filter(|url| !url.is_empty()),
        is_active: true,
        is_verified: true,
        created_at: now,
        updated_at: now,
    };
    store.create_user(user.clone()).await?;
    info!(user_id = %user.id, username = %user.username, "created user from google sign-in");
    Ok(user)
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

async fn unique_username(store: &dyn TrivaiStore, base: &str) -> Result<String, ServiceError> {
    let base = if base.is_empty() { "player" } else { base };
    let mut candidate = base.to_owned();
    let mut suffix = 1u32;
    while store.find_user_by_username(candidate.clone()).await?.is_some() {
        candidate = format!("{base}{suffix}");
        suffix += 1;
        if suffix > 10_000 {
            warn!(base, "could not find a free username");
            return Err(ServiceError::Internal("could not allocate a username".into()));
        }
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use super::*;
    use crate::dao::store::MemoryStore;

    /// Accepts tokens listed in `tokens` for the matching audience.
    #[derive(Default)]
    struct FakeGoogle {
        tokens: HashMap<String, IdTokenClaims>,
        calls: Mutex<Vec<String>>,
        offline: bool,
    }

    impl GoogleClient for FakeGoogle {
        fn exchange_code(
            &self,
            _request: CodeExchange,
        ) -> BoxFuture<'static, Result<TokenExchange, GoogleError>> {
            Box::pin(async { Ok(TokenExchange::default()) })
        }

        fn fetch_user_info(
            &self,
            _access_token: String,
        ) -> BoxFuture<'static, Result<GoogleProfile, GoogleError>> {
            Box::pin(async { Ok(GoogleProfile::default()) })
        }

        fn verify_id_token(
            &self,
            id_token: String,
            client_id: String,
        ) -> BoxFuture<'static, Result<IdTokenClaims, GoogleError>> {
            self.calls.lock().unwrap().push(client_id.clone());
            let result = if self.offline {
                Err(GoogleError::Transport("connection refused".into()))
            } else {
                match self.tokens.get(&id_token) {
                    Some(claims) if claims.aud == client_id => Ok(claims.clone()),
                    Some(_) => Err(GoogleError::Rejected("wrong audience".into())),
                    None => Err(GoogleError::Rejected("bad token".into())),
                }
            };
            Box::pin(async move { result })
        }
    }

    fn claims(aud: &str, iss: &str) -> IdTokenClaims {
        IdTokenClaims {
            iss: iss.into(),
            aud: aud.into(),
            sub: "google-sub".into(),
            email: Some("Ada@Example.com".into()),
            name: Some("Ada".into()),
            picture: None,
        }
    }

    fn settings(ids: &[&str]) -> GoogleSettings {
        GoogleSettings {
            client_ids: ids.iter().map(|id| id.to_string()).collect(),
            ..GoogleSettings::default()
        }
    }

    #[tokio::test]
    async fn second_client_id_is_tried() {
        let google = FakeGoogle {
            tokens: HashMap::from([("tok".into(), claims("web", "accounts.google.com"))]),
            ..FakeGoogle::default()
        };

        let info = verify_google_token(&settings(&["mobile", "web"]), &google, "tok")
            .await
            .unwrap();

        assert_eq!(info.google_id, "google-sub");
        assert_eq!(info.picture, "");
        assert_eq!(*google.calls.lock().unwrap(), vec!["mobile", "web"]);
    }

    #[tokio::test]
    async fn wrong_issuer_is_unauthorized() {
        let google = FakeGoogle {
            tokens: HashMap::from([("tok".into(), claims("web", "evil.example.com"))]),
            ..FakeGoogle::default()
        };

        let err = verify_google_token(&settings(&["web"]), &google, "tok")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::Unauthorized(ref m) if m == "Invalid Google token: Wrong issuer for Google token.")
        );
    }

    #[tokio::test]
    async fn transport_failure_stops_early() {
        let google = FakeGoogle {
            offline: true,
            ..FakeGoogle::default()
        };

        let err = verify_google_token(&settings(&["a", "b"]), &google, "tok")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(ref m) if m.starts_with("Error verifying Google token")));
        assert_eq!(google.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_client_ids_is_not_configured() {
        let err = verify_google_token(&settings(&[]), &FakeGoogle::default(), "tok")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(_)));
    }

    fn identity(google_id: &str, email: &str) -> GoogleUserInfo {
        GoogleUserInfo {
            email: email.into(),
            name: "Ada".into(),
            picture: String::new(),
            google_id: google_id.into(),
        }
    }

    #[tokio::test]
    async fn new_google_users_get_a_free_username() {
        let store = MemoryStore::new();
        let first = get_or_create_user_from_google(&store, &identity("g1", "ada@one.com"))
            .await
            .unwrap();
        let second = get_or_create_user_from_google(&store, &identity("g2", "ada@two.com"))
            .await
            .unwrap();
        let third = get_or_create_user_from_google(&store, &identity("g3", "ada@three.com"))
            .await
            .unwrap();

        assert_eq!(first.username, "ada");
        assert_eq!(second.username, "ada1");
        assert_eq!(third.username, "ada2");
        assert!(first.hashed_password.is_none());
        assert!(first.is_verified);
    }

    #[tokio::test]
    async fn existing_email_is_linked() {
        let store = MemoryStore::new();
        let created = get_or_create_user_from_google(&store, &identity("g1", "ada@one.com"))
            .await
            .unwrap();

        let mut unlinked = created.clone();
        unlinked.google_id = None;
        store.update_user(unlinked).await.unwrap();

        let linked = get_or_create_user_from_google(&store, &identity("g9", "ADA@one.com"))
            .await
            .unwrap();
        assert_eq!(linked.id, created.id);
        assert_eq!(linked.google_id.as_deref(), Some("g9"));

        let again = get_or_create_user_from_google(&store, &identity("g9", "other@x.com"))
            .await
            .unwrap();
        assert_eq!(again.id, created.id);
    }
}
