//! Browser redirect flavour of Google sign-in.
//!
//! `/auth/google` sends the browser to Google with a base64 JSON `state` that remembers where the
//! player came from. `/auth/google/callback` finishes the code exchange and bounces back into the
//! web app with either `auth_success=1&app_token=...` or `auth_error=...` in the query string.

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::{
    config::GoogleSettings,
    error::ServiceError,
    services::{auth_service, google::CodeExchange},
    state::SharedState,
};

const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const CALLBACK_PATH: &str = "/auth/google/callback";
const DEFAULT_REDIRECT: &str = "/home";
/// Body of the 500 answered when the handshake is not configured.
pub const NOT_CONFIGURED: &str = "Google OAuth is not configured on the server.";

/// Whether the player started from the login or the sign-up screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthMode {
    #[default]
    Login,
    Signup,
}

impl OAuthMode {
    /// Anything but `signup` means login.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("signup") => OAuthMode::Signup,
            _ => OAuthMode::Login,
        }
    }
}

/// Payload round-tripped through Google in the `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub mode: OAuthMode,
    pub redirect_path: String,
}

impl Default for OAuthState {
    fn default() -> Self {
        Self {
            mode: OAuthMode::Login,
            redirect_path: DEFAULT_REDIRECT.into(),
        }
    }
}

/// Query string of the callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Keep only same-origin absolute paths; everything else goes to `/home`.
///
/// URL parsing strips tabs and newlines and reads `\` as `/`, so either one could turn a path into
/// a protocol-relative URL.
pub fn sanitize_redirect_path(path: Option<&str>) -> String {
    match path {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.chars().any(|c| c == '\\' || c.is_control()) =>
        {
            path.to_owned()
        }
        _ => DEFAULT_REDIRECT.to_owned(),
    }
}

pub fn encode_state(state: &OAuthState) -> String {
    serde_json::to_vec(state)
        .map(|json| STANDARD.encode(json))
        .unwrap_or_default()
}

/// Decode a `state` parameter, falling back to a login back to `/home` on any damage.
pub fn decode_state(raw: Option<&str>) -> OAuthState {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return OAuthState::default();
    };

    // form decoding turns an unescaped '+' into a space
    let raw = raw.replace(' ', "+");
    let Ok(bytes) = STANDARD
        .decode(&raw)
        .or_else(|_| STANDARD_NO_PAD.decode(raw.trim_end_matches('=')))
    else {
        return OAuthState::default();
    };
    let Ok(Value::Object(payload)) = serde_json::from_slice::<Value>(&bytes) else {
        return OAuthState::default();
    };

    OAuthState {
        mode: OAuthMode::parse(payload.get("mode").and_then(Value::as_str)),
        redirect_path: payload
            .get("redirectPath")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_REDIRECT)
            .to_owned(),
    }
}

struct HandshakeSettings<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    app_url: &'a str,
}

impl HandshakeSettings<'_> {
    fn callback_uri(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.app_url)
    }
}

fn handshake_settings(settings: &GoogleSettings) -> Result<HandshakeSettings<'_>, ServiceError> {
    let not_configured = || ServiceError::NotConfigured(NOT_CONFIGURED.into());
    if !settings.oauth_configured() {
        return Err(not_configured());
    }
    Ok(HandshakeSettings {
        client_id: settings.primary_client_id().ok_or_else(not_configured)?,
        client_secret: settings.client_secret.as_deref().ok_or_else(not_configured)?,
        app_url: settings.app_url.as_deref().ok_or_else(not_configured)?,
    })
}

/// Google consent screen URL for a player arriving from `redirect`.
pub fn authorization_url(
    settings: &GoogleSettings,
    mode: Option<&str>,
    redirect: Option<&str>,
) -> Result<Url, ServiceError> {
    let handshake = handshake_settings(settings)?;
    let state = encode_state(&OAuthState {
        mode: OAuthMode::parse(mode),
        redirect_path: sanitize_redirect_path(redirect),
    });

    Url::parse_with_params(
        AUTHORIZATION_ENDPOINT,
        &[
            ("client_id", handshake.client_id),
            ("redirect_uri", handshake.callback_uri().as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("access_type", "offline"),
            ("include_granted_scopes", "true"),
            ("prompt", "consent"),
            ("state", state.as_str()),
        ],
    )
    .map_err(|err| ServiceError::Internal(format!("failed to build authorization url: {err}")))
}

/// Resolve `path` against the app URL, landing on `/home` if it would leave the app's origin.
fn app_redirect(app_url: &str, path: &str) -> Result<Url, url::ParseError> {
    let base = Url::parse(app_url)?;
    let target = base.join(path)?;
    if target.origin() == base.origin() {
        Ok(target)
    } else {
        base.join(DEFAULT_REDIRECT)
    }
}

fn with_param(mut url: Url, key: &str, value: &str) -> Url {
    url.query_pairs_mut().append_pair(key, value);
    url
}

/// Finish the handshake and compute where the browser goes next.
///
/// Only a missing configuration is an error; every other failure is reported to the web app
/// through `auth_error`.
pub async fn complete_callback(
    state: &SharedState,
    query: CallbackQuery,
) -> Result<Url, ServiceError> {
    let handshake = handshake_settings(&state.config().google)?;
    let redirect_path = sanitize_redirect_path(Some(&decode_state(query.state.as_deref()).redirect_path));

    match exchange(state, &handshake, &redirect_path, query).await {
        Ok(url) => Ok(url),
        Err(err) => {
            warn!(error = %err, "google oauth callback failed");
            app_redirect(handshake.app_url, DEFAULT_REDIRECT)
                .map(|url| with_param(url, "auth_error", "oauth_failed"))
                .map_err(|err| ServiceError::Internal(format!("invalid app url: {err}")))
        }
    }
}

async fn exchange(
    state: &SharedState,
    handshake: &HandshakeSettings<'_>,
    redirect_path: &str,
    query: CallbackQuery,
) -> Result<Url, ServiceError> {
    let target = app_redirect(handshake.app_url, redirect_path)
        .map_err(|err| ServiceError::Internal(format!("invalid redirect target: {err}")))?;

    if let Some(error) = query.error.filter(|error| !error.is_empty()) {
        return Ok(with_param(target, "auth_error", &error));
    }
    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        return Ok(with_param(target, "auth_error", "missing_code"));
    };

    let google = state.google();
    let tokens = google
        .exchange_code(CodeExchange {
            code,
            client_id: handshake.client_id.to_owned(),
            client_secret: handshake.client_secret.to_owned(),
            redirect_uri: handshake.callback_uri(),
        })
        .await
        .map_err(|err| ServiceError::Internal(err.to_string()))?;

    let Some(id_token) = tokens.id_token.filter(|token| !token.is_empty()) else {
        return Ok(with_param(target, "auth_error", "missing_id_token"));
    };

    let profile = match tokens.access_token {
        Some(access_token) => google
            .fetch_user_info(access_token)
            .await
            .map_err(|err| ServiceError::Internal(err.to_string()))?,
        None => Default::default(),
    };
    let display_name = profile
        .name
        .filter(|name| !name.is_empty())
        .or_else(|| {
            profile
                .email
                .as_deref()
                .and_then(|email| email.split('@').next())
                .filter(|local| !local.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| "player".to_owned());

    let app_token = match auth_service::login_with_google_token(state, &id_token).await {
        Ok((user, token)) => {
            info!(user_id = %user.id, "google oauth sign-in completed");
            token
        }
        Err(err) => {
            let message = err.to_string();
            let reason = if message.is_empty() {
                "google_auth_failed"
            } else {
                message.as_str()
            };
            return Ok(with_param(target, "auth_error", reason));
        }
    };

    let url = with_param(target, "auth_success", "1");
    let url = with_param(url, "app_token", &app_token);
    let url = with_param(url, "user_name", &display_name);
    Ok(with_param(url, "redirect_path", redirect_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> GoogleSettings {
        GoogleSettings {
            client_ids: vec!["client-123".into()],
            client_secret: Some("shh".into()),
            app_url: Some("https://trivai.in".into()),
        }
    }

    #[test]
    fn redirect_paths_must_stay_on_site() {
        assert_eq!(sanitize_redirect_path(Some("/play/jeopardy")), "/play/jeopardy");
        assert_eq!(sanitize_redirect_path(None), "/home");
        assert_eq!(sanitize_redirect_path(Some("")), "/home");
        assert_eq!(sanitize_redirect_path(Some("https://evil.com")), "/home");
        assert_eq!(sanitize_redirect_path(Some("//evil.com")), "/home");
        assert_eq!(sanitize_redirect_path(Some("/\\evil.com")), "/home");
        assert_eq!(sanitize_redirect_path(Some("/\t/evil.example/x")), "/home");
        assert_eq!(sanitize_redirect_path(Some("/\n/evil.example/x")), "/home");
        assert_eq!(sanitize_redirect_path(Some("/\r\\evil.example")), "/home");
        assert_eq!(sanitize_redirect_path(Some("/play\\x")), "/home");
    }

    #[test]
    fn app_redirect_never_leaves_the_app_origin() {
        let url = app_redirect("https://trivai.in", "/play/feud").unwrap();
        assert_eq!(url.as_str(), "https://trivai.in/play/feud");

        let url = app_redirect("https://trivai.in", "/\t/evil.example/x").unwrap();
        assert_eq!(url.as_str(), "https://trivai.in/home");
        let url = app_redirect("https://trivai.in", "https://evil.example/").unwrap();
        assert_eq!(url.as_str(), "https://trivai.in/home");
    }

    #[test]
    fn state_uses_camel_case_json() {
        let encoded = encode_state(&OAuthState {
            mode: OAuthMode::Signup,
            redirect_path: "/play".into(),
        });
        let json = STANDARD.decode(&encoded).unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"mode":"signup","redirectPath":"/play"}"#
        );
        assert_eq!(
            decode_state(Some(&encoded)),
            OAuthState {
                mode: OAuthMode::Signup,
                redirect_path: "/play".into()
            }
        );
    }

    #[test]
    fn damaged_state_falls_back_to_login_home() {
        assert_eq!(decode_state(None), OAuthState::default());
        assert_eq!(decode_state(Some("%%%not base64")), OAuthState::default());
        assert_eq!(
            decode_state(Some(&STANDARD.encode("not json"))),
            OAuthState::default()
        );

        let odd = STANDARD.encode(r#"{"mode":"admin","redirectPath":42}"#);
        assert_eq!(decode_state(Some(&odd)), OAuthState::default());
    }

    #[test]
    fn authorization_url_carries_the_handshake() {
        let url = authorization_url(&configured(), Some("signup"), Some("//evil")).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "https://trivai.in/auth/google/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(
            decode_state(Some(&params["state"])),
            OAuthState {
                mode: OAuthMode::Signup,
                redirect_path: "/home".into()
            }
        );
    }

    #[test]
    fn missing_secret_is_not_configured() {
        let mut settings = configured();
        settings.client_secret = None;
        assert!(matches!(
            authorization_url(&settings, None, None),
            Err(ServiceError::NotConfigured(_))
        ));
    }
}
