//! Application-level configuration loading: JSON file first, environment overrides second.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVAI_BACK_CONFIG_PATH";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TOKEN_MINUTES: u64 = 60 * 24 * 7;
const DEFAULT_SESSION_IDLE_MINUTES: u64 = 120;
const DEFAULT_GENERATOR_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GENERATOR_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 90;
const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8000",
    "https://trivai.in",
    "https://www.trivai.in",
];

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port the HTTP server binds to.
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
    /// Token signing settings.
    pub auth: AuthSettings,
    /// Google sign-in settings.
    pub google: GoogleSettings,
    /// Question generation backend settings.
    pub generator: GeneratorSettings,
    /// Persistence settings.
    pub storage: StorageSettings,
    /// Inactivity window after which play sessions are evicted.
    pub session_idle: Duration,
}

/// Secret and lifetime used for issued access tokens.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

/// Google OAuth client registration.
#[derive(Debug, Clone, Default)]
pub struct GoogleSettings {
    /// Every client id accepted as an ID token audience, in preference order.
    pub client_ids: Vec<String>,
    pub client_secret: Option<String>,
    /// Public base URL of the web app; the OAuth callback hangs off it.
    pub app_url: Option<String>,
}

impl GoogleSettings {
    /// True when the redirect handshake has everything it needs.
    pub fn oauth_configured(&self) -> bool {
        !self.client_ids.is_empty() && self.client_secret.is_some() && self.app_url.is_some()
    }

    /// Client id used for the authorization-code flow.
    pub fn primary_client_id(&self) -> Option<&str> {
        self.client_ids.first().map(String::as_str)
    }
}

/// Chat-completions backend used to write trivia content.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Without a key the fallback generator is used.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Connection details for the optional MongoDB backend.
#[derive(Debug, Clone, Default)]
pub struct StorageSettings {
    pub mongo_uri: Option<String>,
    pub mongo_db: Option<String>,
}

impl AppConfig {
    /// Load `.env`, the JSON configuration file and environment overrides.
    pub fn load() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!(error = %err, "failed to load .env file");
            }
        }

        let raw = read_config_file();
        Self::from_sources(raw, |key| env::var(key).ok())
    }

    /// Merge a parsed config file with values looked up through `lookup`.
    pub fn from_sources<F>(raw: RawConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let port = var("PORT")
            .or_else(|| var("SERVER_PORT"))
            .and_then(|value| value.parse::<u16>().ok())
            .or(raw.port)
            .unwrap_or(DEFAULT_PORT);

        let cors_origins = var("CORS_ORIGINS")
            .map(|value| split_list(&value))
            .or(raw.cors_origins)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect());

        let jwt_secret = var("JWT_SECRET").or(raw.jwt_secret).unwrap_or_else(|| {
            warn!("JWT_SECRET not set; issuing tokens with an ephemeral secret");
            ephemeral_secret()
        });
        let token_minutes = var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .and_then(|value| value.parse::<u64>().ok())
            .or(raw.access_token_expire_minutes)
            .unwrap_or(DEFAULT_TOKEN_MINUTES);

        let mut raw_ids = vec![var("GOOGLE_CLIENT_ID"), var("NEXT_PUBLIC_GOOGLE_CLIENT_ID")];
        if let Some(extra) = var("GOOGLE_CLIENT_IDS") {
            raw_ids.extend(extra.split(',').map(|id| Some(id.to_owned())));
        }
        raw_ids.extend(raw.google_client_ids.into_iter().flatten().map(Some));

        let google = GoogleSettings {
            client_ids: collect_client_ids(raw_ids),
            client_secret: var("GOOGLE_CLIENT_SECRET").or(raw.google_client_secret),
            app_url: var("APP_URL")
                .or_else(|| var("NEXT_PUBLIC_APP_URL"))
                .or(raw.app_url)
                .map(|url| url.trim_end_matches('/').to_owned()),
        };

        let generator = GeneratorSettings {
            api_key: var("OPENAI_API_KEY").or(raw.openai_api_key),
            base_url: var("OPENAI_BASE_URL")
                .or(raw.openai_base_url)
                .unwrap_or_else(|| DEFAULT_GENERATOR_BASE_URL.into()),
            model: var("OPENAI_MODEL")
                .or(raw.openai_model)
                .unwrap_or_else(|| DEFAULT_GENERATOR_MODEL.into()),
            timeout: Duration::from_secs(
                var("GENERATOR_TIMEOUT_SECS")
                    .and_then(|value| value.parse().ok())
                    .or(raw.generator_timeout_secs)
                    .unwrap_or(DEFAULT_GENERATOR_TIMEOUT_SECS),
            ),
        };

        let storage = StorageSettings {
            mongo_uri: var("MONGO_URI").or(raw.mongo_uri),
            mongo_db: var("MONGO_DB").or(raw.mongo_db),
        };

        let idle_minutes = var("SESSION_IDLE_MINUTES")
            .and_then(|value| value.parse::<u64>().ok())
            .or(raw.session_idle_minutes)
            .unwrap_or(DEFAULT_SESSION_IDLE_MINUTES);

        if google.client_ids.is_empty() {
            warn!("no Google client id configured; Google sign-in is disabled");
        }

        Self {
            port,
            cors_origins,
            auth: AuthSettings {
                jwt_secret,
                token_ttl: Duration::from_secs(token_minutes * 60),
            },
            google,
            generator,
            storage,
            session_idle: Duration::from_secs(idle_minutes * 60),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_sources(RawConfig::default(), |_| None)
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub port: Option<u16>,
    pub cors_origins: Option<Vec<String>>,
    pub jwt_secret: Option<String>,
    pub access_token_expire_minutes: Option<u64>,
    pub google_client_ids: Option<Vec<String>>,
    pub google_client_secret: Option<String>,
    pub app_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub generator_timeout_secs: Option<u64>,
    pub mongo_uri: Option<String>,
    pub mongo_db: Option<String>,
    pub session_idle_minutes: Option<u64>,
}

fn read_config_file() -> RawConfig {
    let path = resolve_config_path();
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
            Ok(raw) => {
                info!(path = %path.display(), "loaded configuration file");
                raw
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse config; falling back to defaults"
                );
                RawConfig::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                path = %path.display(),
                "config file not found; using environment and built-in defaults"
            );
            RawConfig::default()
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read config; falling back to defaults"
            );
            RawConfig::default()
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Trim, drop empties and de-duplicate while keeping the first occurrence.
fn collect_client_ids(raw: Vec<Option<String>>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for candidate in raw.into_iter().flatten() {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !cleaned.iter().any(|id| id == candidate) {
            cleaned.push(candidate.to_owned());
        }
    }
    cleaned
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn ephemeral_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_sources(RawConfig::default(), |key| env.get(key).cloned())
    }

    #[test]
    fn google_client_ids_are_trimmed_and_deduplicated() {
        let config = config_with(&[
            ("GOOGLE_CLIENT_ID", " web-id "),
            ("NEXT_PUBLIC_GOOGLE_CLIENT_ID", "web-id"),
            ("GOOGLE_CLIENT_IDS", "ios-id, ,android-id,web-id"),
        ]);

        assert_eq!(
            config.google.client_ids,
            vec!["web-id", "ios-id", "android-id"]
        );
        assert_eq!(config.google.primary_client_id(), Some("web-id"));
    }

    #[test]
    fn defaults_apply_without_sources() {
        let config = config_with(&[]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cors_origins.len(), 4);
        assert!(!config.auth.jwt_secret.is_empty());
        assert!(config.google.client_ids.is_empty());
        assert!(!config.google.oauth_configured());
        assert!(config.generator.api_key.is_none());
    }

    #[test]
    fn environment_overrides_file_values() {
        let raw = RawConfig {
            port: Some(9000),
            jwt_secret: Some("from-file".into()),
            app_url: Some("https://file.example".into()),
            ..RawConfig::default()
        };
        let env: HashMap<&str, &str> = [
            ("PORT", "8181"),
            ("APP_URL", "https://trivai.in/"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ]
        .into_iter()
        .collect();

        let config =
            AppConfig::from_sources(raw, |key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.port, 8181);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.google.app_url.as_deref(), Some("https://trivai.in"));
        assert!(config.google.oauth_configured());
    }
}
