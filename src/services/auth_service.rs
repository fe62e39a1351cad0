use std::time::{SystemTime, UNIX_EPOCH};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::AuthSettings,
    dao::models::UserEntity,
    dto::auth::{GoogleLoginRequest, LoginRequest, RegisterRequest, TokenResponse},
    error::ServiceError,
    services::google,
    state::SharedState,
};

const INVALID_CREDENTIALS: &str = "Could not validate credentials";
const INCORRECT_LOGIN: &str = "Incorrect email or password";

/// Claims carried by issued access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account email.
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
}

/// Canonical form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| ServiceError::Internal(format!("failed to encode salt: {err}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::Internal(format!("failed to hash password: {err}")))
}

/// False for malformed hashes as well as wrong passwords.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    PasswordHash::new(hashed)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Sign an HS256 access token for `subject`.
pub fn issue_token(settings: &AuthSettings, subject: &str) -> Result<String, ServiceError> {
    let iat = unix_now();
    let claims = Claims {
        sub: subject.to_owned(),
        exp: iat + settings.token_ttl.as_secs(),
        iat,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|err| ServiceError::Internal(format!("failed to sign token: {err}")))
}

/// Validate signature and expiry of `token`.
pub fn decode_token(settings: &AuthSettings, token: &str) -> Result<Claims, ServiceError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|err| {
        debug!(error = %err, "rejected access token");
        ServiceError::Unauthorized(INVALID_CREDENTIALS.into())
    })
}

/// Create a password account and log it in.
pub async fn register(
    state: &SharedState,
    request: RegisterRequest,
) -> Result<TokenResponse, ServiceError> {
    let store = state.require_store().await?;
    let email = normalize_email(&request.email);
    let username = request.username.trim().to_owned();

    if store.find_user_by_email(email.clone()).await?.is_some() {
        return Err(ServiceError::InvalidInput("Email already registered".into()));
    }
    if store.find_user_by_username(username.clone()).await?.is_some() {
        return Err(ServiceError::InvalidInput("Username already taken".into()));
    }

    let now = SystemTime::now();
    let user = UserEntity {
        id: Uuid::new_v4(),
        email,
        username,
        hashed_password: Some(hash_password(&request.password)?),
        google_id: None,
        full_name: None,
        avatar_url: None,
        is_active: true,
        is_verified: true,
        created_at: now,
        updated_at: now,
    };
    store.create_user(user.clone()).await?;
    info!(user_id = %user.id, username = %user.username, "registered user");

    Ok(TokenResponse::bearer(issue_token(
        &state.config().auth,
        &user.email,
    )?))
}

/// Exchange email and password for a token.
pub async fn login(
    state: &SharedState,
    request: LoginRequest,
) -> Result<TokenResponse, ServiceError> {
    let store = state.require_store().await?;
    let user = store
        .find_user_by_email(normalize_email(&request.email))
        .await?
        .ok_or_else(|| ServiceError::Unauthorized(INCORRECT_LOGIN.into()))?;

    let verified = user
        .hashed_password
        .as_deref()
        .is_some_and(|hashed| verify_password(&request.password, hashed));
    if !verified {
        return Err(ServiceError::Unauthorized(INCORRECT_LOGIN.into()));
    }

    Ok(TokenResponse::bearer(issue_token(
        &state.config().auth,
        &user.email,
    )?))
}

/// Verify a Google ID token, resolve its account and issue a token for it.
pub async fn login_with_google_token(
    state: &SharedState,
    id_token: &str,
) -> Result<(UserEntity, String), ServiceError> {
    let info =
        google::verify_google_token(&state.config().google, state.google().as_ref(), id_token)
            .await?;
    let store = state.require_store().await?;
    let user = google::get_or_create_user_from_google(store.as_ref(), &info).await?;
    let token = issue_token(&state.config().auth, &user.email)?;
    Ok((user, token))
}

/// `POST /auth/google` flavour of [`login_with_google_token`].
pub async fn google_login(
    state: &SharedState,
    request: GoogleLoginRequest,
) -> Result<TokenResponse, ServiceError> {
    let (_, token) = login_with_google_token(state, request.token.trim()).await?;
    Ok(TokenResponse::bearer(token))
}

/// Resolve the active account behind a bearer token.
pub async fn current_user(state: &SharedState, token: &str) -> Result<UserEntity, ServiceError> {
    let claims = decode_token(&state.config().auth, token)?;
    let store = state.require_store().await?;
    let user = store
        .find_user_by_email(claims.sub)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !user.is_active {
        return Err(ServiceError::InvalidInput("Inactive user".into()));
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn settings(ttl: Duration) -> AuthSettings {
        AuthSettings {
            jwt_secret: "test-secret".into(),
            token_ttl: ttl,
        }
    }

    #[test]
    fn passwords_round_trip_through_argon2() {
        let hashed = hash_password("correct horse").unwrap();
        assert!(hashed.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hashed));
        assert!(!verify_password("wrong horse", &hashed));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn tokens_carry_the_subject() {
        let settings = settings(Duration::from_secs(3600));
        let token = issue_token(&settings, "ada@example.com").unwrap();
        let claims = decode_token(&settings, &token).unwrap();
        assert_eq!(claims.sub, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let token = issue_token(&settings(Duration::from_secs(60)), "ada@example.com").unwrap();
        let other = AuthSettings {
            jwt_secret: "another-secret".into(),
            token_ttl: Duration::from_secs(60),
        };
        assert!(matches!(
            decode_token(&other, &token),
            Err(ServiceError::Unauthorized(ref m)) if m == INVALID_CREDENTIALS
        ));
        assert!(decode_token(&other, "garbage").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let settings = settings(Duration::ZERO);
        let claims = Claims {
            sub: "ada@example.com".into(),
            exp: unix_now() - 3600,
            iat: unix_now() - 7200,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_token(&settings, &token).is_err());
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
