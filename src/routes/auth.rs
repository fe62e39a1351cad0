use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{HeaderMap, header, request::Parts},
    routing::{get, post},
};
use axum_valid::Valid;
use tracing::debug;

use crate::{
    dao::models::UserEntity,
    dto::auth::{GoogleLoginRequest, LoginRequest, RegisterRequest, TokenResponse, UserResponse},
    error::AppError,
    services::auth_service,
    state::SharedState,
};

/// Email/password and Google ID token login.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/me", get(me))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Account behind a required `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserEntity);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;
        let user = auth_service::current_user(state, token).await?;
        Ok(Self(user))
    }
}

/// Account behind an optional bearer header. Bad tokens count as anonymous.
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<UserEntity>);

impl FromRequestParts<SharedState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(Self(None));
        };
        match auth_service::current_user(state, token).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(err) => {
                debug!(error = %err, "ignoring unusable bearer token");
                Ok(Self(None))
            }
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = TokenResponse),
        (status = 400, description = "Email or username already in use")
    )
)]
/// Create a password account and return its access token.
pub async fn register(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterRequest>>,
) -> Result<Json<TokenResponse>, AppError> {
    Ok(Json(auth_service::register(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Incorrect email or password")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<LoginRequest>>,
) -> Result<Json<TokenResponse>, AppError> {
    Ok(Json(auth_service::login(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/google",
    tag = "auth",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Logged in with Google", body = TokenResponse),
        (status = 401, description = "Token rejected by Google"),
        (status = 503, description = "Google sign-in is not configured")
    )
)]
/// Exchange a Google ID token for an access token, creating the account on first use.
pub async fn google_login(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<GoogleLoginRequest>>,
) -> Result<Json<TokenResponse>, AppError> {
    Ok(Json(auth_service::google_login(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Could not validate credentials")
    )
)]
pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
