use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use utoipa::IntoParams;

use crate::{
    error::{AppError, ServiceError},
    services::oauth_service::{self, CallbackQuery},
    state::SharedState,
};

/// Browser-facing Google OAuth redirect handshake.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/google", get(start))
        .route("/auth/google/callback", get(callback))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StartQuery {
    /// `login` or `signup`.
    pub mode: Option<String>,
    /// Path in the web app to come back to.
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

fn handshake_error(err: ServiceError) -> Response {
    match err {
        ServiceError::NotConfigured(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
            .into_response(),
        other => {
            error!(error = %other, "google oauth handshake failed");
            AppError::from(other).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/google",
    tag = "oauth",
    params(StartQuery),
    responses(
        (status = 302, description = "Redirect to Google's consent screen"),
        (status = 500, description = "Google OAuth is not configured")
    )
)]
/// Send the browser to Google's consent screen.
pub async fn start(State(state): State<SharedState>, Query(query): Query<StartQuery>) -> Response {
    match oauth_service::authorization_url(
        &state.config().google,
        query.mode.as_deref(),
        query.redirect.as_deref(),
    ) {
        Ok(url) => found(url.as_str()),
        Err(err) => handshake_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/auth/google/callback",
    tag = "oauth",
    params(CallbackParams),
    responses(
        (status = 302, description = "Redirect back into the web app with `auth_success` or `auth_error`"),
        (status = 500, description = "Google OAuth is not configured")
    )
)]
/// Finish the code exchange and hand the app token to the web app.
pub async fn callback(
    State(state): State<SharedState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let query = CallbackQuery {
        code: params.code,
        state: params.state,
        error: params.error,
    };
    match oauth_service::complete_callback(&state, query).await {
        Ok(url) => found(url.as_str()),
        Err(err) => handshake_error(err),
    }
}
