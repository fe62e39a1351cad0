use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::delete,
};
use uuid::Uuid;

use crate::{
    error::AppError, routes::auth::AuthUser, services::session_service, state::SharedState,
};

/// Game-agnostic session management.
pub fn router() -> Router<SharedState> {
    Router::new().route("/sessions/{id}", delete(abandon))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}",
    tag = "sessions",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 204, description = "Session dropped"),
        (status = 404, description = "No such session")
    )
)]
/// Drop a session of any game without recording a score.
pub async fn abandon(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    session_service::abandon(&state, user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
